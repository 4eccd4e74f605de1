use evalbox_app::commands;
use evalbox_app::config::{Config, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

const USAGE: &str = "Usage: evalbox [--config PATH] <command>

Commands:
  run [--timeout SECS] [FILE]   Execute code from FILE or stdin
  serve                         Answer JSON-lines tool calls on stdin/stdout
  tools                         Print the tool schemas
  health                        Check interpreter, modules and directories";

enum Command {
    Run {
        timeout: Option<f64>,
        file: Option<PathBuf>,
    },
    Serve,
    Tools,
    Health,
}

struct Cli {
    config_path: PathBuf,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut rest = args.iter();
    let mut command = None;

    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => {
                let path = rest.next().ok_or("--config needs a path")?;
                config_path = PathBuf::from(path);
            }
            "-h" | "--help" => return Err(String::new()),
            other => {
                command = Some(other.to_string());
                break;
            }
        }
    }

    let command = match command.as_deref() {
        Some("run") => {
            let mut timeout = None;
            let mut file = None;
            while let Some(arg) = rest.next() {
                if arg == "--timeout" {
                    let value = rest.next().ok_or("--timeout needs a value")?;
                    timeout = Some(
                        value
                            .parse::<f64>()
                            .map_err(|_| format!("invalid timeout: {}", value))?,
                    );
                } else if file.is_none() {
                    file = Some(PathBuf::from(arg));
                } else {
                    return Err(format!("unexpected argument: {}", arg));
                }
            }
            Command::Run { timeout, file }
        }
        Some("serve") => Command::Serve,
        Some("tools") => Command::Tools,
        Some("health") => Command::Health,
        Some(other) => return Err(format!("unknown command: {}", other)),
        None => return Err(String::new()),
    };

    Ok(Cli {
        config_path,
        command,
    })
}

fn init_logging(level: &str) {
    let level = tracing::Level::from_str(level).unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("❌ {}\n", msg);
            }
            eprintln!("{}", USAGE);
            return ExitCode::from(commands::run::EXIT_INVALID);
        }
    };

    let config = match Config::load(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    let result = match cli.command {
        Command::Run { timeout, file } => {
            commands::run::run(&config, timeout, file.as_deref()).await.map(ExitCode::from)
        }
        Command::Serve => commands::serve::run(&config).await.map(|_| ExitCode::SUCCESS),
        Command::Tools => commands::tools::run(&config).map(|_| ExitCode::SUCCESS),
        Command::Health => commands::health::run(&config).await.map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
