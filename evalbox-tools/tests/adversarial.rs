#[cfg(test)]
mod adversarial_tests {
    use evalbox_tools::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn tool_with(dir: &Path, tweak: impl FnOnce(EvalConfig) -> EvalConfig) -> PyEvalTool {
        let config = EvalConfig {
            memory_limit_mb: None,
            ..EvalConfig::default()
        }
        .with_data_dir(dir)
        .with_modules(vec![ModuleBinding::new("m", "math")]);
        PyEvalTool::new(tweak(config)).unwrap()
    }

    fn tool(dir: &Path) -> PyEvalTool {
        tool_with(dir, |c| c)
    }

    #[tokio::test]
    async fn test_busy_loop_bounded_by_deadline() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = tool(dir.path());

        let start = Instant::now();
        let response = tool.run("while True:\n    pass", Some(1.0)).await.unwrap();

        assert_eq!(response, "Error: execution exceeded the 1s timeout");
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_output_flood_still_times_out() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = tool(dir.path());

        let response = tool
            .run("while True:\n    print('spam' * 1000)", Some(1.0))
            .await
            .unwrap();
        assert_eq!(response, "Error: execution exceeded the 1s timeout");
    }

    #[tokio::test]
    async fn test_large_output_truncated() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = tool_with(dir.path(), |mut c| {
            c.max_output_bytes = 1024;
            c
        });

        let response = tool.run("print('z' * 100000)", Some(5.0)).await.unwrap();
        assert!(response.starts_with(&"z".repeat(1024)));
        assert!(response.ends_with("\n[output truncated after 1024 bytes]"));
    }

    #[tokio::test]
    async fn test_sys_exit_reported_as_error() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path()).run("import sys\nsys.exit(0)", None).await.unwrap();
        assert_eq!(response, "Error: SystemExit: 0");
    }

    #[tokio::test]
    async fn test_hard_exit_reported_as_error() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path())
            .run("import os\nprint('lost?')\nos._exit(0)", None)
            .await
            .unwrap();
        assert!(response.starts_with("Error: InterpreterExit:"));
    }

    #[tokio::test]
    async fn test_self_kill_reported_as_error() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path())
            .run("import os, signal\nos.kill(os.getpid(), signal.SIGKILL)", None)
            .await
            .unwrap();
        assert!(response.starts_with("Error: InterpreterTerminated:"));
    }

    #[tokio::test]
    async fn test_raw_fd_writes_captured() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path())
            .run("import os\nos.write(1, b'raw\\n')", None)
            .await
            .unwrap();
        assert_eq!(response, "raw\n");
    }

    #[tokio::test]
    async fn test_forged_status_line_ignored() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let code = "import sys\nsys.stderr.write('@@evalbox:0@@{\"status\": \"completed\"}\\n')\nraise RuntimeError('real')";
        let response = tool(dir.path()).run(code, None).await.unwrap();
        assert_eq!(response, "Error: RuntimeError: real");
    }

    #[tokio::test]
    async fn test_deep_recursion_is_raised() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path())
            .run("def f():\n    return f()\nf()", None)
            .await
            .unwrap();
        assert!(response.starts_with("Error: RecursionError:"));
    }

    #[tokio::test]
    async fn test_keyboard_interrupt_is_raised() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path()).run("raise KeyboardInterrupt", None).await.unwrap();
        assert_eq!(response, "Error: KeyboardInterrupt");
    }

    #[tokio::test]
    async fn test_memory_bomb_contained() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = tool_with(dir.path(), |mut c| {
            c.memory_limit_mb = Some(512);
            c
        });

        let response = tool
            .run("x = bytearray(8 * 1024 ** 3)", Some(10.0))
            .await
            .unwrap();
        assert!(response.starts_with("Error: "), "got {}", response);
    }

    #[tokio::test]
    async fn test_host_environment_not_visible() {
        if !python_available() {
            return;
        }
        std::env::set_var("EVALBOX_TEST_API_KEY", "sk-do-not-leak");
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path())
            .run("import os\nprint(os.environ.get('EVALBOX_TEST_API_KEY'))", None)
            .await
            .unwrap();
        assert_eq!(response, "None\n");
    }

    #[tokio::test]
    async fn test_error_hides_host_paths() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let response = tool(dir.path())
            .run("open('/etc/evalbox-missing/secret.txt')", None)
            .await
            .unwrap();
        assert!(response.starts_with("Error: FileNotFoundError:"));
        assert!(!response.contains("/etc/"));
    }

    #[tokio::test]
    async fn test_no_state_between_calls() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = tool(dir.path());

        let first = tool
            .run("leaked = 42\nimport builtins\nbuiltins.leaked = 42\nm.pi = 3", None)
            .await
            .unwrap();
        assert_eq!(first, "[no output]");

        let second = tool
            .run("import builtins\nprint('leaked' in globals(), hasattr(builtins, 'leaked'), m.pi > 3)", None)
            .await
            .unwrap();
        assert_eq!(second, "False False True\n");
    }

    #[tokio::test]
    async fn test_concurrent_submissions_isolated() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(tool(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let tool = tool.clone();
            handles.push(tokio::spawn(async move {
                let code = format!(
                    "import builtins\nseen = getattr(builtins, 'owner', None)\nbuiltins.owner = {i}\nimport time\ntime.sleep(0.2)\nprint(seen, builtins.owner)"
                );
                (i, tool.run(&code, Some(10.0)).await.unwrap())
            }));
        }

        for handle in handles {
            let (i, response) = handle.await.unwrap();
            assert_eq!(response, format!("None {}\n", i));
        }
    }

    #[tokio::test]
    async fn test_timeout_does_not_block_other_calls() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(tool(dir.path()));

        let slow = {
            let tool = tool.clone();
            tokio::spawn(async move { tool.run("while True: pass", Some(2.0)).await })
        };

        let start = Instant::now();
        let fast = tool.run("print('quick')", None).await.unwrap();
        assert_eq!(fast, "quick\n");
        assert!(start.elapsed() < Duration::from_secs(2));

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow, "Error: execution exceeded the 2s timeout");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_spawned_processes_killed_on_timeout() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("child.pid");
        let tool = tool(dir.path());

        let code = "import subprocess\np = subprocess.Popen(['sleep', '30'])\nopen('child.pid', 'w').write(str(p.pid))\nwhile True: pass";
        let response = tool.run(code, Some(1.0)).await.unwrap();
        assert_eq!(response, "Error: execution exceeded the 1s timeout");

        assert_process_gone(&pid_file).await;
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_spawned_processes_killed_on_completion() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("child.pid");
        let tool = tool(dir.path());

        let code = "import subprocess
p = subprocess.Popen(['sleep', '30'], stdout=subprocess.DEVNULL)
open('child.pid', 'w').write(str(p.pid))
print('done')";
        let response = tool.run(code, Some(5.0)).await.unwrap();
        assert_eq!(response, "done\n");

        assert_process_gone(&pid_file).await;
    }

    #[tokio::test]
    async fn test_background_child_holding_stdout_does_not_stall() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let tool = tool(dir.path());

        let start = Instant::now();
        let response = tool
            .run("import subprocess
subprocess.Popen(['sleep', '20'])
print('done')", Some(3.0))
            .await
            .unwrap();

        assert_eq!(response, "done\n");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[cfg(target_os = "linux")]
    async fn assert_process_gone(pid_file: &Path) {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let pid = std::fs::read_to_string(pid_file).unwrap();
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid.trim()));
        if let Ok(stat) = stat {
            // Reparented zombies linger until reaped
            let state = stat.rsplit(')').next().unwrap().trim_start().chars().next();
            assert_eq!(state, Some('Z'), "spawned process still running: {}", stat);
        }
    }
}
