use rlimit::{setrlimit, Resource};
use std::time::Duration;

const FILE_SIZE_LIMIT: u64 = 100 * 1024 * 1024; // 100MB
const NOFILE_LIMIT: u64 = 256;
const CPU_SLACK_SECS: u64 = 1;

/// Kernel-enforced ceilings for one interpreter process.
///
/// The CPU limit only backs up the deadline timer: it reaps a runaway child
/// even if the host never gets to deliver SIGKILL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub memory_bytes: Option<u64>,
    pub cpu_seconds: u64,
}

impl ResourceLimits {
    pub fn for_deadline(deadline: Duration, memory_limit_mb: Option<u64>) -> Self {
        let whole = deadline.as_secs() + u64::from(deadline.subsec_nanos() > 0);
        Self {
            memory_bytes: memory_limit_mb.map(|mb| mb * 1024 * 1024),
            cpu_seconds: whole + CPU_SLACK_SECS,
        }
    }

    /// Runs in the forked child before exec; only async-signal-safe calls.
    pub fn apply(&self) -> std::io::Result<()> {
        if let Some(bytes) = self.memory_bytes {
            setrlimit(Resource::AS, bytes, bytes)?;
        }

        setrlimit(Resource::CPU, self.cpu_seconds, self.cpu_seconds)?;
        setrlimit(Resource::FSIZE, FILE_SIZE_LIMIT, FILE_SIZE_LIMIT)?;
        setrlimit(Resource::NOFILE, NOFILE_LIMIT, NOFILE_LIMIT)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_limit_rounds_up_with_slack() {
        let limits = ResourceLimits::for_deadline(Duration::from_millis(1500), None);
        assert_eq!(limits.cpu_seconds, 3);
        assert_eq!(limits.memory_bytes, None);
    }

    #[test]
    fn test_memory_limit_in_bytes() {
        let limits = ResourceLimits::for_deadline(Duration::from_secs(5), Some(512));
        assert_eq!(limits.cpu_seconds, 6);
        assert_eq!(limits.memory_bytes, Some(512 * 1024 * 1024));
    }
}
