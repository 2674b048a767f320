//! Reader options and environment configuration.

use std::env;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

use crate::core::style::{Color, Style};

/// Construction options for a line reader.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub in_fd: RawFd,
    pub out_fd: RawFd,
    pub history_size: usize,
    pub auto_history: bool,
    pub hint_style: Style,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            in_fd: libc::STDIN_FILENO,
            out_fd: libc::STDOUT_FILENO,
            history_size: 100,
            auto_history: true,
            hint_style: Style {
                bold: false,
                fg: Color::GRAY,
                bg: Color::None,
            },
        }
    }
}

/// Environment-driven debug configuration.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    /// Append every byte written to the terminal to this file.
    pub write_log: Option<PathBuf>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            write_log: env_path_opt("LINEFLOW_WRITE_LOG"),
        }
    }
}

fn env_path_opt(key: &str) -> Option<PathBuf> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(value))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::EnvConfig;
    use std::env;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn write_log_defaults_to_none() {
        let _lock = env_lock();
        let _guard = set_env_guard("LINEFLOW_WRITE_LOG", None);
        assert!(EnvConfig::from_env().write_log.is_none());
    }

    #[test]
    fn write_log_path_is_read() {
        let _lock = env_lock();
        let _guard = set_env_guard("LINEFLOW_WRITE_LOG", Some("/tmp/lineflow.log"));
        assert_eq!(
            EnvConfig::from_env().write_log,
            Some(PathBuf::from("/tmp/lineflow.log"))
        );
    }

    #[test]
    fn empty_write_log_is_ignored() {
        let _lock = env_lock();
        let _guard = set_env_guard("LINEFLOW_WRITE_LOG", Some(""));
        assert!(EnvConfig::from_env().write_log.is_none());
    }
}
