//! Debug log sink
//!
//! The status line owns the terminal's stdout and must never print
//! diagnostics there. Logging is off unless `--debug` is passed, in which
//! case records are appended to `<tmp>/claudeline-debug.log`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Environment variable with an env_logger filter for the debug sink
pub const LOG_FILTER_ENV: &str = "CLAUDELINE_LOG";

/// Location of the debug log
pub fn debug_log_path() -> PathBuf {
    std::env::temp_dir().join("claudeline-debug.log")
}

/// Install the debug log sink when requested.
///
/// Returns whether a sink was installed. Failing to open the log file leaves
/// logging disabled; it never stops the render.
pub fn init(debug: bool) -> bool {
    if !debug {
        return false;
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let Ok(file) = options.open(debug_log_path()) else {
        return false;
    };

    Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_env(LOG_FILTER_ENV)
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "claudeline: {} {:<5} {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        assert!(!init(false));
    }

    #[test]
    fn test_debug_log_path_in_temp_dir() {
        let path = debug_log_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path.ends_with("claudeline-debug.log"));
    }
}
