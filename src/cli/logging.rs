//! Logging setup.
//!
//! `RUST_LOG` wins over the configured level. With a log file configured,
//! output is appended there without ANSI colors; otherwise it goes to stderr.

use super::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| format!("Invalid log level '{}': {}", config.level, e))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| format!("Failed to install logger: {}", e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_with_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            file: Some(temp_dir.path().join("logs").join("arisan.log")),
        };

        // A second install in the same process fails; either way the
        // directory and file must exist.
        let _ = init(&config);
        assert!(temp_dir.path().join("logs").join("arisan.log").exists());
    }
}
