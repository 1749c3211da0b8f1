use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default actor recorded on movements when the caller supplies none
pub const DEFAULT_ACTOR: &str = "Admin";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3030;
const DEFAULT_BOARD_LIMIT: usize = 5;

/// Runtime configuration, read from `~/.pipeboard/rc`.
///
/// The rc file holds `key=value` lines:
///
/// ```text
/// data.location=./board.db
/// api.host=0.0.0.0
/// api.port=8080
/// actor.default=Dispatcher
/// board.limit=10
/// ```
///
/// Relative `data.location` paths resolve against the rc file's directory.
/// `PIPEBOARD_API_HOST`, `PIPEBOARD_API_PORT` and `PIPEBOARD_ACTOR` override the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_location: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    pub default_actor: String,
    pub board_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: Self::config_dir().join("board.db"),
            api_host: DEFAULT_HOST.to_string(),
            api_port: DEFAULT_PORT,
            default_actor: DEFAULT_ACTOR.to_string(),
            board_limit: DEFAULT_BOARD_LIMIT,
        }
    }
}

impl Config {
    /// Directory holding the rc file and the default database
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pipeboard")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("rc")
    }

    /// Load configuration from the rc file (if any) and the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific rc file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&contents, base_dir)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse rc file contents
    pub fn parse(contents: &str, base_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("line {}: expected key=value, got '{}'", line_no + 1, line);
            };
            let value = value.trim();

            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = if path.is_relative() {
                        base_dir.join(path)
                    } else {
                        path
                    };
                }
                "api.host" => config.api_host = value.to_string(),
                "api.port" => {
                    config.api_port = value.parse()
                        .with_context(|| format!("line {}: invalid api.port '{}'", line_no + 1, value))?;
                }
                "actor.default" => {
                    if !value.is_empty() {
                        config.default_actor = value.to_string();
                    }
                }
                "board.limit" => {
                    config.board_limit = value.parse()
                        .with_context(|| format!("line {}: invalid board.limit '{}'", line_no + 1, value))?;
                }
                other => log::warn!("Ignoring unknown config key '{}'", other),
            }
        }

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("PIPEBOARD_API_HOST") {
            self.api_host = host;
        }
        if let Ok(port) = std::env::var("PIPEBOARD_API_PORT") {
            self.api_port = port.parse()
                .with_context(|| format!("Invalid PIPEBOARD_API_PORT '{}'", port))?;
        }
        if let Ok(actor) = std::env::var("PIPEBOARD_ACTOR") {
            if !actor.trim().is_empty() {
                self.default_actor = actor.trim().to_string();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_all_keys() {
        let contents = "\
# board settings
data.location=/srv/board.db
api.host=0.0.0.0
api.port=8080
actor.default=Dispatcher
board.limit=12
";
        let config = Config::parse(contents, Path::new("/etc")).unwrap();
        assert_eq!(config.data_location, PathBuf::from("/srv/board.db"));
        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.default_actor, "Dispatcher");
        assert_eq!(config.board_limit, 12);
    }

    #[test]
    fn test_relative_location_resolves_against_rc_dir() {
        let config = Config::parse("data.location=./custom.db\n", Path::new("/home/me/.pipeboard")).unwrap();
        assert_eq!(config.data_location, PathBuf::from("/home/me/.pipeboard/./custom.db"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Config::parse("api.port=http\n", Path::new(".")).is_err());
        assert!(Config::parse("no separator here\n", Path::new(".")).is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("rc")).unwrap();
        assert_eq!(config.api_port, 3030);
        assert_eq!(config.default_actor, DEFAULT_ACTOR);
        assert_eq!(config.board_limit, 5);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let rc = temp_dir.path().join("rc");
        std::fs::write(&rc, "data.location=board.db\nboard.limit=3\n").unwrap();
        let config = Config::load_from(&rc).unwrap();
        assert_eq!(config.data_location, temp_dir.path().join("board.db"));
        assert_eq!(config.board_limit, 3);
    }
}
