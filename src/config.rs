// Bot configuration, loaded from a .env file, environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::BootstrapError;
use crate::logging::LogFormat;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:ratbot.db?mode=rwc";
pub const DEFAULT_PREFIX: &str = "$";
/// Nine minutes, inside the usual ten-minute idle cutoff of hosted databases.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 540;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token.
    pub discord_token: String,
    /// Record store connection string.
    pub database_url: String,
    /// Prefix that marks a chat message as a command.
    pub prefix: String,
    /// How often the backend connection is pinged.
    pub keepalive_interval: Duration,
    /// Port for the health/metrics listener. Disabled when unset.
    pub http_port: Option<u16>,
    /// Append logs to this file in addition to the console.
    pub log_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from `.env`, environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `RATBOT_DISCORD_TOKEN` - Discord bot token (required)
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:ratbot.db?mode=rwc`)
    /// - `RATBOT_PREFIX` - Command prefix (default: `$`)
    /// - `RATBOT_KEEPALIVE_SECS` - Keep-alive interval in seconds (default: 540)
    /// - `RATBOT_HTTP_PORT` - Port for `/health` and `/metrics` (default: disabled)
    /// - `RATBOT_LOG_FILE` - Log file path (default: console only)
    /// - `RATBOT_LOG_FORMAT` - `text` or `json` (default: `text`)
    ///
    /// CLI flags:
    /// - `--database-url <URL>` - Override the database URL
    /// - `--prefix <PREFIX>` - Override the command prefix
    /// - `--port <PORT>` - Override the HTTP port
    pub fn load() -> Result<Self, BootstrapError> {
        check_dotenv(dotenvy::dotenv())?;
        let args: Vec<String> = std::env::args().collect();
        Self::from_lookup(&args, |key| std::env::var(key).ok())
    }

    /// Build the configuration from CLI args and a variable lookup.
    pub fn from_lookup<F>(args: &[String], lookup: F) -> Result<Self, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("RATBOT_DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(BootstrapError::MissingSetting("RATBOT_DISCORD_TOKEN"))?;

        let database_url = Self::parse_cli_value(args, "--database-url")
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let prefix = Self::parse_cli_value(args, "--prefix")
            .or_else(|| lookup("RATBOT_PREFIX"))
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            return Err(BootstrapError::InvalidSetting {
                key: "RATBOT_PREFIX",
                reason: "must be non-empty and contain no whitespace".to_string(),
            });
        }

        let keepalive_secs = match lookup("RATBOT_KEEPALIVE_SECS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| BootstrapError::InvalidSetting {
                    key: "RATBOT_KEEPALIVE_SECS",
                    reason: format!("expected a positive number of seconds, got {v:?}"),
                })?,
            None => DEFAULT_KEEPALIVE_SECS,
        };

        // Port: CLI flag --port takes precedence, then env var
        let http_port = match Self::parse_cli_value(args, "--port").or_else(|| lookup("RATBOT_HTTP_PORT")) {
            Some(v) => Some(v.parse::<u16>().map_err(|e| BootstrapError::InvalidSetting {
                key: "RATBOT_HTTP_PORT",
                reason: e.to_string(),
            })?),
            None => None,
        };

        let log_file = lookup("RATBOT_LOG_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let log_format = lookup("RATBOT_LOG_FORMAT")
            .map(|v| LogFormat::from_name(&v))
            .unwrap_or_default();

        Ok(Config {
            discord_token,
            database_url,
            prefix,
            keepalive_interval: Duration::from_secs(keepalive_secs),
            http_port,
            log_file,
            log_format,
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

/// A missing `.env` is fine; a malformed one is not.
fn check_dotenv(result: Result<PathBuf, dotenvy::Error>) -> Result<(), BootstrapError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(BootstrapError::InvalidSetting {
            key: ".env",
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(args: &[&str], vars: &[(&str, &str)]) -> Result<Config, BootstrapError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(&args, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&["ratbot"], &[("RATBOT_DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.prefix, "$");
        assert_eq!(config.keepalive_interval, Duration::from_secs(540));
        assert_eq!(config.http_port, None);
        assert_eq!(config.log_file, None);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_missing_token() {
        let err = load(&["ratbot"], &[]).unwrap_err();
        assert!(matches!(err, BootstrapError::MissingSetting("RATBOT_DISCORD_TOKEN")));

        let err = load(&["ratbot"], &[("RATBOT_DISCORD_TOKEN", "  ")]).unwrap_err();
        assert!(matches!(err, BootstrapError::MissingSetting(_)));
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = load(
            &["ratbot", "--port", "9100", "--prefix", "!", "--database-url", "sqlite::memory:"],
            &[
                ("RATBOT_DISCORD_TOKEN", "abc"),
                ("RATBOT_HTTP_PORT", "8080"),
                ("RATBOT_PREFIX", "?"),
                ("DATABASE_URL", "sqlite:other.db"),
            ],
        )
        .unwrap();
        assert_eq!(config.http_port, Some(9100));
        assert_eq!(config.prefix, "!");
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_env_values() {
        let config = load(
            &["ratbot"],
            &[
                ("RATBOT_DISCORD_TOKEN", "abc"),
                ("RATBOT_KEEPALIVE_SECS", "60"),
                ("RATBOT_HTTP_PORT", "8080"),
                ("RATBOT_LOG_FILE", "/tmp/ratbot.log"),
                ("RATBOT_LOG_FORMAT", "JSON"),
            ],
        )
        .unwrap();
        assert_eq!(config.keepalive_interval, Duration::from_secs(60));
        assert_eq!(config.http_port, Some(8080));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/ratbot.log")));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_dotenv_missing_is_ok_malformed_is_not() {
        assert!(check_dotenv(Ok(PathBuf::from(".env"))).is_ok());

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(check_dotenv(Err(dotenvy::Error::Io(missing))).is_ok());

        let err = check_dotenv(Err(dotenvy::Error::LineParse("TOKEN abc".into(), 5))).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidSetting { key: ".env", .. }));

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(check_dotenv(Err(dotenvy::Error::Io(denied))).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let token = ("RATBOT_DISCORD_TOKEN", "abc");
        assert!(load(&["ratbot"], &[token, ("RATBOT_KEEPALIVE_SECS", "0")]).is_err());
        assert!(load(&["ratbot"], &[token, ("RATBOT_KEEPALIVE_SECS", "soon")]).is_err());
        assert!(load(&["ratbot"], &[token, ("RATBOT_HTTP_PORT", "99999")]).is_err());
        assert!(load(&["ratbot"], &[token, ("RATBOT_PREFIX", "")]).is_err());
        assert!(load(&["ratbot", "--prefix", "r b"], &[token]).is_err());
    }
}
