// Error types for the record store, command parsing, and startup.

use thiserror::Error;

/// Failures raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A player with this name (compared case-insensitively) already exists.
    #[error("There are already records under {0}, insert a new name")]
    DuplicatePlayer(String),

    /// One or more referenced players do not exist.
    #[error("{} not in the records", describe_missing(.0))]
    UnknownPlayers(Vec<String>),

    /// No teamkill with this id exists.
    #[error("Kill id {0} is not in the records")]
    UnknownKill(String),

    /// Every candidate id at every allowed width was already taken.
    #[error("No free kill id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },

    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

impl StoreError {
    /// True for errors caused by a missing player or kill.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::UnknownPlayers(_) | StoreError::UnknownKill(_))
    }
}

fn describe_missing(names: &[String]) -> String {
    match names {
        [] => "nobody is".to_string(),
        [one] => format!("{one} is"),
        many => format!("{} are", many.join(" and ")),
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised while parsing a chat command, before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Wrong argument count or a malformed argument.
    #[error("{0}")]
    Usage(String),

    #[error("Input Error! Command \"{0}\" is not found.")]
    UnknownCommand(String),
}

/// Fatal errors that stop the bot before it serves commands.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error("database setup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("chat gateway failed: {0}")]
    Gateway(#[from] serenity::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
