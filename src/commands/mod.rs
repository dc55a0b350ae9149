// Chat command parsing and dispatch to the record store.

pub mod help;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::db::{Database, NewKill, DETAIL_MAX_LEN, NAME_MAX_LEN};
use crate::error::{CommandError, StoreError};
use crate::format;
use crate::metrics;

/// Longest accepted kill id.
const KILL_ID_MAX_LEN: usize = 9;

const BACKEND_UNAVAILABLE: &str = "The records are unavailable right now. Try again later.";

/// Every command the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddPlayer,
    GetPlayer,
    DeletePlayer,
    AddKill,
    DeleteKill,
    ShowKills,
    ShowPlayers,
    Leaderboard,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 9] = [
        CommandKind::AddPlayer,
        CommandKind::GetPlayer,
        CommandKind::DeletePlayer,
        CommandKind::AddKill,
        CommandKind::DeleteKill,
        CommandKind::ShowKills,
        CommandKind::ShowPlayers,
        CommandKind::Leaderboard,
        CommandKind::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::AddPlayer => "addplayer",
            CommandKind::GetPlayer => "getplayer",
            CommandKind::DeletePlayer => "deleteplayer",
            CommandKind::AddKill => "addkill",
            CommandKind::DeleteKill => "deletekill",
            CommandKind::ShowKills => "showkills",
            CommandKind::ShowPlayers => "showplayers",
            CommandKind::Leaderboard => "leaderboard",
            CommandKind::Help => "help",
        }
    }

    /// Case-insensitive lookup by command name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddPlayer { name: String },
    GetPlayer { name: String },
    DeletePlayer { name: String },
    AddKill {
        killer: String,
        victim: String,
        map: Option<String>,
        weapon: Option<String>,
    },
    DeleteKill { id: String },
    ShowKills,
    ShowPlayers,
    Leaderboard,
    Help { topic: Option<String> },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddPlayer { .. } => CommandKind::AddPlayer,
            Command::GetPlayer { .. } => CommandKind::GetPlayer,
            Command::DeletePlayer { .. } => CommandKind::DeletePlayer,
            Command::AddKill { .. } => CommandKind::AddKill,
            Command::DeleteKill { .. } => CommandKind::DeleteKill,
            Command::ShowKills => CommandKind::ShowKills,
            Command::ShowPlayers => CommandKind::ShowPlayers,
            Command::Leaderboard => CommandKind::Leaderboard,
            Command::Help { .. } => CommandKind::Help,
        }
    }

    /// Validate arity and argument shape. `prefix` only feeds usage messages.
    pub fn parse(name: &str, args: &[&str], prefix: &str) -> Result<Self, CommandError> {
        let kind = CommandKind::from_name(name)
            .ok_or_else(|| CommandError::UnknownCommand(displayable(name)))?;
        let usage = || CommandError::Usage(help::usage(kind, prefix));

        let command = match (kind, args) {
            (CommandKind::AddPlayer, [name]) => Command::AddPlayer {
                name: player_name(name)?,
            },
            (CommandKind::GetPlayer, [name]) => Command::GetPlayer {
                name: player_name(name)?,
            },
            (CommandKind::DeletePlayer, [name]) => Command::DeletePlayer {
                name: player_name(name)?,
            },
            (CommandKind::AddKill, [killer, victim]) => Command::AddKill {
                killer: player_name(killer)?,
                victim: player_name(victim)?,
                map: None,
                weapon: None,
            },
            (CommandKind::AddKill, [killer, victim, map, weapon]) => Command::AddKill {
                killer: player_name(killer)?,
                victim: player_name(victim)?,
                map: Some(detail("Map", map)?),
                weapon: Some(detail("Weapon", weapon)?),
            },
            (CommandKind::DeleteKill, [id]) => Command::DeleteKill {
                id: kill_id(id, prefix)?,
            },
            (CommandKind::ShowKills, []) => Command::ShowKills,
            (CommandKind::ShowPlayers, []) => Command::ShowPlayers,
            (CommandKind::Leaderboard, []) => Command::Leaderboard,
            (CommandKind::Help, []) => Command::Help { topic: None },
            (CommandKind::Help, [topic]) => Command::Help {
                topic: Some(topic.to_string()),
            },
            _ => return Err(usage()),
        };
        Ok(command)
    }
}

/// Backticks would close the code block a reply is wrapped in.
fn has_markup(raw: &str) -> bool {
    raw.chars().any(|c| c == '`' || c.is_control())
}

/// Echoable form of untrusted text.
fn displayable(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '`' { '\'' } else { c })
        .collect()
}

fn player_name(raw: &str) -> Result<String, CommandError> {
    if has_markup(raw) {
        return Err(CommandError::Usage(
            "Input Error! Player names cannot contain backticks or control characters.".to_string(),
        ));
    }
    if raw.chars().count() > NAME_MAX_LEN {
        return Err(CommandError::Usage(format!(
            "Input Error! Player names can be at most {NAME_MAX_LEN} characters."
        )));
    }
    Ok(raw.to_string())
}

fn detail(label: &str, raw: &str) -> Result<String, CommandError> {
    if has_markup(raw) {
        return Err(CommandError::Usage(format!(
            "Input Error! {label} cannot contain backticks or control characters."
        )));
    }
    if raw.chars().count() > DETAIL_MAX_LEN {
        return Err(CommandError::Usage(format!(
            "Input Error! {label} can be at most {DETAIL_MAX_LEN} characters."
        )));
    }
    Ok(raw.to_string())
}

fn kill_id(raw: &str, prefix: &str) -> Result<String, CommandError> {
    if raw.len() > KILL_ID_MAX_LEN || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(CommandError::Usage(format!(
            "Input Error! Kill ids are numbers. Correct format: {}",
            help::correct_format(CommandKind::DeleteKill, prefix)
        )));
    }
    Ok(raw.to_string())
}

/// How a handled command ended, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ok,
    Usage,
    UnknownCommand,
    Duplicate,
    NotFound,
    Exhausted,
    Backend,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Usage => "usage",
            Outcome::UnknownCommand => "unknown_command",
            Outcome::Duplicate => "duplicate",
            Outcome::NotFound => "not_found",
            Outcome::Exhausted => "id_exhausted",
            Outcome::Backend => "backend_error",
        }
    }
}

/// Translates chat messages into record store calls and text replies.
pub struct Dispatcher {
    db: Arc<Database>,
    prefix: String,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>, prefix: impl Into<String>) -> Self {
        Self {
            db,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parse a raw message. `None` when the message is not addressed to the bot.
    pub fn parse(&self, content: &str) -> Option<Result<Command, CommandError>> {
        let body = content.trim_start().strip_prefix(self.prefix.as_str())?;
        let mut tokens = body.split_whitespace();
        let name = tokens.next()?;
        // "$ addplayer" is not a command
        if body.starts_with(char::is_whitespace) {
            return None;
        }
        let args: Vec<&str> = tokens.collect();
        Some(Command::parse(name, &args, &self.prefix))
    }

    /// Handle one chat message and return the reply body, if any.
    pub async fn handle(&self, content: &str, at: DateTime<Utc>) -> Option<String> {
        let parsed = self.parse(content)?;
        let started = Instant::now();

        let (label, outcome, reply) = match parsed {
            Ok(command) => {
                let kind = command.kind();
                let (outcome, reply) = self.execute(command, at).await;
                (kind.name(), outcome, reply)
            }
            Err(e @ CommandError::UnknownCommand(_)) => {
                ("unknown", Outcome::UnknownCommand, e.to_string())
            }
            Err(CommandError::Usage(message)) => {
                let label = content
                    .trim_start()
                    .strip_prefix(self.prefix.as_str())
                    .and_then(|b| b.split_whitespace().next())
                    .and_then(CommandKind::from_name)
                    .map(CommandKind::name)
                    .unwrap_or("unknown");
                (label, Outcome::Usage, message)
            }
        };

        metrics::COMMANDS_TOTAL
            .with_label_values(&[label, outcome.as_str()])
            .inc();
        metrics::COMMAND_DURATION_SECONDS
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        info!(command = label, outcome = outcome.as_str(), "Command handled");

        Some(reply)
    }

    #[instrument(skip(self, command), fields(command = %command.kind()))]
    async fn execute(&self, command: Command, at: DateTime<Utc>) -> (Outcome, String) {
        match command {
            Command::AddPlayer { name } => match self.db.add_player(&name).await {
                Ok(player) => (
                    Outcome::Ok,
                    format!("Successful insert. {} was added to the list", player.name),
                ),
                Err(e) => self.store_failure(e),
            },
            Command::GetPlayer { name } => match self.db.get_player(&name).await {
                Ok(player) => (Outcome::Ok, format::player_card(&player)),
                Err(e) => self.store_failure(e),
            },
            Command::DeletePlayer { name } => match self.db.delete_player(&name).await {
                Ok(removed) => {
                    let mut reply = format!(
                        "Delete successful! {} was removed from the records",
                        removed.player.name
                    );
                    match removed.kills_removed {
                        0 => {}
                        1 => reply.push_str(" along with 1 kill"),
                        n => reply.push_str(&format!(" along with {n} kills")),
                    }
                    (Outcome::Ok, reply)
                }
                Err(e) => self.store_failure(e),
            },
            Command::AddKill {
                killer,
                victim,
                map,
                weapon,
            } => {
                let new = NewKill {
                    killer: &killer,
                    victim: &victim,
                    map: map.as_deref(),
                    weapon: weapon.as_deref(),
                    at,
                };
                match self.db.add_kill(new).await {
                    Ok(kill) => {
                        metrics::TEAMKILLS_RECORDED_TOTAL.inc();
                        (
                            Outcome::Ok,
                            format!("Kill was added to the records. Kill id: {}", kill.id),
                        )
                    }
                    Err(e) => self.store_failure(e),
                }
            }
            Command::DeleteKill { id } => match self.db.delete_kill(&id).await {
                Ok(kill) => (
                    Outcome::Ok,
                    format!(
                        "Delete successful! Kill id: {} was removed from the records",
                        kill.id
                    ),
                ),
                Err(e) => self.store_failure(e),
            },
            Command::ShowKills => match self.db.list_kills().await {
                Ok(kills) => (Outcome::Ok, format::kills_table(&kills)),
                Err(e) => self.store_failure(e),
            },
            Command::ShowPlayers => match self.db.list_players().await {
                Ok(players) => (Outcome::Ok, format::players_table(&players)),
                Err(e) => self.store_failure(e),
            },
            Command::Leaderboard => match self.db.leaderboard().await {
                Ok(players) => (Outcome::Ok, format::leaderboard_table(&players)),
                Err(e) => self.store_failure(e),
            },
            Command::Help { topic: None } => (Outcome::Ok, help::overview(&self.prefix)),
            Command::Help { topic: Some(topic) } => {
                // "$help $addkill" works as well as "$help addkill"
                let name = topic.strip_prefix(self.prefix.as_str()).unwrap_or(&topic);
                match CommandKind::from_name(name) {
                    Some(kind) => (Outcome::Ok, help::topic(kind, &self.prefix)),
                    None => (Outcome::NotFound, help::UNKNOWN_TOPIC.to_string()),
                }
            }
        }
    }

    fn store_failure(&self, err: StoreError) -> (Outcome, String) {
        match err {
            StoreError::DuplicatePlayer(_) => (Outcome::Duplicate, err.to_string()),
            StoreError::UnknownPlayers(_) => {
                (Outcome::NotFound, format!("{err}. Try again."))
            }
            StoreError::UnknownKill(ref id) => (
                Outcome::NotFound,
                format!("Delete failed. Kill id: {id} was not in the records"),
            ),
            StoreError::IdSpaceExhausted { attempts } => {
                warn!(attempts, "Kill id space exhausted");
                (
                    Outcome::Exhausted,
                    "Could not find a free kill id. Try again later.".to_string(),
                )
            }
            StoreError::Backend(e) => {
                error!("Database error: {e}");
                (Outcome::Backend, BACKEND_UNAVAILABLE.to_string())
            }
        }
    }
}
