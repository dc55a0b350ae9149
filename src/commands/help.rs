// Usage and help text for chat commands.

use super::CommandKind;

impl CommandKind {
    /// Argument synopsis shown after the command name.
    pub fn synopsis(self) -> &'static str {
        match self {
            CommandKind::AddPlayer => "<playerName>",
            CommandKind::GetPlayer => "<playerName>",
            CommandKind::DeletePlayer => "<playerName>",
            CommandKind::AddKill => "<killer> <victim> <map> <weapon>",
            CommandKind::DeleteKill => "<Id>",
            CommandKind::ShowKills | CommandKind::ShowPlayers | CommandKind::Leaderboard => "",
            CommandKind::Help => "<command>",
        }
    }

    /// One-line description for the command list.
    pub fn summary(self) -> &'static str {
        match self {
            CommandKind::AddPlayer => "adds a new player to the records",
            CommandKind::GetPlayer => "gets a player's statistics",
            CommandKind::DeletePlayer => "deletes a player from the records",
            CommandKind::AddKill => "adds a kill to the records",
            CommandKind::DeleteKill => "deletes a kill from the records",
            CommandKind::ShowKills => "shows all the kills",
            CommandKind::ShowPlayers => "shows all the players & their statistics",
            CommandKind::Leaderboard => "ranks the players by most team kills",
            CommandKind::Help => "show this message",
        }
    }

    fn details(self) -> &'static str {
        match self {
            CommandKind::AddPlayer => {
                "Adds a new player to the records. Can only add one player at a time."
            }
            CommandKind::GetPlayer => {
                "Gets a player's statistics. Can only get one player at a time."
            }
            CommandKind::DeletePlayer => {
                "Deletes a player from the records, together with every kill they appear in. \
                 Can only delete one player at a time."
            }
            CommandKind::AddKill => "Map and weapon are optional but both are required if used.",
            CommandKind::DeleteKill => {
                "Deletes a kill from the records. Id is the number shown by showkills."
            }
            CommandKind::ShowKills => "Shows all the kills from the records.",
            CommandKind::ShowPlayers => "Shows all the players and their statistics.",
            CommandKind::Leaderboard => "Ranks the players by most team kills.",
            CommandKind::Help => {
                "Shows the help screen message. Command is optional but will provide more \
                 detail if included."
            }
        }
    }
}

/// `$name <args>` for the given command.
pub fn correct_format(kind: CommandKind, prefix: &str) -> String {
    let synopsis = kind.synopsis();
    if synopsis.is_empty() {
        format!("{prefix}{}", kind.name())
    } else {
        format!("{prefix}{} {synopsis}", kind.name())
    }
}

/// Reply for an arity violation.
pub fn usage(kind: CommandKind, prefix: &str) -> String {
    let format = correct_format(kind, prefix);
    match kind {
        CommandKind::AddKill => format!(
            "Input Error! Map and weapon are optional but both are required if used.\nCorrect format: {format}"
        ),
        CommandKind::Help => {
            format!("Input Error! Correct format: {format}\nThe command is optional.")
        }
        _ => format!("Input Error! Correct format: {format}"),
    }
}

/// The general help screen.
pub fn overview(prefix: &str) -> String {
    let mut lines = vec!["Commands:".to_string()];
    for kind in CommandKind::ALL {
        lines.push(format!("    {:<16}- {}", kind.name(), kind.summary()));
    }
    lines.push(String::new());
    lines.push(format!(
        "Type {prefix}help <command> for more info on a command."
    ));
    lines.join("\n")
}

/// Detailed help for one command.
pub fn topic(kind: CommandKind, prefix: &str) -> String {
    format!(
        "[Command]\n    Correct format: {}\n    {}",
        correct_format(kind, prefix),
        kind.details()
    )
}

pub const UNKNOWN_TOPIC: &str = "Error! The inputted command is not in the list.";
