// Fixed-width text tables for chat replies.

use crate::db::{Player, Teamkill, NAME_MAX_LEN};

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MAX_MESSAGE_LENGTH: usize = 2000;

const FENCE: &str = "```";

const NAME_COL: usize = NAME_MAX_LEN + 2;
const COUNT_COL: usize = 16;

fn row(cells: &[(&str, usize)]) -> String {
    let mut line = String::from("  ");
    for (text, width) in cells {
        line.push_str(&format!("{text:<width$}", width = *width));
    }
    line.truncate(line.trim_end().len());
    line
}

fn rule(cols: &[usize]) -> String {
    format!("  {}", "-".repeat(cols.iter().sum()))
}

/// Stats for a single player.
pub fn player_card(player: &Player) -> String {
    let cols = [NAME_COL, COUNT_COL, COUNT_COL + 4];
    let kills = player.teamkills.to_string();
    let deaths = player.victims.to_string();
    [
        row(&[("Name", cols[0]), ("Teammate Kills", cols[1]), ("Deaths By Teammate", cols[2])]),
        rule(&cols),
        row(&[(player.name.as_str(), cols[0]), (kills.as_str(), cols[1]), (deaths.as_str(), cols[2])]),
    ]
    .join("\n")
}

pub fn players_table(players: &[Player]) -> String {
    if players.is_empty() {
        return "There are no players in the records".to_string();
    }
    let cols = [NAME_COL, COUNT_COL, COUNT_COL + 4];
    let mut lines = vec![
        row(&[("Name", cols[0]), ("Team Kills", cols[1]), ("Deaths By Teammates", cols[2])]),
        rule(&cols),
    ];
    for p in players {
        let kills = p.teamkills.to_string();
        let deaths = p.victims.to_string();
        lines.push(row(&[(p.name.as_str(), cols[0]), (kills.as_str(), cols[1]), (deaths.as_str(), cols[2])]));
    }
    lines.join("\n")
}

/// Players are expected in rank order already.
pub fn leaderboard_table(players: &[Player]) -> String {
    if players.is_empty() {
        return "There are no players in the records".to_string();
    }
    let cols = [6, NAME_COL, COUNT_COL, COUNT_COL];
    let mut lines = vec![
        row(&[("#", cols[0]), ("Rat", cols[1]), ("Team Kills", cols[2]), ("Deaths By Team", cols[3])]),
        rule(&cols),
    ];
    for (rank, p) in players.iter().enumerate() {
        let rank = (rank + 1).to_string();
        let kills = p.teamkills.to_string();
        let deaths = p.victims.to_string();
        lines.push(row(&[(rank.as_str(), cols[0]), (p.name.as_str(), cols[1]), (kills.as_str(), cols[2]), (deaths.as_str(), cols[3])]));
    }
    lines.join("\n")
}

pub fn kills_table(kills: &[Teamkill]) -> String {
    if kills.is_empty() {
        return "There are no kills in the records".to_string();
    }
    let cols = [10, 12, NAME_COL, NAME_COL, 17, 15];
    let mut lines = vec![
        row(&[
            ("ID", cols[0]),
            ("Date", cols[1]),
            ("Killer", cols[2]),
            ("Victim", cols[3]),
            ("Map", cols[4]),
            ("Weapon", cols[5]),
        ]),
        rule(&cols),
    ];
    for k in kills {
        let date = k.date.format("%Y-%m-%d").to_string();
        lines.push(row(&[
            (k.id.as_str(), cols[0]),
            (date.as_str(), cols[1]),
            (k.killer.as_str(), cols[2]),
            (k.victim.as_str(), cols[3]),
            (k.map.as_str(), cols[4]),
            (k.weapon.as_str(), cols[5]),
        ]));
    }
    lines.join("\n")
}

/// Wrap a reply body in a code block.
pub fn code_block(body: &str) -> String {
    format!("{FENCE}\n{body}\n{FENCE}")
}

/// Split a reply body into code-block messages of at most `limit` characters.
///
/// Splits on line boundaries; a single line longer than the budget is cut.
pub fn split_message(body: &str, limit: usize) -> Vec<String> {
    let budget = limit.saturating_sub(2 * FENCE.len() + 2).max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in body.lines() {
        let mut pieces: Vec<String> = Vec::new();
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            pieces.push(String::new());
        }
        for piece in chars.chunks(budget) {
            pieces.push(piece.iter().collect());
        }

        for piece in pieces {
            let piece_len = piece.chars().count();
            let needed = if current.is_empty() { piece_len } else { piece_len + 1 };
            if current_len + needed > budget && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    chunks.iter().map(|c| code_block(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn player(name: &str, teamkills: i64, victims: i64) -> Player {
        Player {
            name: name.into(),
            teamkills,
            victims,
        }
    }

    #[test]
    fn test_player_card_columns() {
        let card = player_card(&player("Alice", 3, -1));
        let lines: Vec<_> = card.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("  Name"));
        assert!(lines[1].trim().chars().all(|c| c == '-'));
        let cells: Vec<_> = lines[2].split_whitespace().collect();
        assert_eq!(cells, vec!["Alice", "3", "-1"]);
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(players_table(&[]), "There are no players in the records");
        assert_eq!(leaderboard_table(&[]), "There are no players in the records");
        assert_eq!(kills_table(&[]), "There are no kills in the records");
    }

    #[test]
    fn test_leaderboard_ranks() {
        let table = leaderboard_table(&[player("Moe", 2, 0), player("Amy", 0, 2)]);
        let rows: Vec<Vec<&str>> = table
            .lines()
            .skip(2)
            .map(|l| l.split_whitespace().collect())
            .collect();
        assert_eq!(rows, vec![vec!["1", "Moe", "2", "0"], vec!["2", "Amy", "0", "2"]]);
    }

    #[test]
    fn test_kills_table_row() {
        let kill = Teamkill {
            id: "04217".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            killer: "Alice".into(),
            victim: "Bob".into(),
            map: "Customs".into(),
            weapon: "M4".into(),
            recorded_at: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(21, 15, 42)
                .unwrap(),
        };
        let table = kills_table(&[kill]);
        let last = table.lines().last().unwrap();
        assert_eq!(
            last.split_whitespace().collect::<Vec<_>>(),
            vec!["04217", "2024-03-09", "Alice", "Bob", "Customs", "M4"]
        );
    }

    #[test]
    fn test_short_message_is_one_block() {
        let chunks = split_message("hello\nworld", DISCORD_MAX_MESSAGE_LENGTH);
        assert_eq!(chunks, vec!["```\nhello\nworld\n```".to_string()]);
    }

    #[test]
    fn test_long_message_splits_on_lines() {
        let body: Vec<String> = (0..300).map(|i| format!("line number {i:04}")).collect();
        let body = body.join("\n");
        let chunks = split_message(&body, DISCORD_MAX_MESSAGE_LENGTH);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DISCORD_MAX_MESSAGE_LENGTH);
            assert!(chunk.starts_with("```") && chunk.ends_with("```"));
        }
        let rejoined: Vec<String> = chunks
            .iter()
            .map(|c| c.trim_start_matches("```\n").trim_end_matches("\n```").to_string())
            .collect();
        assert_eq!(rejoined.join("\n"), body);
    }

    #[test]
    fn test_overlong_line_is_cut() {
        let body = "x".repeat(50);
        let chunks = split_message(&body, 28);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 28);
        }
    }
}
