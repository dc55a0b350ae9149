// Chat-level tests: raw message text in, reply text out.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use ratbot::commands::Dispatcher;
use ratbot::db::Database;
use ratbot::format;

async fn setup() -> (Arc<Database>, Dispatcher) {
    let db = Arc::new(Database::new("sqlite::memory:").await.unwrap());
    let dispatcher = Dispatcher::new(db.clone(), "$");
    (db, dispatcher)
}

async fn say(dispatcher: &Dispatcher, content: &str) -> String {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 21, 15, 42).unwrap();
    dispatcher
        .handle(content, at)
        .await
        .unwrap_or_else(|| panic!("no reply to {content:?}"))
}

fn kill_id(reply: &str) -> String {
    reply
        .rsplit("Kill id: ")
        .next()
        .unwrap()
        .trim()
        .to_string()
}

#[tokio::test]
async fn test_plain_chat_is_ignored() {
    let (_db, dispatcher) = setup().await;
    let at = Utc::now();
    assert!(dispatcher.handle("hello there", at).await.is_none());
    assert!(dispatcher.handle("$", at).await.is_none());
    assert!(dispatcher.handle("$ addplayer Alice", at).await.is_none());
}

#[tokio::test]
async fn test_kill_lifecycle() {
    let (db, dispatcher) = setup().await;

    assert_eq!(
        say(&dispatcher, "$addplayer Alice").await,
        "Successful insert. Alice was added to the list"
    );
    say(&dispatcher, "$addplayer Bob").await;

    let reply = say(&dispatcher, "$addkill Alice Bob Customs M4").await;
    assert!(reply.starts_with("Kill was added to the records. Kill id: "));
    let id = kill_id(&reply);
    assert_eq!(db.get_player("Alice").await.unwrap().teamkills, 1);

    let kills = say(&dispatcher, "$showkills").await;
    assert!(kills.contains(&id));
    assert!(kills.contains("Customs"));
    assert!(kills.contains("2024-03-09"));

    assert_eq!(
        say(&dispatcher, &format!("$deletekill {id}")).await,
        format!("Delete successful! Kill id: {id} was removed from the records")
    );
    assert_eq!(db.get_player("Bob").await.unwrap().victims, 0);
    assert_eq!(
        say(&dispatcher, &format!("$deletekill {id}")).await,
        format!("Delete failed. Kill id: {id} was not in the records")
    );
}

#[tokio::test]
async fn test_unknown_player_reply() {
    let (db, dispatcher) = setup().await;
    say(&dispatcher, "$addplayer Bob").await;

    assert_eq!(
        say(&dispatcher, "$addkill Ghost Bob").await,
        "Ghost is not in the records. Try again."
    );
    assert_eq!(db.kill_count().await.unwrap(), 0);
    assert_eq!(db.get_player("Bob").await.unwrap().victims, 0);
}

#[tokio::test]
async fn test_duplicate_player_reply() {
    let (db, dispatcher) = setup().await;
    say(&dispatcher, "$addplayer Alice").await;
    assert_eq!(
        say(&dispatcher, "$addplayer ALICE").await,
        "There are already records under Alice, insert a new name"
    );
    assert_eq!(db.player_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_arity_violations_never_reach_the_store() {
    let (db, dispatcher) = setup().await;
    say(&dispatcher, "$addplayer Alice").await;
    say(&dispatcher, "$addplayer Bob").await;

    let reply = say(&dispatcher, "$addkill Alice Bob Customs").await;
    assert!(reply.starts_with("Input Error! Map and weapon are optional"));
    assert!(reply.ends_with("$addkill <killer> <victim> <map> <weapon>"));

    assert_eq!(
        say(&dispatcher, "$addplayer Carl Dan").await,
        "Input Error! Correct format: $addplayer <playerName>"
    );
    assert_eq!(
        say(&dispatcher, "$showplayers now").await,
        "Input Error! Correct format: $showplayers"
    );
    assert!(say(&dispatcher, "$deletekill abc").await.starts_with("Input Error!"));

    assert_eq!(db.player_count().await.unwrap(), 2);
    assert_eq!(db.kill_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_names_cannot_break_out_of_code_blocks() {
    let (db, dispatcher) = setup().await;

    let reply = say(&dispatcher, "$addplayer x```").await;
    assert!(reply.starts_with("Input Error!"), "{reply}");
    assert!(say(&dispatcher, "$addplayer a`@everyone").await.starts_with("Input Error!"));
    assert_eq!(db.player_count().await.unwrap(), 0);

    say(&dispatcher, "$addplayer Alice").await;
    say(&dispatcher, "$addplayer Bob").await;
    let reply = say(&dispatcher, "$addkill Alice Bob ```x M4").await;
    assert!(reply.starts_with("Input Error! Map"));
    assert_eq!(db.kill_count().await.unwrap(), 0);

    let reply = say(&dispatcher, "$x```@everyone").await;
    assert!(!reply.contains('`'));

    let tables = say(&dispatcher, "$showplayers").await;
    for chunk in format::split_message(&tables, format::DISCORD_MAX_MESSAGE_LENGTH) {
        assert_eq!(chunk.matches("```").count(), 2);
    }
}

#[tokio::test]
async fn test_unknown_command_and_case() {
    let (db, dispatcher) = setup().await;
    assert_eq!(
        say(&dispatcher, "$launch rockets").await,
        "Input Error! Command \"launch\" is not found."
    );
    say(&dispatcher, "$AddPlayer Alice").await;
    assert!(db.get_player("alice").await.is_ok());
}

#[tokio::test]
async fn test_leaderboard_and_players_tables() {
    let (_db, dispatcher) = setup().await;
    assert_eq!(
        say(&dispatcher, "$leaderboard").await,
        "There are no players in the records"
    );
    assert_eq!(
        say(&dispatcher, "$showkills").await,
        "There are no kills in the records"
    );

    for name in ["Amy", "Moe"] {
        say(&dispatcher, &format!("$addplayer {name}")).await;
    }
    say(&dispatcher, "$addkill Moe Amy").await;

    let board = say(&dispatcher, "$leaderboard").await;
    let first_row: Vec<&str> = board.lines().nth(2).unwrap().split_whitespace().collect();
    assert_eq!(first_row, vec!["1", "Moe", "1", "0"]);

    let players = say(&dispatcher, "$showplayers").await;
    assert!(players.lines().nth(2).unwrap().contains("Amy"));

    let card = say(&dispatcher, "$getplayer amy").await;
    let row: Vec<&str> = card.lines().last().unwrap().split_whitespace().collect();
    assert_eq!(row, vec!["Amy", "0", "1"]);
}

#[tokio::test]
async fn test_delete_player_reports_cascade() {
    let (_db, dispatcher) = setup().await;
    say(&dispatcher, "$addplayer Alice").await;
    say(&dispatcher, "$addplayer Bob").await;
    say(&dispatcher, "$addkill Alice Bob").await;
    say(&dispatcher, "$addkill Bob Alice").await;

    assert_eq!(
        say(&dispatcher, "$deleteplayer Alice").await,
        "Delete successful! Alice was removed from the records along with 2 kills"
    );
    assert_eq!(
        say(&dispatcher, "$deleteplayer Alice").await,
        "Alice is not in the records. Try again."
    );
}

#[tokio::test]
async fn test_help() {
    let (_db, dispatcher) = setup().await;
    let overview = say(&dispatcher, "$help").await;
    assert!(overview.contains("leaderboard"));

    let topic = say(&dispatcher, "$help $addkill").await;
    assert!(topic.contains("$addkill <killer> <victim> <map> <weapon>"));
    assert_eq!(
        say(&dispatcher, "$help fly").await,
        "Error! The inputted command is not in the list."
    );
}

#[tokio::test]
async fn test_store_outage_gets_generic_reply() {
    let (db, dispatcher) = setup().await;
    db.close().await;
    let reply = say(&dispatcher, "$showplayers").await;
    assert_eq!(reply, "The records are unavailable right now. Try again later.");
}

#[tokio::test]
async fn test_custom_prefix() {
    let db = Arc::new(Database::new("sqlite::memory:").await.unwrap());
    let dispatcher = Dispatcher::new(db, "!");
    assert!(dispatcher.handle("$help", Utc::now()).await.is_none());
    let reply = dispatcher.handle("!help", Utc::now()).await.unwrap();
    assert!(reply.contains("Type !help <command>"));
}
