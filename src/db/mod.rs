// Record store for players and teamkills (SQLite via sqlx).

mod kill_id;

pub use kill_id::KillIdGenerator;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, instrument, warn};

use crate::error::{StoreError, StoreResult};

/// Longest accepted player name.
pub const NAME_MAX_LEN: usize = 25;
/// Longest accepted map or weapon description.
pub const DETAIL_MAX_LEN: usize = 15;
/// Stored when a kill is recorded without map and weapon.
pub const UNSPECIFIED: &str = "N/a";

const PLAYER_COLUMNS: &str = "name, num_teamkills, num_victim";
const TEAMKILL_COLUMNS: &str = "id, date, killer, victim, map, weapon, recorded_at";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub name: String,
    #[sqlx(rename = "num_teamkills")]
    pub teamkills: i64,
    #[sqlx(rename = "num_victim")]
    pub victims: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Teamkill {
    pub id: String,
    pub date: NaiveDate,
    pub killer: String,
    pub victim: String,
    pub map: String,
    pub weapon: String,
    pub recorded_at: NaiveDateTime,
}

/// Input for [`Database::add_kill`].
#[derive(Debug, Clone, Copy)]
pub struct NewKill<'a> {
    pub killer: &'a str,
    pub victim: &'a str,
    pub map: Option<&'a str>,
    pub weapon: Option<&'a str>,
    /// When the kill was reported; the stored date and timestamp derive from it.
    pub at: DateTime<Utc>,
}

/// A deleted player together with the number of kills removed alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPlayer {
    pub player: Player,
    pub kills_removed: u64,
}

pub struct Database {
    pool: SqlitePool,
    kill_ids: KillIdGenerator,
}

impl Database {
    /// Open the store and create the schema if needed.
    ///
    /// The pool holds a single long-lived connection, so every operation is
    /// serialized and the connection is only dropped when it fails.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?;
        let db = Self {
            pool,
            kill_ids: KillIdGenerator::default(),
        };
        db.run_migrations().await?;
        info!("Record store ready");
        Ok(db)
    }

    /// Replace the kill id policy.
    pub fn with_kill_ids(mut self, kill_ids: KillIdGenerator) -> Self {
        self.kill_ids = kill_ids;
        self
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                name TEXT NOT NULL COLLATE NOCASE PRIMARY KEY,
                name_key TEXT NOT NULL UNIQUE,
                num_teamkills INTEGER NOT NULL DEFAULT 0,
                num_victim INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teamkills (
                id TEXT NOT NULL PRIMARY KEY,
                date DATE NOT NULL,
                killer TEXT NOT NULL COLLATE NOCASE,
                victim TEXT NOT NULL COLLATE NOCASE,
                map TEXT NOT NULL DEFAULT 'N/a',
                weapon TEXT NOT NULL DEFAULT 'N/a',
                recorded_at DATETIME NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_teamkills_killer ON teamkills (killer)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_teamkills_victim ON teamkills (victim)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Round trip to the backend; keeps idle connections from timing out.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool. Later calls fail with [`sqlx::Error::PoolClosed`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ── Players ───────────────────────────────────────────────────────

    #[instrument(skip(self))]
    pub async fn add_player(&self, name: &str) -> StoreResult<Player> {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = find_player(&mut tx, name).await? {
            return Err(StoreError::DuplicatePlayer(existing.name));
        }

        let player = sqlx::query_as::<_, Player>(&format!(
            "INSERT INTO players (name, name_key, num_teamkills, num_victim) VALUES (?, ?, 0, 0) RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(name)
        .bind(name_key(name))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| duplicate_or_backend(name, e))?;

        tx.commit().await?;
        info!(player = %player.name, "Player added");
        Ok(player)
    }

    pub async fn get_player(&self, name: &str) -> StoreResult<Player> {
        let mut conn = self.pool.acquire().await?;
        let player = find_player(&mut conn, name).await?;
        player.ok_or_else(|| StoreError::UnknownPlayers(vec![name.to_string()]))
    }

    /// Delete a player and every kill naming them as killer or victim.
    ///
    /// Counters of the other party in each removed kill are reverted in the
    /// same transaction.
    #[instrument(skip(self))]
    pub async fn delete_player(&self, name: &str) -> StoreResult<RemovedPlayer> {
        let mut tx = self.pool.begin().await?;

        let player = find_player(&mut tx, name)
            .await?
            .ok_or_else(|| StoreError::UnknownPlayers(vec![name.to_string()]))?;

        let kills = sqlx::query_as::<_, Teamkill>(&format!(
            "SELECT {TEAMKILL_COLUMNS} FROM teamkills WHERE killer = ? OR victim = ? ORDER BY rowid"
        ))
        .bind(&player.name)
        .bind(&player.name)
        .fetch_all(&mut *tx)
        .await?;

        for kill in &kills {
            adjust_counters(&mut tx, &kill.killer, &kill.victim, -1).await?;
        }

        sqlx::query("DELETE FROM teamkills WHERE killer = ? OR victim = ?")
            .bind(&player.name)
            .bind(&player.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM players WHERE name_key = ?")
            .bind(name_key(&player.name))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(player = %player.name, kills_removed = kills.len(), "Player deleted");
        Ok(RemovedPlayer {
            player,
            kills_removed: kills.len() as u64,
        })
    }

    /// All players in insertion order.
    pub async fn list_players(&self) -> StoreResult<Vec<Player>> {
        let rows = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Players ranked by teamkills, most first; ties by name.
    pub async fn leaderboard(&self) -> StoreResult<Vec<Player>> {
        let rows = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY num_teamkills DESC, name_key ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn player_count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ── Teamkills ─────────────────────────────────────────────────────

    /// Record a kill and bump the killer's and victim's counters.
    ///
    /// Both players must exist. The error lists every missing name and
    /// nothing is written in that case.
    #[instrument(skip(self, kill), fields(killer = kill.killer, victim = kill.victim))]
    pub async fn add_kill(&self, kill: NewKill<'_>) -> StoreResult<Teamkill> {
        let mut tx = self.pool.begin().await?;

        let killer = find_player(&mut tx, kill.killer).await?;
        let victim = find_player(&mut tx, kill.victim).await?;
        let (killer, victim) = match (killer, victim) {
            (Some(killer), Some(victim)) => (killer, victim),
            (killer, victim) => {
                let mut missing = Vec::new();
                if killer.is_none() {
                    missing.push(kill.killer.to_string());
                }
                if victim.is_none() && !missing.iter().any(|m| name_key(m) == name_key(kill.victim)) {
                    missing.push(kill.victim.to_string());
                }
                return Err(StoreError::UnknownPlayers(missing));
            }
        };

        adjust_counters(&mut tx, &killer.name, &victim.name, 1).await?;

        let id = self.free_kill_id(&mut tx).await?;
        let at = kill.at.trunc_subsecs(0);

        let row = sqlx::query_as::<_, Teamkill>(&format!(
            "INSERT INTO teamkills ({TEAMKILL_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {TEAMKILL_COLUMNS}"
        ))
        .bind(&id)
        .bind(at.date_naive())
        .bind(&killer.name)
        .bind(&victim.name)
        .bind(kill.map.unwrap_or(UNSPECIFIED))
        .bind(kill.weapon.unwrap_or(UNSPECIFIED))
        .bind(at.naive_utc())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id = %row.id, killer = %row.killer, victim = %row.victim, "Kill recorded");
        Ok(row)
    }

    /// Remove a kill and revert the counters it bumped.
    #[instrument(skip(self))]
    pub async fn delete_kill(&self, id: &str) -> StoreResult<Teamkill> {
        let mut tx = self.pool.begin().await?;

        let kill = sqlx::query_as::<_, Teamkill>(&format!(
            "DELETE FROM teamkills WHERE id = ? RETURNING {TEAMKILL_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::UnknownKill(id.to_string()))?;

        adjust_counters(&mut tx, &kill.killer, &kill.victim, -1).await?;

        tx.commit().await?;
        info!(id = %kill.id, "Kill deleted");
        Ok(kill)
    }

    pub async fn get_kill(&self, id: &str) -> StoreResult<Teamkill> {
        sqlx::query_as::<_, Teamkill>(&format!(
            "SELECT {TEAMKILL_COLUMNS} FROM teamkills WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::UnknownKill(id.to_string()))
    }

    /// All kills in insertion order.
    pub async fn list_kills(&self) -> StoreResult<Vec<Teamkill>> {
        let rows = sqlx::query_as::<_, Teamkill>(&format!(
            "SELECT {TEAMKILL_COLUMNS} FROM teamkills ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn kill_count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teamkills")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Draw ids until one is unused, widening when a width stays crowded.
    async fn free_kill_id(&self, conn: &mut SqliteConnection) -> StoreResult<String> {
        for width in self.kill_ids.widths() {
            for _ in 0..self.kill_ids.attempts_per_width() {
                let candidate = self.kill_ids.candidate(width);
                let taken: Option<String> =
                    sqlx::query_scalar("SELECT id FROM teamkills WHERE id = ?")
                        .bind(&candidate)
                        .fetch_optional(&mut *conn)
                        .await?;
                match taken {
                    None => return Ok(candidate),
                    Some(_) => debug!(%candidate, "Kill id collision"),
                }
            }
            if width < self.kill_ids.max_width() {
                warn!(width, "Kill id width crowded, widening");
            }
        }
        Err(StoreError::IdSpaceExhausted {
            attempts: self.kill_ids.max_attempts(),
        })
    }
}

/// Lookup key for a player name. Folds case for every script, not only ASCII.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

async fn find_player(conn: &mut SqliteConnection, name: &str) -> Result<Option<Player>, sqlx::Error> {
    sqlx::query_as::<_, Player>(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE name_key = ?"
    ))
    .bind(name_key(name))
    .fetch_optional(&mut *conn)
    .await
}

async fn adjust_counters(
    conn: &mut SqliteConnection,
    killer: &str,
    victim: &str,
    delta: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE players SET num_teamkills = num_teamkills + ? WHERE name_key = ?")
        .bind(delta)
        .bind(name_key(killer))
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE players SET num_victim = num_victim + ? WHERE name_key = ?")
        .bind(delta)
        .bind(name_key(victim))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn duplicate_or_backend(name: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::DuplicatePlayer(name.to_string())
        }
        _ => StoreError::Backend(err),
    }
}
