//! Placed game records.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, Game, NewGame};

/// Status written once a version has been placed in the library
pub const GAME_STATUS_DOWNLOADED: &str = "downloaded";

const GAME_COLUMNS: &str = r#"
    id, name, latest_version, release_date, description, cover_url,
    destination_path, status, created_at, updated_at
"#;

impl Database {
    /// Insert or refresh the record for a placed game
    ///
    /// Metadata columns keep their previous value when the new placement had
    /// no catalog match.
    pub async fn upsert_game(&self, game: &NewGame) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO games (
                name, latest_version, release_date, description, cover_url,
                destination_path, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                latest_version = excluded.latest_version,
                release_date = COALESCE(excluded.release_date, games.release_date),
                description = COALESCE(excluded.description, games.description),
                cover_url = COALESCE(excluded.cover_url, games.cover_url),
                destination_path = excluded.destination_path,
                status = excluded.status,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&game.name)
        .bind(&game.version)
        .bind(&game.release_date)
        .bind(&game.description)
        .bind(&game.cover_url)
        .bind(&game.destination_path)
        .bind(GAME_STATUS_DOWNLOADED)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert game: {}",
                e
            )))
        })?;

        Ok(id)
    }

    /// Find a game by its cleaned name
    pub async fn find_game_by_name(&self, name: &str) -> Result<Option<Game>> {
        let row = sqlx::query_as::<_, Game>(&format!(
            "SELECT {} FROM games WHERE name = ?",
            GAME_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find game: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// List all games ordered by name
    pub async fn list_games(&self) -> Result<Vec<Game>> {
        let rows = sqlx::query_as::<_, Game>(&format!(
            "SELECT {} FROM games ORDER BY name",
            GAME_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list games: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
