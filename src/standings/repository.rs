use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::errors::StandingsError;
use super::models::UserStats;

/// Trait for user standings storage operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates the user on first sight, refreshes the display name on every
    /// later call (last-seen name wins).
    async fn touch(&self, user_id: &str, display_name: &str) -> Result<(), StandingsError>;

    async fn get(&self, user_id: &str) -> Result<Option<UserStats>, StandingsError>;

    async fn list(&self) -> Result<Vec<UserStats>, StandingsError>;

    /// Applies one scored prediction: a correct pick adds `points` and
    /// extends the win streak, an incorrect pick resets the streak.
    async fn record_result(
        &self,
        user_id: &str,
        correct: bool,
        points: u32,
    ) -> Result<(), StandingsError>;

    /// Applies a whole match's scored predictions in one atomic step:
    /// either every entry lands or none do. Scoring relies on this to never
    /// leave a match half-awarded.
    async fn record_results(
        &self,
        results: &[(String, bool)],
        points: u32,
    ) -> Result<(), StandingsError>;

    /// Admin-only: zeroes points and streaks. The user row itself survives.
    async fn reset(&self, user_id: &str) -> Result<(), StandingsError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, UserStats>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn touch(&self, user_id: &str, display_name: &str) -> Result<(), StandingsError> {
        let mut users = self.users.lock().unwrap();
        users
            .entry(user_id.to_string())
            .and_modify(|u| u.name = display_name.to_string())
            .or_insert_with(|| {
                debug!(user_id = %user_id, name = %display_name, "Creating user in memory");
                UserStats::new(user_id.to_string(), display_name.to_string())
            });
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: &str) -> Result<Option<UserStats>, StandingsError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<UserStats>, StandingsError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn record_result(
        &self,
        user_id: &str,
        correct: bool,
        points: u32,
    ) -> Result<(), StandingsError> {
        let mut users = self.users.lock().unwrap();

        // Predictions normally imply the user exists; tolerate the gap anyway
        let user = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserStats::new(user_id.to_string(), String::new()));

        if correct {
            user.points += points;
            user.current_streak += 1;
            user.best_streak = user.best_streak.max(user.current_streak);
        } else {
            user.current_streak = 0;
        }

        debug!(
            user_id = %user_id,
            correct,
            total_points = user.points,
            streak = user.current_streak,
            "Recorded prediction result"
        );
        Ok(())
    }

    #[instrument(skip(self, results))]
    async fn record_results(
        &self,
        results: &[(String, bool)],
        points: u32,
    ) -> Result<(), StandingsError> {
        // One lock across the whole batch; nothing in here can fail
        let mut users = self.users.lock().unwrap();

        for (user_id, correct) in results {
            let user = users
                .entry(user_id.clone())
                .or_insert_with(|| UserStats::new(user_id.clone(), String::new()));

            if *correct {
                user.points += points;
                user.current_streak += 1;
                user.best_streak = user.best_streak.max(user.current_streak);
            } else {
                user.current_streak = 0;
            }
        }

        debug!(entries = results.len(), "Recorded batch of prediction results");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset(&self, user_id: &str) -> Result<(), StandingsError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(user_id) {
            Some(user) => {
                user.points = 0;
                user.current_streak = 0;
                user.best_streak = 0;
                debug!(user_id = %user_id, "User stats reset");
                Ok(())
            }
            None => {
                warn!(user_id = %user_id, "User not found for reset");
                Err(StandingsError::UserUnknown(user_id.to_string()))
            }
        }
    }
}

/// PostgreSQL implementation of the user standings repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> UserStats {
        UserStats {
            id: row.get("id"),
            name: row.get("name"),
            points: row.get::<i64, _>("points") as u32,
            current_streak: row.get::<i64, _>("current_streak") as u32,
            best_streak: row.get::<i64, _>("best_streak") as u32,
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn touch(&self, user_id: &str, display_name: &str) -> Result<(), StandingsError> {
        sqlx::query(
            "INSERT INTO users (id, name, points, current_streak, best_streak) \
             VALUES ($1, $2, 0, 0, 0) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(user_id)
        .bind(display_name)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to upsert user in database");
            StandingsError::Repository(e.to_string())
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: &str) -> Result<Option<UserStats>, StandingsError> {
        let row = sqlx::query(
            "SELECT id, name, points, current_streak, best_streak FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StandingsError::Repository(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<UserStats>, StandingsError> {
        let rows =
            sqlx::query("SELECT id, name, points, current_streak, best_streak FROM users")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StandingsError::Repository(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_user).collect())
    }

    #[instrument(skip(self))]
    async fn record_result(
        &self,
        user_id: &str,
        correct: bool,
        points: u32,
    ) -> Result<(), StandingsError> {
        // Row may be missing if the user was never touched; create it first
        sqlx::query(
            "INSERT INTO users (id, name, points, current_streak, best_streak) \
             VALUES ($1, '', 0, 0, 0) ON CONFLICT (id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StandingsError::Repository(e.to_string()))?;

        let query = if correct {
            sqlx::query(
                "UPDATE users SET points = points + $2, \
                 current_streak = current_streak + 1, \
                 best_streak = GREATEST(best_streak, current_streak + 1) \
                 WHERE id = $1",
            )
            .bind(user_id)
            .bind(points as i64)
        } else {
            sqlx::query("UPDATE users SET current_streak = 0 WHERE id = $1").bind(user_id)
        };

        query.execute(&self.pool).await.map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to record result in database");
            StandingsError::Repository(e.to_string())
        })?;
        Ok(())
    }

    #[instrument(skip(self, results))]
    async fn record_results(
        &self,
        results: &[(String, bool)],
        points: u32,
    ) -> Result<(), StandingsError> {
        if results.is_empty() {
            return Ok(());
        }

        let (ids, correct): (Vec<String>, Vec<bool>) = results.iter().cloned().unzip();

        // One transaction for the whole match: every award lands or none do
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StandingsError::Repository(e.to_string()))?;

        sqlx::query(
            "INSERT INTO users (id, name, points, current_streak, best_streak) \
             SELECT unnest($1::text[]), '', 0, 0, 0 ON CONFLICT (id) DO NOTHING",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| StandingsError::Repository(e.to_string()))?;

        sqlx::query(
            "UPDATE users SET \
             points = points + CASE WHEN v.correct THEN $3 ELSE 0 END, \
             current_streak = CASE WHEN v.correct THEN users.current_streak + 1 ELSE 0 END, \
             best_streak = CASE WHEN v.correct \
                 THEN GREATEST(users.best_streak, users.current_streak + 1) \
                 ELSE users.best_streak END \
             FROM (SELECT unnest($1::text[]) AS id, unnest($2::boolean[]) AS correct) v \
             WHERE users.id = v.id",
        )
        .bind(&ids)
        .bind(&correct)
        .bind(points as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to record batch of results in database");
            StandingsError::Repository(e.to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| StandingsError::Repository(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset(&self, user_id: &str) -> Result<(), StandingsError> {
        let result = sqlx::query(
            "UPDATE users SET points = 0, current_streak = 0, best_streak = 0 WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StandingsError::Repository(e.to_string()))?;

        if result.rows_affected() == 0 {
            warn!(user_id = %user_id, "User not found for reset");
            return Err(StandingsError::UserUnknown(user_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn touch_creates_then_renames() {
        let repo = InMemoryUserRepository::new();

        repo.touch("u1", "Amy").await.unwrap();
        let user = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(user.name, "Amy");
        assert_eq!(user.points, 0);

        // Last-seen display name wins
        repo.touch("u1", "Amy the Great").await.unwrap();
        let user = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(user.name, "Amy the Great");
        assert_eq!(user.points, 0);
    }

    #[tokio::test]
    async fn correct_results_accumulate_points_and_streaks() {
        let repo = InMemoryUserRepository::new();
        repo.touch("u1", "Amy").await.unwrap();

        repo.record_result("u1", true, 3).await.unwrap();
        repo.record_result("u1", true, 3).await.unwrap();

        let user = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(user.points, 6);
        assert_eq!(user.current_streak, 2);
        assert_eq!(user.best_streak, 2);
    }

    #[tokio::test]
    async fn incorrect_result_breaks_the_streak_but_keeps_best() {
        let repo = InMemoryUserRepository::new();
        repo.touch("u1", "Amy").await.unwrap();

        repo.record_result("u1", true, 3).await.unwrap();
        repo.record_result("u1", true, 3).await.unwrap();
        repo.record_result("u1", false, 3).await.unwrap();
        repo.record_result("u1", true, 3).await.unwrap();

        let user = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(user.points, 9);
        assert_eq!(user.current_streak, 1);
        assert_eq!(user.best_streak, 2);
    }

    #[tokio::test]
    async fn batch_results_apply_to_every_entry() {
        let repo = InMemoryUserRepository::new();
        repo.touch("u1", "Amy").await.unwrap();
        repo.touch("u2", "Bo").await.unwrap();
        repo.record_result("u2", true, 3).await.unwrap();

        repo.record_results(
            &[("u1".to_string(), true), ("u2".to_string(), false)],
            3,
        )
        .await
        .unwrap();

        let amy = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(amy.points, 3);
        assert_eq!(amy.current_streak, 1);

        let bo = repo.get("u2").await.unwrap().unwrap();
        assert_eq!(bo.points, 3);
        assert_eq!(bo.current_streak, 0);
        assert_eq!(bo.best_streak, 1);
    }

    #[tokio::test]
    async fn reset_zeroes_stats_but_keeps_the_user() {
        let repo = InMemoryUserRepository::new();
        repo.touch("u1", "Amy").await.unwrap();
        repo.record_result("u1", true, 3).await.unwrap();

        repo.reset("u1").await.unwrap();

        let user = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(user.name, "Amy");
        assert_eq!(user.points, 0);
        assert_eq!(user.best_streak, 0);
    }

    #[tokio::test]
    async fn reset_unknown_user_fails() {
        let repo = InMemoryUserRepository::new();
        let result = repo.reset("ghost").await;
        assert!(matches!(result, Err(StandingsError::UserUnknown(_))));
    }
}
