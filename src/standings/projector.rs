use std::sync::Arc;
use tracing::instrument;

use super::errors::StandingsError;
use super::models::LeaderboardEntry;
use super::repository::UserRepository;

/// Projects accumulated user points into a deterministically ordered ranking.
pub struct LeaderboardProjector {
    users: Arc<dyn UserRepository>,
}

impl LeaderboardProjector {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Entries sorted by points descending, ties broken by display name
    /// ascending case-insensitively. Empty when nobody has voted yet.
    #[instrument(skip(self))]
    pub async fn rank(&self) -> Result<Vec<LeaderboardEntry>, StandingsError> {
        let mut entries: Vec<LeaderboardEntry> = self
            .users
            .list()
            .await?
            .into_iter()
            .map(|u| LeaderboardEntry {
                user_id: u.id,
                name: u.name,
                points: u.points,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        Ok(entries)
    }
}
