use serde::{Deserialize, Serialize};

/// Database model for the users table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub id: String, // Opaque id assigned by the chat platform
    pub name: String,
    pub points: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl UserStats {
    /// Creates a user with no points yet, as on their first prediction
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            points: 0,
            current_streak: 0,
            best_streak: 0,
        }
    }
}

/// One leaderboard row, derived from user points on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub points: u32,
}
