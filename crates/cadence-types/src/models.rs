use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public user shape. The stored credential (password hash) never leaves the
/// repository layer — anything the engine returns is already stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHabit {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Partial update for a habit's mutable fields. `None` leaves a field
/// untouched; `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

/// One habit performed on one calendar day. `date` is the timezone-naive
/// day the completion counts for; `completed_at` is the wall-clock instant
/// it was recorded, used for feed ordering and age labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCompletion {
    pub habit_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
}

/// Directed follow relationship. Unique per (follower, following) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A "like" on a specific completion. Unique per (from_user, completion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMark {
    pub from_user_id: Uuid,
    pub completion_id: Uuid,
    pub created_at: DateTime<Utc>,
}
