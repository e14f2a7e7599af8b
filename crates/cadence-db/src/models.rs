//! Database row types and their conversions into the shared domain models.
//! Rows hold raw TEXT columns; parsing failures are surfaced as storage
//! errors rather than silently defaulted. The password column is never
//! selected — user rows come out of the store already credential-free.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use cadence_types::{Completion, FollowEdge, Habit, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            username: self.username,
            display_name: self.display_name,
            avatar: self.avatar,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct HabitRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: String,
}

impl HabitRow {
    pub fn into_habit(self) -> Result<Habit> {
        Ok(Habit {
            id: parse_id(&self.id)?,
            owner_id: parse_id(&self.owner_id)?,
            title: self.title,
            description: self.description,
            active: self.active,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct CompletionRow {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub date: String,
    pub completed_at: String,
}

impl CompletionRow {
    pub fn into_completion(self) -> Result<Completion> {
        Ok(Completion {
            id: parse_id(&self.id)?,
            habit_id: parse_id(&self.habit_id)?,
            user_id: parse_id(&self.user_id)?,
            date: parse_date(&self.date)?,
            completed_at: parse_timestamp(&self.completed_at)?,
        })
    }
}

pub struct FollowRow {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

impl FollowRow {
    pub fn into_edge(self) -> Result<FollowEdge> {
        Ok(FollowEdge {
            follower_id: parse_id(&self.follower_id)?,
            following_id: parse_id(&self.following_id)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub(crate) fn parse_id(s: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("corrupt id '{s}'"))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse().with_context(|| format!("corrupt date '{s}'"))
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    // We write RFC 3339; the naive form covers rows seeded with SQLite's
    // own datetime('now').
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{s}'"))
}
