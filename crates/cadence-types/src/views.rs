use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Completion, Habit, User};

/// A habit annotated with today's state, for the owner's dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct HabitStatus {
    pub habit: Habit,
    pub is_completed: bool,
    pub streak: u32,
}

/// Result of toggling a completion: the new completed state for that day and
/// the habit's streak recomputed afterwards.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToggleOutcome {
    pub completed: bool,
    pub streak: u32,
}

/// A habit with its full completion history, for the detail view.
#[derive(Debug, Clone, Serialize)]
pub struct HabitDetail {
    pub habit: Habit,
    pub streak: u32,
    pub longest_streak: u32,
    pub completions: Vec<Completion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlyRate {
    pub rate: f64,
    pub completed_days: u32,
    pub total_days: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserStats {
    pub current_streak: u32,
    pub today_completion_rate: f64,
    pub today_completed: u32,
    pub today_total: u32,
    pub monthly_completion_rate: f64,
    pub monthly_completed_days: u32,
    pub monthly_total_days: u32,
}

/// A completion enriched for social display: who did what, how long their
/// run is, whether the viewer already supported it, and a relative age label.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub user: User,
    pub habit: Habit,
    pub date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub streak: u32,
    pub supported: bool,
    pub age: String,
}
