use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use cadence_types::{
    Completion, FollowEdge, Habit, HabitUpdate, NewCompletion, NewHabit, NewUser, SupportMark,
    User,
};

/// Narrow storage contract the engine is written against. Backings are
/// swappable: [`crate::MemoryRepo`] for tests and demos, the SQLite
/// repository in `cadence-db` for durable deployments.
///
/// Identifier generation and uniqueness are the store's responsibility: at
/// most one completion per (habit, date), at most one follow edge per
/// (follower, following) pair, at most one support mark per
/// (user, completion) pair — all guaranteed under concurrent writers.
pub trait Repository: Send + Sync {
    // -- Users --

    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;

    // -- Habits --

    fn create_habit(&self, habit: &NewHabit) -> Result<Habit>;
    fn habit_by_id(&self, id: Uuid) -> Result<Option<Habit>>;
    fn habits_by_owner(&self, owner_id: Uuid) -> Result<Vec<Habit>>;
    fn update_habit(&self, id: Uuid, update: &HabitUpdate) -> Result<Option<Habit>>;
    /// Deletes the habit and cascades to its completions (and their support
    /// marks). Deleting a missing habit is a no-op.
    fn delete_habit(&self, id: Uuid) -> Result<()>;

    // -- Completions --

    /// Atomic idempotent toggle for one (habit, date): inserts a completion
    /// if none exists, removes the existing one otherwise. Returns the new
    /// state — `Some(completion)` when the day is now completed, `None` when
    /// it is now clear. The check-and-act pair must not interleave with a
    /// concurrent toggle for the same key.
    fn toggle_completion(&self, new: &NewCompletion) -> Result<Option<Completion>>;
    fn completion_by_id(&self, id: Uuid) -> Result<Option<Completion>>;
    /// Deduplicated set of calendar dates this habit was completed on.
    fn completion_dates(&self, habit_id: Uuid) -> Result<BTreeSet<NaiveDate>>;
    fn completions_for_habit(&self, habit_id: Uuid) -> Result<Vec<Completion>>;
    /// All completions authored by any of the given users, for feed builds.
    fn completions_by_users(&self, user_ids: &[Uuid]) -> Result<Vec<Completion>>;
    /// Distinct dates in `[from, to]` on which the user completed at least
    /// one habit.
    fn user_active_dates(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>>;

    // -- Follow edges --

    fn follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>>;
    fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<FollowEdge>;
    /// Returns whether an edge was actually removed.
    fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;
    fn following_of(&self, user_id: Uuid) -> Result<Vec<User>>;
    fn followers_of(&self, user_id: Uuid) -> Result<Vec<User>>;

    // -- Support marks --

    fn insert_support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<SupportMark>;
    fn delete_support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<bool>;
    fn support_exists(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<bool>;
    /// Which of the given completions the user has supported. Batch form so
    /// feed assembly touches the store once, not once per item.
    fn supports_from(
        &self,
        from_user_id: Uuid,
        completion_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>>;
}
