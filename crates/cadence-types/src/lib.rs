pub mod models;
pub mod views;

pub use models::{
    Completion, FollowEdge, Habit, HabitUpdate, NewCompletion, NewHabit, NewUser, SupportMark,
    User,
};
pub use views::{FeedItem, HabitDetail, HabitStatus, MonthlyRate, ToggleOutcome, UserStats};
