//! The engine's front door. Every operation recomputes derived values from
//! the live completion set — nothing is cached between calls, so there is no
//! stale state to invalidate. Ownership and validation failures surface as
//! [`Error`]; feed assembly swallows per-item lookup misses instead.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use cadence_types::{
    FeedItem, FollowEdge, Habit, HabitDetail, HabitStatus, HabitUpdate, NewCompletion, NewHabit,
    NewUser, SupportMark, ToggleOutcome, User, UserStats,
};

use crate::error::{Error, Result};
use crate::repo::Repository;
use crate::{feed, rates, streak};

pub struct HabitTracker<R: Repository> {
    repo: R,
}

impl<R: Repository> HabitTracker<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    // -- Users --

    pub fn create_user(&self, new: NewUser) -> Result<User> {
        if new.username.trim().is_empty() {
            return Err(Error::validation("username must not be empty"));
        }
        if self.repo.user_by_username(&new.username)?.is_some() {
            return Err(Error::Conflict("username"));
        }
        Ok(self.repo.create_user(&new)?)
    }

    pub fn user_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .user_by_username(username)?
            .ok_or(Error::NotFound("user"))
    }

    /// Everyone except the viewer, for the "find people to follow" screen.
    pub fn discover_users(&self, viewer_id: Uuid) -> Result<Vec<User>> {
        let users = self.repo.list_users()?;
        Ok(users.into_iter().filter(|u| u.id != viewer_id).collect())
    }

    // -- Habits --

    pub fn create_habit(&self, new: NewHabit) -> Result<Habit> {
        if new.title.trim().is_empty() {
            return Err(Error::validation("habit title must not be empty"));
        }
        if self.repo.user_by_id(new.owner_id)?.is_none() {
            return Err(Error::NotFound("user"));
        }
        Ok(self.repo.create_habit(&new)?)
    }

    pub fn update_habit(
        &self,
        habit_id: Uuid,
        actor_id: Uuid,
        update: HabitUpdate,
    ) -> Result<Habit> {
        self.owned_habit(habit_id, actor_id)?;
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(Error::validation("habit title must not be empty"));
            }
        }
        self.repo
            .update_habit(habit_id, &update)?
            .ok_or(Error::NotFound("habit"))
    }

    pub fn delete_habit(&self, habit_id: Uuid, actor_id: Uuid) -> Result<()> {
        self.owned_habit(habit_id, actor_id)?;
        Ok(self.repo.delete_habit(habit_id)?)
    }

    /// Owner-only detail view: the habit plus its full completion history
    /// and both streak figures.
    pub fn habit_detail(
        &self,
        habit_id: Uuid,
        actor_id: Uuid,
        today: NaiveDate,
    ) -> Result<HabitDetail> {
        let habit = self.owned_habit(habit_id, actor_id)?;
        let dates = self.repo.completion_dates(habit_id)?;
        Ok(HabitDetail {
            streak: streak::current_streak(&dates, today),
            longest_streak: streak::longest_streak(&dates),
            completions: self.repo.completions_for_habit(habit_id)?,
            habit,
        })
    }

    /// All of a user's habits annotated with today's completion state and
    /// the current streak, for the dashboard.
    pub fn habits_with_status(&self, user_id: Uuid, today: NaiveDate) -> Result<Vec<HabitStatus>> {
        let habits = self.repo.habits_by_owner(user_id)?;
        habits
            .into_iter()
            .map(|habit| {
                let dates = self.repo.completion_dates(habit.id)?;
                Ok(HabitStatus {
                    is_completed: dates.contains(&today),
                    streak: streak::current_streak(&dates, today),
                    habit,
                })
            })
            .collect()
    }

    // -- Completions --

    /// Idempotent completion toggle for one calendar day. The first call
    /// records the completion, a second call for the same day removes it —
    /// never a duplicate row. Returns the new state plus the streak
    /// recomputed as of `date`.
    pub fn toggle_completion(
        &self,
        habit_id: Uuid,
        actor_id: Uuid,
        date: NaiveDate,
    ) -> Result<ToggleOutcome> {
        self.owned_habit(habit_id, actor_id)?;

        let inserted = self.repo.toggle_completion(&NewCompletion {
            habit_id,
            user_id: actor_id,
            date,
        })?;

        let dates = self.repo.completion_dates(habit_id)?;
        let outcome = ToggleOutcome {
            completed: inserted.is_some(),
            streak: streak::current_streak(&dates, date),
        };
        debug!(%habit_id, %date, completed = outcome.completed, "toggled completion");
        Ok(outcome)
    }

    // -- Stats --

    pub fn user_stats(&self, user_id: Uuid, today: NaiveDate) -> Result<UserStats> {
        let habits = self.repo.habits_by_owner(user_id)?;
        let per_habit: Vec<BTreeSet<NaiveDate>> = habits
            .iter()
            .map(|h| self.repo.completion_dates(h.id))
            .collect::<anyhow::Result<_>>()?;

        let today_total = habits.len() as u32;
        let today_completed = per_habit.iter().filter(|d| d.contains(&today)).count() as u32;
        let today_completion_rate = if today_total == 0 {
            0.0
        } else {
            f64::from(today_completed) / f64::from(today_total) * 100.0
        };

        // A user's headline streak is their best per-habit streak.
        let current_streak = per_habit
            .iter()
            .map(|d| streak::current_streak(d, today))
            .max()
            .unwrap_or(0);

        let active = self
            .repo
            .user_active_dates(user_id, rates::month_start(today), today)?;
        let monthly = rates::monthly_rate(&active, habits.len(), today);

        Ok(UserStats {
            current_streak,
            today_completion_rate,
            today_completed,
            today_total,
            monthly_completion_rate: monthly.rate,
            monthly_completed_days: monthly.completed_days,
            monthly_total_days: monthly.total_days,
        })
    }

    /// Trailing-window completion rate over the `days` dates ending today.
    pub fn completion_rate(&self, user_id: Uuid, days: u32, today: NaiveDate) -> Result<f64> {
        let habits = self.repo.habits_by_owner(user_id)?;
        let per_habit: Vec<BTreeSet<NaiveDate>> = habits
            .iter()
            .map(|h| self.repo.completion_dates(h.id))
            .collect::<anyhow::Result<_>>()?;
        Ok(rates::trailing_rate(&per_habit, days, today))
    }

    // -- Activity feed --

    /// Recent completions across the users the viewer follows, plus the
    /// viewer's own, ranked newest first. Recomputed in full on every call;
    /// reads are a best-effort snapshot, so items whose habit or author was
    /// deleted mid-build are dropped rather than failing the feed.
    pub fn activity_feed(
        &self,
        viewer_id: Uuid,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<FeedItem>> {
        let mut author_ids: Vec<Uuid> =
            self.repo.following_of(viewer_id)?.into_iter().map(|u| u.id).collect();
        author_ids.push(viewer_id);

        let completions = self.repo.completions_by_users(&author_ids)?;
        let today = now.date_naive();

        let mut users: HashMap<Uuid, User> = HashMap::new();
        let mut habits: HashMap<Uuid, Habit> = HashMap::new();
        let mut streaks: HashMap<Uuid, u32> = HashMap::new();
        for completion in &completions {
            if !users.contains_key(&completion.user_id) {
                if let Some(user) = self.repo.user_by_id(completion.user_id)? {
                    users.insert(user.id, user);
                }
            }
            if !habits.contains_key(&completion.habit_id) {
                if let Some(habit) = self.repo.habit_by_id(completion.habit_id)? {
                    let dates = self.repo.completion_dates(habit.id)?;
                    streaks.insert(habit.id, streak::current_streak(&dates, today));
                    habits.insert(habit.id, habit);
                }
            }
        }

        let completion_ids: Vec<Uuid> = completions.iter().map(|c| c.id).collect();
        let supported = self.repo.supports_from(viewer_id, &completion_ids)?;

        let items = feed::assemble(
            completions,
            &users,
            &habits,
            &streaks,
            &supported,
            now,
            limit.unwrap_or(feed::DEFAULT_LIMIT),
        );
        debug!(%viewer_id, items = items.len(), "assembled activity feed");
        Ok(items)
    }

    // -- Social graph --

    pub fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<FollowEdge> {
        if follower_id == following_id {
            return Err(Error::validation("cannot follow yourself"));
        }
        if self.repo.user_by_id(following_id)?.is_none() {
            return Err(Error::NotFound("user"));
        }
        if self.repo.follow_edge(follower_id, following_id)?.is_some() {
            return Err(Error::Conflict("follow edge"));
        }
        Ok(self.repo.insert_follow(follower_id, following_id)?)
    }

    pub fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<()> {
        if self.repo.delete_follow(follower_id, following_id)? {
            Ok(())
        } else {
            Err(Error::NotFound("follow edge"))
        }
    }

    pub fn following(&self, user_id: Uuid) -> Result<Vec<User>> {
        Ok(self.repo.following_of(user_id)?)
    }

    pub fn followers(&self, user_id: Uuid) -> Result<Vec<User>> {
        Ok(self.repo.followers_of(user_id)?)
    }

    // -- Support marks --

    pub fn support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<SupportMark> {
        if self.repo.completion_by_id(completion_id)?.is_none() {
            return Err(Error::NotFound("completion"));
        }
        if self.repo.support_exists(from_user_id, completion_id)? {
            return Err(Error::Conflict("support mark"));
        }
        Ok(self.repo.insert_support(from_user_id, completion_id)?)
    }

    pub fn unsupport(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<()> {
        if self.repo.delete_support(from_user_id, completion_id)? {
            Ok(())
        } else {
            Err(Error::NotFound("support mark"))
        }
    }

    // -- Helpers --

    /// Fetches a habit and verifies the actor owns it.
    fn owned_habit(&self, habit_id: Uuid, actor_id: Uuid) -> Result<Habit> {
        let habit = self
            .repo
            .habit_by_id(habit_id)?
            .ok_or(Error::NotFound("habit"))?;
        if habit.owner_id != actor_id {
            return Err(Error::Forbidden);
        }
        Ok(habit)
    }
}
