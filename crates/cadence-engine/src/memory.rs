//! In-memory [`Repository`] backing. Used by the engine's own tests and as
//! a demo store; every map lives behind one mutex, so check-then-act
//! sequences like the completion toggle are atomic by construction.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use cadence_types::{
    Completion, FollowEdge, Habit, HabitUpdate, NewCompletion, NewHabit, NewUser, SupportMark,
    User,
};

use crate::repo::Repository;

#[derive(Default)]
struct Inner {
    // Credentials are a durable-store concern; this backing keeps only the
    // public user shape.
    users: HashMap<Uuid, User>,
    habits: HashMap<Uuid, Habit>,
    completions: HashMap<Uuid, Completion>,
    follows: Vec<FollowEdge>,
    supports: HashMap<(Uuid, Uuid), SupportMark>,
}

#[derive(Default)]
pub struct MemoryRepo {
    inner: Mutex<Inner>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| anyhow!("store lock poisoned: {}", e))
    }
}

impl Repository for MemoryRepo {
    fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.username == user.username) {
            bail!("username already taken: {}", user.username);
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            created_at: Utc::now(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    fn create_habit(&self, habit: &NewHabit) -> Result<Habit> {
        let created = Habit {
            id: Uuid::new_v4(),
            owner_id: habit.owner_id,
            title: habit.title.clone(),
            description: habit.description.clone(),
            active: true,
            created_at: Utc::now(),
        };
        self.lock()?.habits.insert(created.id, created.clone());
        Ok(created)
    }

    fn habit_by_id(&self, id: Uuid) -> Result<Option<Habit>> {
        Ok(self.lock()?.habits.get(&id).cloned())
    }

    fn habits_by_owner(&self, owner_id: Uuid) -> Result<Vec<Habit>> {
        let mut habits: Vec<Habit> = self
            .lock()?
            .habits
            .values()
            .filter(|h| h.owner_id == owner_id)
            .cloned()
            .collect();
        habits.sort_by_key(|h| (h.created_at, h.id));
        Ok(habits)
    }

    fn update_habit(&self, id: Uuid, update: &HabitUpdate) -> Result<Option<Habit>> {
        let mut inner = self.lock()?;
        let Some(habit) = inner.habits.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &update.title {
            habit.title = title.clone();
        }
        if let Some(description) = &update.description {
            habit.description = description.clone();
        }
        if let Some(active) = update.active {
            habit.active = active;
        }
        Ok(Some(habit.clone()))
    }

    fn delete_habit(&self, id: Uuid) -> Result<()> {
        let mut inner = self.lock()?;
        inner.habits.remove(&id);

        let gone: Vec<Uuid> = inner
            .completions
            .values()
            .filter(|c| c.habit_id == id)
            .map(|c| c.id)
            .collect();
        for cid in &gone {
            inner.completions.remove(cid);
        }
        inner.supports.retain(|(_, cid), _| !gone.contains(cid));
        Ok(())
    }

    fn toggle_completion(&self, new: &NewCompletion) -> Result<Option<Completion>> {
        let mut inner = self.lock()?;
        let existing = inner
            .completions
            .values()
            .find(|c| c.habit_id == new.habit_id && c.date == new.date)
            .map(|c| c.id);

        match existing {
            Some(id) => {
                inner.completions.remove(&id);
                inner.supports.retain(|(_, cid), _| *cid != id);
                Ok(None)
            }
            None => {
                let completion = Completion {
                    id: Uuid::new_v4(),
                    habit_id: new.habit_id,
                    user_id: new.user_id,
                    date: new.date,
                    completed_at: Utc::now(),
                };
                inner.completions.insert(completion.id, completion.clone());
                Ok(Some(completion))
            }
        }
    }

    fn completion_by_id(&self, id: Uuid) -> Result<Option<Completion>> {
        Ok(self.lock()?.completions.get(&id).cloned())
    }

    fn completion_dates(&self, habit_id: Uuid) -> Result<BTreeSet<NaiveDate>> {
        Ok(self
            .lock()?
            .completions
            .values()
            .filter(|c| c.habit_id == habit_id)
            .map(|c| c.date)
            .collect())
    }

    fn completions_for_habit(&self, habit_id: Uuid) -> Result<Vec<Completion>> {
        let mut completions: Vec<Completion> = self
            .lock()?
            .completions
            .values()
            .filter(|c| c.habit_id == habit_id)
            .cloned()
            .collect();
        completions.sort_by_key(|c| c.date);
        Ok(completions)
    }

    fn completions_by_users(&self, user_ids: &[Uuid]) -> Result<Vec<Completion>> {
        Ok(self
            .lock()?
            .completions
            .values()
            .filter(|c| user_ids.contains(&c.user_id))
            .cloned()
            .collect())
    }

    fn user_active_dates(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>> {
        Ok(self
            .lock()?
            .completions
            .values()
            .filter(|c| c.user_id == user_id && c.date >= from && c.date <= to)
            .map(|c| c.date)
            .collect())
    }

    fn follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>> {
        Ok(self
            .lock()?
            .follows
            .iter()
            .find(|f| f.follower_id == follower_id && f.following_id == following_id)
            .cloned())
    }

    fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<FollowEdge> {
        let mut inner = self.lock()?;
        if inner
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
        {
            bail!("follow edge already exists");
        }
        let edge = FollowEdge {
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        inner.follows.push(edge.clone());
        Ok(edge)
    }

    fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.follows.len();
        inner
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(inner.follows.len() != before)
    }

    fn following_of(&self, user_id: Uuid) -> Result<Vec<User>> {
        let inner = self.lock()?;
        Ok(inner
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .filter_map(|f| inner.users.get(&f.following_id))
            .cloned()
            .collect())
    }

    fn followers_of(&self, user_id: Uuid) -> Result<Vec<User>> {
        let inner = self.lock()?;
        Ok(inner
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .filter_map(|f| inner.users.get(&f.follower_id))
            .cloned()
            .collect())
    }

    fn insert_support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<SupportMark> {
        let mut inner = self.lock()?;
        let key = (from_user_id, completion_id);
        if inner.supports.contains_key(&key) {
            bail!("support mark already exists");
        }
        let mark = SupportMark {
            from_user_id,
            completion_id,
            created_at: Utc::now(),
        };
        inner.supports.insert(key, mark.clone());
        Ok(mark)
    }

    fn delete_support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .supports
            .remove(&(from_user_id, completion_id))
            .is_some())
    }

    fn support_exists(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .supports
            .contains_key(&(from_user_id, completion_id)))
    }

    fn supports_from(
        &self,
        from_user_id: Uuid,
        completion_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        let inner = self.lock()?;
        Ok(completion_ids
            .iter()
            .copied()
            .filter(|cid| inner.supports.contains_key(&(from_user_id, *cid)))
            .collect())
    }
}
