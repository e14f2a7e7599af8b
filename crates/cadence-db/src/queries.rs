use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use cadence_engine::Repository;
use cadence_types::{
    Completion, FollowEdge, Habit, HabitUpdate, NewCompletion, NewHabit, NewUser, SupportMark,
    User,
};

use crate::Database;
use crate::models::{CompletionRow, FollowRow, HabitRow, UserRow, parse_timestamp};

impl Repository for Database {
    // -- Users --

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, display_name, avatar, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    user.username,
                    user.password_hash,
                    user.display_name,
                    user.avatar,
                    now
                ],
            )?;
            Ok(User {
                id,
                username: user.username.clone(),
                display_name: user.display_name.clone(),
                avatar: user.avatar.clone(),
                created_at: parse_timestamp(&now)?,
            })
        })
    }

    fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "WHERE id = ?1", &id.to_string())?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "WHERE username = ?1", username)?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, display_name, avatar, created_at
                 FROM users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    // -- Habits --

    fn create_habit(&self, habit: &NewHabit) -> Result<Habit> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO habits (id, owner_id, title, description, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                rusqlite::params![
                    id.to_string(),
                    habit.owner_id.to_string(),
                    habit.title,
                    habit.description,
                    now
                ],
            )?;
            Ok(Habit {
                id,
                owner_id: habit.owner_id,
                title: habit.title.clone(),
                description: habit.description.clone(),
                active: true,
                created_at: parse_timestamp(&now)?,
            })
        })
    }

    fn habit_by_id(&self, id: Uuid) -> Result<Option<Habit>> {
        self.with_conn(|conn| {
            query_habit(conn, id)?.map(HabitRow::into_habit).transpose()
        })
    }

    fn habits_by_owner(&self, owner_id: Uuid) -> Result<Vec<Habit>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, description, active, created_at
                 FROM habits WHERE owner_id = ?1 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([owner_id.to_string()], habit_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(HabitRow::into_habit).collect()
        })
    }

    fn update_habit(&self, id: Uuid, update: &HabitUpdate) -> Result<Option<Habit>> {
        self.with_conn(|conn| {
            let Some(row) = query_habit(conn, id)? else {
                return Ok(None);
            };
            let mut habit = row.into_habit()?;
            if let Some(title) = &update.title {
                habit.title = title.clone();
            }
            if let Some(description) = &update.description {
                habit.description = description.clone();
            }
            if let Some(active) = update.active {
                habit.active = active;
            }
            conn.execute(
                "UPDATE habits SET title = ?2, description = ?3, active = ?4 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    habit.title,
                    habit.description,
                    habit.active
                ],
            )?;
            Ok(Some(habit))
        })
    }

    fn delete_habit(&self, id: Uuid) -> Result<()> {
        // Completions (and their support marks) go with it via FK cascades.
        self.with_conn(|conn| {
            conn.execute("DELETE FROM habits WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Completions --

    fn toggle_completion(&self, new: &NewCompletion) -> Result<Option<Completion>> {
        // Check and act under one connection lock; UNIQUE(habit_id, date)
        // backstops concurrent writers from other processes.
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM completions WHERE habit_id = ?1 AND date = ?2",
                    rusqlite::params![new.habit_id.to_string(), new.date.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM completions WHERE id = ?1", [&existing_id])?;
                Ok(None)
            } else {
                let id = Uuid::new_v4();
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO completions (id, habit_id, user_id, date, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        id.to_string(),
                        new.habit_id.to_string(),
                        new.user_id.to_string(),
                        new.date.to_string(),
                        now
                    ],
                )?;
                Ok(Some(Completion {
                    id,
                    habit_id: new.habit_id,
                    user_id: new.user_id,
                    date: new.date,
                    completed_at: parse_timestamp(&now)?,
                }))
            }
        })
    }

    fn completion_by_id(&self, id: Uuid) -> Result<Option<Completion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, habit_id, user_id, date, completed_at
                 FROM completions WHERE id = ?1",
            )?;
            stmt.query_row([id.to_string()], completion_row)
                .optional()?
                .map(CompletionRow::into_completion)
                .transpose()
        })
    }

    fn completion_dates(&self, habit_id: Uuid) -> Result<BTreeSet<NaiveDate>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT date FROM completions WHERE habit_id = ?1")?;
            let dates = stmt
                .query_map([habit_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            dates.iter().map(|d| crate::models::parse_date(d)).collect()
        })
    }

    fn completions_for_habit(&self, habit_id: Uuid) -> Result<Vec<Completion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, habit_id, user_id, date, completed_at
                 FROM completions WHERE habit_id = ?1 ORDER BY date",
            )?;
            let rows = stmt
                .query_map([habit_id.to_string()], completion_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(CompletionRow::into_completion).collect()
        })
    }

    fn completions_by_users(&self, user_ids: &[Uuid]) -> Result<Vec<Completion>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, habit_id, user_id, date, completed_at
                 FROM completions WHERE user_id IN ({})",
                placeholders.join(", ")
            );

            let ids: Vec<String> = user_ids.iter().map(Uuid::to_string).collect();
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), completion_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(CompletionRow::into_completion).collect()
        })
    }

    fn user_active_dates(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT date FROM completions
                 WHERE user_id = ?1 AND date >= ?2 AND date <= ?3",
            )?;
            let dates = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), from.to_string(), to.to_string()],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            dates.iter().map(|d| crate::models::parse_date(d)).collect()
        })
    }

    // -- Follow edges --

    fn follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<FollowEdge>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT follower_id, following_id, created_at
                 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            )?;
            stmt.query_row(
                rusqlite::params![follower_id.to_string(), following_id.to_string()],
                |row| {
                    Ok(FollowRow {
                        follower_id: row.get(0)?,
                        following_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?
            .map(FollowRow::into_edge)
            .transpose()
        })
    }

    fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<FollowEdge> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, following_id, created_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![follower_id.to_string(), following_id.to_string(), now],
            )?;
            Ok(FollowEdge {
                follower_id,
                following_id,
                created_at: parse_timestamp(&now)?,
            })
        })
    }

    fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                rusqlite::params![follower_id.to_string(), following_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    fn following_of(&self, user_id: Uuid) -> Result<Vec<User>> {
        self.with_conn(|conn| query_edge_users(conn, user_id, EdgeSide::Following))
    }

    fn followers_of(&self, user_id: Uuid) -> Result<Vec<User>> {
        self.with_conn(|conn| query_edge_users(conn, user_id, EdgeSide::Followers))
    }

    // -- Support marks --

    fn insert_support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<SupportMark> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO supports (from_user_id, completion_id, created_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![from_user_id.to_string(), completion_id.to_string(), now],
            )?;
            Ok(SupportMark {
                from_user_id,
                completion_id,
                created_at: parse_timestamp(&now)?,
            })
        })
    }

    fn delete_support(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM supports WHERE from_user_id = ?1 AND completion_id = ?2",
                rusqlite::params![from_user_id.to_string(), completion_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    fn support_exists(&self, from_user_id: Uuid, completion_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM supports WHERE from_user_id = ?1 AND completion_id = ?2",
                    rusqlite::params![from_user_id.to_string(), completion_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn supports_from(
        &self,
        from_user_id: Uuid,
        completion_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        if completion_ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..=completion_ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT completion_id FROM supports
                 WHERE from_user_id = ?1 AND completion_id IN ({})",
                placeholders.join(", ")
            );

            let from = from_user_id.to_string();
            let ids: Vec<String> = completion_ids.iter().map(Uuid::to_string).collect();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&from];
            params.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            found.iter().map(|id| crate::models::parse_id(id)).collect()
        })
    }
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        avatar: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn habit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok(HabitRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn completion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompletionRow> {
    Ok(CompletionRow {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        user_id: row.get(2)?,
        date: row.get(3)?,
        completed_at: row.get(4)?,
    })
}

fn query_user(conn: &Connection, filter: &str, param: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, display_name, avatar, created_at FROM users {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row([param], user_row).optional()?)
}

fn query_habit(conn: &Connection, id: Uuid) -> Result<Option<HabitRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, title, description, active, created_at
         FROM habits WHERE id = ?1",
    )?;
    Ok(stmt.query_row([id.to_string()], habit_row).optional()?)
}

enum EdgeSide {
    Following,
    Followers,
}

/// JOIN follows to users so one query yields the already-stripped user set.
fn query_edge_users(conn: &Connection, user_id: Uuid, side: EdgeSide) -> Result<Vec<User>> {
    let sql = match side {
        EdgeSide::Following => {
            "SELECT u.id, u.username, u.display_name, u.avatar, u.created_at
             FROM follows f
             JOIN users u ON u.id = f.following_id
             WHERE f.follower_id = ?1
             ORDER BY f.created_at"
        }
        EdgeSide::Followers => {
            "SELECT u.id, u.username, u.display_name, u.avatar, u.created_at
             FROM follows f
             JOIN users u ON u.id = f.follower_id
             WHERE f.following_id = ?1
             ORDER BY f.created_at"
        }
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id.to_string()], user_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(UserRow::into_user).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
