//! Activity feed assembly. The tracker prefetches every lookup the feed
//! needs (actors, habits, streaks, the viewer's support marks) and this
//! module does the pure part: enrich, drop unresolvable items, rank,
//! truncate.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cadence_types::{Completion, FeedItem, Habit, User};

pub const DEFAULT_LIMIT: usize = 10;

/// Builds the ranked feed from prefetched lookups. A completion whose habit
/// or actor is missing from the maps reflects a deletion that raced the
/// build; the item is dropped silently rather than failing the whole feed.
pub fn assemble(
    completions: Vec<Completion>,
    users: &HashMap<Uuid, User>,
    habits: &HashMap<Uuid, Habit>,
    streaks: &HashMap<Uuid, u32>,
    supported: &HashSet<Uuid>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = completions
        .into_iter()
        .filter_map(|completion| {
            let user = users.get(&completion.user_id)?;
            let habit = habits.get(&completion.habit_id)?;
            Some(FeedItem {
                id: completion.id,
                user: user.clone(),
                habit: habit.clone(),
                date: completion.date,
                completed_at: completion.completed_at,
                streak: streaks.get(&completion.habit_id).copied().unwrap_or(0),
                supported: supported.contains(&completion.id),
                age: relative_age(completion.completed_at, now),
            })
        })
        .collect();

    // Newest first; id breaks ties so paging is deterministic.
    items.sort_by_key(|item| (Reverse(item.completed_at), item.id));
    items.truncate(limit);
    items
}

/// Human label for how long ago an instant was: "just now" under a minute,
/// then whole minutes, hours, days (floor division, no rounding up).
pub fn relative_age(completed_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - completed_at).num_seconds().max(0);
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn user(id: Uuid) -> User {
        User {
            id,
            username: format!("u-{id}"),
            display_name: "Someone".into(),
            avatar: None,
            created_at: at(0),
        }
    }

    fn habit(id: Uuid, owner_id: Uuid) -> Habit {
        Habit {
            id,
            owner_id,
            title: "Stretch".into(),
            description: None,
            active: true,
            created_at: at(0),
        }
    }

    fn completion(id: Uuid, habit_id: Uuid, user_id: Uuid, when: DateTime<Utc>) -> Completion {
        Completion {
            id,
            habit_id,
            user_id,
            date: when.date_naive(),
            completed_at: when,
        }
    }

    #[test]
    fn age_label_thresholds() {
        let now = at(0);
        assert_eq!(relative_age(at(-59), now), "just now");
        assert_eq!(relative_age(at(-60), now), "1m ago");
        assert_eq!(relative_age(at(-3599), now), "59m ago");
        assert_eq!(relative_age(at(-3600), now), "1h ago");
        assert_eq!(relative_age(at(-86_399), now), "23h ago");
        assert_eq!(relative_age(at(-86_400), now), "1d ago");
        assert_eq!(relative_age(at(-200_000), now), "2d ago");
        // Clock skew: a completion "from the future" reads as fresh.
        assert_eq!(relative_age(at(30), now), "just now");
    }

    #[test]
    fn items_sort_newest_first_with_id_tiebreak() {
        let uid = Uuid::new_v4();
        let hid = Uuid::new_v4();
        let users = HashMap::from([(uid, user(uid))]);
        let habits = HashMap::from([(hid, habit(hid, uid))]);

        let old = completion(Uuid::new_v4(), hid, uid, at(-100));
        let mut tied: Vec<Completion> = (0..2)
            .map(|_| completion(Uuid::new_v4(), hid, uid, at(-10)))
            .collect();
        tied.sort_by_key(|c| c.id);
        let completions = vec![old.clone(), tied[1].clone(), tied[0].clone()];

        let items = assemble(
            completions,
            &users,
            &habits,
            &HashMap::new(),
            &HashSet::new(),
            at(0),
            DEFAULT_LIMIT,
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, tied[0].id);
        assert_eq!(items[1].id, tied[1].id);
        assert_eq!(items[2].id, old.id);
    }

    #[test]
    fn unresolvable_items_are_dropped_not_errors() {
        let uid = Uuid::new_v4();
        let hid = Uuid::new_v4();
        let users = HashMap::from([(uid, user(uid))]);
        let habits = HashMap::from([(hid, habit(hid, uid))]);

        let ok = completion(Uuid::new_v4(), hid, uid, at(-5));
        let gone_habit = completion(Uuid::new_v4(), Uuid::new_v4(), uid, at(-1));
        let gone_user = completion(Uuid::new_v4(), hid, Uuid::new_v4(), at(-2));

        let items = assemble(
            vec![ok.clone(), gone_habit, gone_user],
            &users,
            &habits,
            &HashMap::new(),
            &HashSet::new(),
            at(0),
            DEFAULT_LIMIT,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, ok.id);
    }

    #[test]
    fn feed_truncates_and_carries_streak_and_support() {
        let uid = Uuid::new_v4();
        let hid = Uuid::new_v4();
        let users = HashMap::from([(uid, user(uid))]);
        let habits = HashMap::from([(hid, habit(hid, uid))]);
        let streaks = HashMap::from([(hid, 7u32)]);

        let completions: Vec<Completion> = (0..5)
            .map(|i| completion(Uuid::new_v4(), hid, uid, at(-i)))
            .collect();
        let supported = HashSet::from([completions[0].id]);

        let items = assemble(completions.clone(), &users, &habits, &streaks, &supported, at(0), 3);
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.streak == 7));
        // completions[0] is the newest item, and the only supported one.
        assert!(items[0].supported);
        assert!(!items[1].supported);
    }
}
