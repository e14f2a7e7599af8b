//! Repository-contract tests against a private in-memory SQLite database.

use chrono::NaiveDate;

use cadence_db::Database;
use cadence_engine::{HabitTracker, Repository};
use cadence_types::{NewCompletion, NewHabit, NewUser, User};

fn db() -> Database {
    Database::open_in_memory().unwrap()
}

fn user(db: &Database, username: &str) -> User {
    db.create_user(&NewUser {
        username: username.to_string(),
        password_hash: "hash".to_string(),
        display_name: username.to_string(),
        avatar: None,
    })
    .unwrap()
}

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn users_round_trip_without_credentials() {
    let db = db();
    let alice = user(&db, "alice");

    let by_id = db.user_by_id(alice.id).unwrap().unwrap();
    assert_eq!(by_id.username, "alice");

    let by_name = db.user_by_username("alice").unwrap().unwrap();
    assert_eq!(by_name.id, alice.id);

    assert!(db.user_by_username("nobody").unwrap().is_none());

    // Duplicate username trips the UNIQUE constraint.
    assert!(
        db.create_user(&NewUser {
            username: "alice".to_string(),
            password_hash: "other".to_string(),
            display_name: "Alice II".to_string(),
            avatar: None,
        })
        .is_err()
    );
}

#[test]
fn toggle_is_idempotent_per_day() {
    let db = db();
    let alice = user(&db, "alice");
    let habit = db
        .create_habit(&NewHabit {
            owner_id: alice.id,
            title: "Meditate".to_string(),
            description: None,
        })
        .unwrap();

    let key = NewCompletion {
        habit_id: habit.id,
        user_id: alice.id,
        date: d("2024-01-05"),
    };

    let first = db.toggle_completion(&key).unwrap();
    assert!(first.is_some());
    assert_eq!(db.completion_dates(habit.id).unwrap().len(), 1);

    let second = db.toggle_completion(&key).unwrap();
    assert!(second.is_none());
    assert!(db.completion_dates(habit.id).unwrap().is_empty());
}

#[test]
fn habit_delete_cascades_completions_and_supports() {
    let db = db();
    let alice = user(&db, "alice");
    let bob = user(&db, "bob");
    let habit = db
        .create_habit(&NewHabit {
            owner_id: alice.id,
            title: "Run".to_string(),
            description: None,
        })
        .unwrap();

    let completion = db
        .toggle_completion(&NewCompletion {
            habit_id: habit.id,
            user_id: alice.id,
            date: d("2024-01-05"),
        })
        .unwrap()
        .unwrap();
    db.insert_support(bob.id, completion.id).unwrap();

    db.delete_habit(habit.id).unwrap();

    assert!(db.habit_by_id(habit.id).unwrap().is_none());
    assert!(db.completion_by_id(completion.id).unwrap().is_none());
    assert!(!db.support_exists(bob.id, completion.id).unwrap());
}

#[test]
fn follow_edges_are_unique_pairs() {
    let db = db();
    let alice = user(&db, "alice");
    let bob = user(&db, "bob");

    db.insert_follow(alice.id, bob.id).unwrap();
    // Second insert trips the primary key.
    assert!(db.insert_follow(alice.id, bob.id).is_err());

    let following = db.following_of(alice.id).unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, bob.id);

    let followers = db.followers_of(bob.id).unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, alice.id);

    assert!(db.delete_follow(alice.id, bob.id).unwrap());
    assert!(!db.delete_follow(alice.id, bob.id).unwrap());
}

#[test]
fn active_dates_respect_the_range() {
    let db = db();
    let alice = user(&db, "alice");
    let h1 = db
        .create_habit(&NewHabit {
            owner_id: alice.id,
            title: "Read".to_string(),
            description: None,
        })
        .unwrap();
    let h2 = db
        .create_habit(&NewHabit {
            owner_id: alice.id,
            title: "Write".to_string(),
            description: None,
        })
        .unwrap();

    for (habit, day) in [
        (h1.id, "2023-12-31"),
        (h1.id, "2024-01-02"),
        (h2.id, "2024-01-02"),
        (h2.id, "2024-01-09"),
    ] {
        db.toggle_completion(&NewCompletion {
            habit_id: habit,
            user_id: alice.id,
            date: d(day),
        })
        .unwrap();
    }

    let active = db
        .user_active_dates(alice.id, d("2024-01-01"), d("2024-01-31"))
        .unwrap();
    // Both habits on Jan 2 collapse to one active day.
    assert_eq!(
        active.into_iter().collect::<Vec<_>>(),
        vec![d("2024-01-02"), d("2024-01-09")]
    );
}

#[test]
fn tracker_runs_on_the_sqlite_backing() {
    let t = HabitTracker::new(db());
    let alice = t.create_user(NewUser {
        username: "alice".to_string(),
        password_hash: "hash".to_string(),
        display_name: "Alice".to_string(),
        avatar: None,
    })
    .unwrap();

    let habit = t
        .create_habit(NewHabit {
            owner_id: alice.id,
            title: "Stretch".to_string(),
            description: None,
        })
        .unwrap();

    for day in ["2024-01-03", "2024-01-04", "2024-01-05"] {
        let outcome = t.toggle_completion(habit.id, alice.id, d(day)).unwrap();
        assert!(outcome.completed);
    }

    let detail = t.habit_detail(habit.id, alice.id, d("2024-01-05")).unwrap();
    assert_eq!(detail.streak, 3);
    assert_eq!(detail.longest_streak, 3);

    let stats = t.user_stats(alice.id, d("2024-01-05")).unwrap();
    assert_eq!(stats.current_streak, 3);
    assert_eq!(stats.monthly_completed_days, 3);
    assert_eq!(stats.monthly_total_days, 5);
}
