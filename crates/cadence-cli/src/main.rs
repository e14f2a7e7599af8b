//! Cadence CLI — a thin caller over the habit engine. Every subcommand
//! resolves usernames, invokes one `HabitTracker` operation, and prints the
//! result; no domain logic lives here.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use cadence_db::Database;
use cadence_engine::HabitTracker;
use cadence_types::{HabitUpdate, NewHabit, NewUser};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(version, about = "Habit tracking with streaks and a social feed")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user account
    Register {
        username: String,
        password: String,

        /// Name shown to other users (defaults to the username)
        #[arg(long)]
        display_name: Option<String>,

        /// Avatar URL
        #[arg(long)]
        avatar: Option<String>,
    },
    /// List other users to follow
    Users { username: String },
    /// Manage habits
    Habit {
        #[command(subcommand)]
        action: HabitAction,
    },
    /// Toggle a habit's completion for a day (defaults to today)
    Done {
        username: String,
        habit_id: Uuid,

        /// Calendar day, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show streak and completion-rate statistics
    Stats {
        username: String,

        /// Trailing window for the completion rate, in days
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Show the social activity feed
    Feed {
        username: String,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Follow another user
    Follow { username: String, target: String },
    /// Stop following another user
    Unfollow { username: String, target: String },
    /// List who a user follows
    Following { username: String },
    /// List a user's followers
    Followers { username: String },
    /// Support (like) a completion from the feed
    Support { username: String, completion_id: Uuid },
    /// Remove a support mark
    Unsupport { username: String, completion_id: Uuid },
}

#[derive(Subcommand)]
enum HabitAction {
    /// Create a habit
    Add {
        username: String,
        title: String,

        #[arg(long)]
        description: Option<String>,
    },
    /// List habits with today's status and streaks
    List { username: String },
    /// Show one habit with its full completion history
    Show { username: String, habit_id: Uuid },
    /// Update a habit's title, description, or paused state
    Edit {
        username: String,
        habit_id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(long, conflicts_with = "resume")]
        pause: bool,

        #[arg(long)]
        resume: bool,
    },
    /// Delete a habit and all of its completions
    Rm { username: String, habit_id: Uuid },
}

fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let db_path = std::env::var("CADENCE_DB_PATH").unwrap_or_else(|_| "cadence.db".into());
    let db = Database::open(&PathBuf::from(&db_path))?;
    let tracker = HabitTracker::new(db);

    run(&tracker, cli.command)
}

fn run(tracker: &HabitTracker<Database>, command: Commands) -> Result<()> {
    let today = Utc::now().date_naive();

    match command {
        Commands::Register {
            username,
            password,
            display_name,
            avatar,
        } => {
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| anyhow!("failed to hash password: {e}"))?
                .to_string();

            let user = tracker.create_user(NewUser {
                display_name: display_name.unwrap_or_else(|| username.clone()),
                username,
                password_hash,
                avatar,
            })?;
            println!("registered {} ({})", user.username, user.id);
        }
        Commands::Users { username } => {
            let viewer = tracker.user_by_username(&username)?;
            for user in tracker.discover_users(viewer.id)? {
                println!("{}  {}", user.username, user.display_name);
            }
        }
        Commands::Habit { action } => run_habit(tracker, action, today)?,
        Commands::Done {
            username,
            habit_id,
            date,
        } => {
            let user = tracker.user_by_username(&username)?;
            let date = date.unwrap_or(today);
            let outcome = tracker.toggle_completion(habit_id, user.id, date)?;
            let state = if outcome.completed { "completed" } else { "cleared" };
            println!("{date}: {state}, streak {}", outcome.streak);
        }
        Commands::Stats { username, days } => {
            let user = tracker.user_by_username(&username)?;
            let stats = tracker.user_stats(user.id, today)?;
            let trailing = tracker.completion_rate(user.id, days, today)?;
            println!("current streak    {}", stats.current_streak);
            println!(
                "today             {}/{} ({:.0}%)",
                stats.today_completed, stats.today_total, stats.today_completion_rate
            );
            println!(
                "this month        {}/{} days ({:.0}%)",
                stats.monthly_completed_days, stats.monthly_total_days,
                stats.monthly_completion_rate
            );
            println!("last {days} days      {trailing:.0}%");
        }
        Commands::Feed { username, limit } => {
            let user = tracker.user_by_username(&username)?;
            let items = tracker.activity_feed(user.id, limit, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Commands::Follow { username, target } => {
            let follower = tracker.user_by_username(&username)?;
            let following = tracker.user_by_username(&target)?;
            tracker.follow(follower.id, following.id)?;
            println!("{username} now follows {target}");
        }
        Commands::Unfollow { username, target } => {
            let follower = tracker.user_by_username(&username)?;
            let following = tracker.user_by_username(&target)?;
            tracker.unfollow(follower.id, following.id)?;
            println!("{username} no longer follows {target}");
        }
        Commands::Following { username } => {
            let user = tracker.user_by_username(&username)?;
            for other in tracker.following(user.id)? {
                println!("{}  {}", other.username, other.display_name);
            }
        }
        Commands::Followers { username } => {
            let user = tracker.user_by_username(&username)?;
            for other in tracker.followers(user.id)? {
                println!("{}  {}", other.username, other.display_name);
            }
        }
        Commands::Support {
            username,
            completion_id,
        } => {
            let user = tracker.user_by_username(&username)?;
            tracker.support(user.id, completion_id)?;
            println!("supported {completion_id}");
        }
        Commands::Unsupport {
            username,
            completion_id,
        } => {
            let user = tracker.user_by_username(&username)?;
            tracker.unsupport(user.id, completion_id)?;
            println!("removed support for {completion_id}");
        }
    }

    Ok(())
}

fn run_habit(tracker: &HabitTracker<Database>, action: HabitAction, today: NaiveDate) -> Result<()> {
    match action {
        HabitAction::Add {
            username,
            title,
            description,
        } => {
            let user = tracker.user_by_username(&username)?;
            let habit = tracker.create_habit(NewHabit {
                owner_id: user.id,
                title,
                description,
            })?;
            println!("added \"{}\" ({})", habit.title, habit.id);
        }
        HabitAction::List { username } => {
            let user = tracker.user_by_username(&username)?;
            for status in tracker.habits_with_status(user.id, today)? {
                let mark = if status.is_completed { "x" } else { " " };
                let paused = if status.habit.active { "" } else { "  (paused)" };
                println!(
                    "[{mark}] {}  streak {}  {}{paused}",
                    status.habit.title, status.streak, status.habit.id
                );
            }
        }
        HabitAction::Show { username, habit_id } => {
            let user = tracker.user_by_username(&username)?;
            let detail = tracker.habit_detail(habit_id, user.id, today)?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        HabitAction::Edit {
            username,
            habit_id,
            title,
            description,
            clear_description,
            pause,
            resume,
        } => {
            let user = tracker.user_by_username(&username)?;
            let update = HabitUpdate {
                title,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                active: match (pause, resume) {
                    (true, _) => Some(false),
                    (_, true) => Some(true),
                    _ => None,
                },
            };
            let habit = tracker.update_habit(habit_id, user.id, update)?;
            println!("updated \"{}\"", habit.title);
        }
        HabitAction::Rm { username, habit_id } => {
            let user = tracker.user_by_username(&username)?;
            tracker.delete_habit(habit_id, user.id)?;
            println!("deleted {habit_id}");
        }
    }

    Ok(())
}
