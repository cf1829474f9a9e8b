//! Demo data seeder for Chatline
//!
//! Populates the database with a handful of support conversations so the
//! REST and live-view surfaces have something to show in a fresh
//! environment.
//!
//! Usage:
//!   cargo run --bin seed-demo
//!
//! Requires DATABASE_URL. Existing rows are left untouched; the seeded ids
//! are random, so the command can be run repeatedly.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use chatline_events::store;

struct SeedMessage {
    direction: &'static str,
    content: &'static str,
    minutes_after_open: i64,
}

struct SeedConversation {
    closed: bool,
    hours_ago: i64,
    messages: &'static [SeedMessage],
}

const CONVERSATIONS: &[SeedConversation] = &[
    SeedConversation {
        closed: true,
        hours_ago: 48,
        messages: &[
            SeedMessage {
                direction: "RECEIVED",
                content: "Hi! I'd like to know about your membership plans.",
                minutes_after_open: 0,
            },
            SeedMessage {
                direction: "SENT",
                content: "Hello! We have three plans: Basic, Premium and VIP.",
                minutes_after_open: 2,
            },
            SeedMessage {
                direction: "RECEIVED",
                content: "What does the VIP plan include?",
                minutes_after_open: 5,
            },
            SeedMessage {
                direction: "SENT",
                content: "VIP includes eight personal-trainer sessions a month plus a full fitness assessment.",
                minutes_after_open: 8,
            },
            SeedMessage {
                direction: "RECEIVED",
                content: "Great, I'll think it over. Thanks!",
                minutes_after_open: 12,
            },
        ],
    },
    SeedConversation {
        closed: false,
        hours_ago: 20,
        messages: &[
            SeedMessage {
                direction: "RECEIVED",
                content: "Good morning! What are your opening hours?",
                minutes_after_open: 0,
            },
            SeedMessage {
                direction: "SENT",
                content: "Good morning! Weekdays 5am-11pm, Saturdays 7am-8pm, Sundays 8am-6pm.",
                minutes_after_open: 3,
            },
            SeedMessage {
                direction: "RECEIVED",
                content: "Do the group classes need booking?",
                minutes_after_open: 7,
            },
            SeedMessage {
                direction: "SENT",
                content: "Spinning and pilates need booking through the app; zumba and yoga are first come, first served.",
                minutes_after_open: 10,
            },
        ],
    },
    SeedConversation {
        closed: false,
        hours_ago: 4,
        messages: &[
            SeedMessage {
                direction: "RECEIVED",
                content: "Hey, is the pool open during the renovation?",
                minutes_after_open: 0,
            },
            SeedMessage {
                direction: "SENT",
                content: "The pool stays open; only the sauna area is closed until next month.",
                minutes_after_open: 4,
            },
        ],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let pool = chatline_shared::create_pool(&database_url, 3).await?;
    chatline_shared::run_migrations(&pool).await?;

    println!("Seeding demo conversations...");

    let now = OffsetDateTime::now_utc();
    for seed in CONVERSATIONS {
        let conversation_id = Uuid::new_v4();
        let opened_at = now - Duration::hours(seed.hours_ago);

        let mut tx = pool.begin().await?;
        store::create_conversation(&mut *tx, conversation_id, opened_at).await?;

        let mut last_message_at = opened_at;
        for message in seed.messages {
            let timestamp = opened_at + Duration::minutes(message.minutes_after_open);
            store::insert_message(
                &mut *tx,
                Uuid::new_v4(),
                conversation_id,
                message.direction,
                message.content,
                timestamp,
            )
            .await?;
            last_message_at = timestamp;
        }
        store::touch_last_message(&mut *tx, conversation_id, last_message_at).await?;

        if seed.closed {
            store::close_conversation(&mut *tx, conversation_id).await?;
        }
        tx.commit().await?;

        println!(
            "  {} ({} messages{})",
            conversation_id,
            seed.messages.len(),
            if seed.closed { ", closed" } else { "" }
        );
    }

    println!("Done.");
    Ok(())
}
