//! Database seeder for Plately development and testing.
//!
//! Seeds a test congregation, two counter identities, a few members, and an
//! open batch so the attestation flow can be exercised immediately.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use plately_db::entities::{
    batches, congregations, donations, members,
    sea_orm_active_enums::{BatchStatus, DonationType},
    users,
};

/// Test congregation ID (consistent for all seeds)
const TEST_CONGREGATION_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Primary counter user ID
const TEST_COUNTER_ID: &str = "00000000-0000-0000-0000-000000000002";
/// Secondary (verified) counter user ID
const TEST_VERIFIER_ID: &str = "00000000-0000-0000-0000-000000000003";
/// Seeded open batch ID
const TEST_BATCH_ID: &str = "00000000-0000-0000-0000-000000000010";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = plately_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding test congregation...");
    seed_congregation(&db).await;

    println!("Seeding counter users...");
    seed_users(&db).await;

    println!("Seeding members...");
    seed_members(&db).await;

    println!("Seeding open batch with donations...");
    seed_batch(&db).await;

    println!("Seeding complete!");
}

fn test_congregation_id() -> Uuid {
    Uuid::parse_str(TEST_CONGREGATION_ID).unwrap()
}

fn test_counter_id() -> Uuid {
    Uuid::parse_str(TEST_COUNTER_ID).unwrap()
}

fn test_batch_id() -> Uuid {
    Uuid::parse_str(TEST_BATCH_ID).unwrap()
}

async fn seed_congregation(db: &DatabaseConnection) {
    if congregations::Entity::find_by_id(test_congregation_id())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Test congregation already exists, skipping...");
        return;
    }

    let now = Utc::now().into();
    congregations::ActiveModel {
        id: Set(test_congregation_id()),
        name: Set("First Church of Plately".to_string()),
        report_recipients: Set(Some(
            "treasurer@plately.dev, pastor@plately.dev".to_string(),
        )),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to seed congregation");
}

async fn seed_users(db: &DatabaseConnection) {
    let seeds = [
        (
            TEST_COUNTER_ID,
            "Alice Counter",
            "alice@plately.dev",
            "dev-token-alice",
            true,
        ),
        (
            TEST_VERIFIER_ID,
            "Carol Verifier",
            "carol@plately.dev",
            "dev-token-carol",
            true,
        ),
    ];

    let now = Utc::now().into();
    for (id, name, email, token, verified) in seeds {
        let user_id = Uuid::parse_str(id).unwrap();
        if users::Entity::find_by_id(user_id)
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            println!("  User {name} already exists, skipping...");
            continue;
        }
        users::ActiveModel {
            id: Set(user_id),
            congregation_id: Set(test_congregation_id()),
            display_name: Set(name.to_string()),
            email: Set(email.to_string()),
            api_token: Set(token.to_string()),
            verified: Set(verified),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to seed user");
    }
}

async fn seed_members(db: &DatabaseConnection) {
    let now = Utc::now().into();
    for (offset, name) in ["Jane Doe", "Bob Smith", "Maria Garcia"].iter().enumerate() {
        let member_id = Uuid::parse_str(&format!("00000000-0000-0000-0000-00000000002{offset}"))
            .expect("valid uuid literal");
        if members::Entity::find_by_id(member_id)
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let envelope = Some(offset as i32 + 101);
        members::ActiveModel {
            id: Set(member_id),
            congregation_id: Set(test_congregation_id()),
            display_name: Set((*name).to_string()),
            envelope_number: Set(envelope),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to seed member");
    }
}

async fn seed_batch(db: &DatabaseConnection) {
    if batches::Entity::find_by_id(test_batch_id())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Test batch already exists, skipping...");
        return;
    }

    let now = Utc::now();
    let today = now.date_naive();
    batches::ActiveModel {
        id: Set(test_batch_id()),
        congregation_id: Set(test_congregation_id()),
        service_name: Set("Sunday Morning".to_string()),
        service_date: Set(today),
        notes: Set(None),
        status: Set(BatchStatus::Open),
        total_amount: Set(Decimal::new(24500, 2)),
        primary_attestor_id: Set(None),
        primary_attestor_name: Set(None),
        primary_attested_at: Set(None),
        secondary_attestor_id: Set(None),
        secondary_attestor_name: Set(None),
        secondary_attested_at: Set(None),
        attestation_confirmed_at: Set(None),
        created_by: Set(test_counter_id()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .expect("Failed to seed batch");

    let lines = [
        (DonationType::Cash, Decimal::new(5000, 2), None),
        (DonationType::Cash, Decimal::new(7500, 2), None),
        (DonationType::Check, Decimal::new(12000, 2), Some("1041")),
    ];
    for (donation_type, amount, check_number) in lines {
        donations::ActiveModel {
            id: Set(Uuid::new_v4()),
            congregation_id: Set(test_congregation_id()),
            batch_id: Set(Some(test_batch_id())),
            member_id: Set(None),
            donation_date: Set(today),
            donation_type: Set(donation_type),
            amount: Set(amount),
            check_number: Set(check_number.map(String::from)),
            notes: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await
        .expect("Failed to seed donation");
    }
}
