//! Integration tests for donation ledger mutations.
//!
//! Covers total recomputation, the move operation, and the post-finalize
//! immutability guard. Requires a Postgres database; each test is skipped
//! when `DATABASE_URL` is not set.

use std::env;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use plately_core::ledger::{DonationType, LedgerError};
use plately_db::entities::{congregations, users};
use plately_db::migration::Migrator;
use plately_db::repositories::{
    AttestationRepository, BatchRepository, CreateBatchInput, CreateDonationInput, DonationError,
    DonationRepository, UpdateDonationInput,
};

async fn connect_or_skip() -> Option<DatabaseConnection> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };
    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    Some(db)
}

struct Fixture {
    congregation_id: Uuid,
    counter_id: Uuid,
    verifier_id: Uuid,
}

async fn seed_fixture(db: &DatabaseConnection) -> Fixture {
    let congregation_id = Uuid::new_v4();
    let now = chrono::Utc::now().into();
    congregations::ActiveModel {
        id: Set(congregation_id),
        name: Set(format!("Test Congregation {congregation_id}")),
        report_recipients: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to insert congregation");

    let mut ids = Vec::new();
    for _ in 0..2 {
        let id = Uuid::new_v4();
        users::ActiveModel {
            id: Set(id),
            congregation_id: Set(congregation_id),
            display_name: Set(format!("User {id}")),
            email: Set(format!("{id}@example.org")),
            api_token: Set(Uuid::new_v4().simple().to_string()),
            verified: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to insert user");
        ids.push(id);
    }

    Fixture {
        congregation_id,
        counter_id: ids[0],
        verifier_id: ids[1],
    }
}

async fn create_batch(db: &DatabaseConnection, fixture: &Fixture, name: &str) -> Uuid {
    BatchRepository::new(db.clone())
        .create(
            fixture.congregation_id,
            fixture.counter_id,
            CreateBatchInput {
                service_name: name.to_string(),
                service_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                notes: None,
            },
        )
        .await
        .expect("Failed to create batch")
        .id
}

fn cash(batch_id: Uuid, amount: rust_decimal::Decimal) -> CreateDonationInput {
    CreateDonationInput {
        batch_id: Some(batch_id),
        member_id: None,
        donation_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        donation_type: DonationType::Cash,
        amount,
        check_number: None,
        notes: None,
    }
}

async fn finalize(db: &DatabaseConnection, fixture: &Fixture, batch_id: Uuid) {
    let repo = AttestationRepository::new(db.clone());
    repo.attest_primary(fixture.congregation_id, batch_id, fixture.counter_id, "Alice")
        .await
        .expect("primary attestation should succeed");
    repo.attest_secondary(fixture.congregation_id, batch_id, fixture.verifier_id, true, "Carol")
        .await
        .expect("secondary attestation should succeed");
    repo.confirm_finalization(fixture.congregation_id, batch_id, fixture.verifier_id, "Carol")
        .await
        .expect("confirmation should succeed");
}

#[tokio::test]
async fn test_cached_total_tracks_mutations() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = create_batch(&db, &fixture, "Sunday Morning").await;
    let batches = BatchRepository::new(db.clone());
    let donations = DonationRepository::new(db.clone());

    let first = donations
        .create(fixture.congregation_id, cash(batch_id, dec!(50.00)))
        .await
        .expect("Failed to create donation");
    donations
        .create(fixture.congregation_id, cash(batch_id, dec!(75.00)))
        .await
        .expect("Failed to create donation");

    let batch = batches
        .find_by_id(fixture.congregation_id, batch_id)
        .await
        .expect("Failed to fetch batch")
        .expect("batch exists");
    assert_eq!(batch.total_amount, dec!(125.00));

    donations
        .update(
            fixture.congregation_id,
            first.id,
            UpdateDonationInput {
                amount: Some(dec!(60.00)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update donation");
    donations
        .delete(fixture.congregation_id, first.id)
        .await
        .expect("Failed to delete donation");

    let batch = batches
        .find_by_id(fixture.congregation_id, batch_id)
        .await
        .expect("Failed to fetch batch")
        .expect("batch exists");
    assert_eq!(batch.total_amount, dec!(75.00));
}

#[tokio::test]
async fn test_move_updates_both_batch_totals() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let source = create_batch(&db, &fixture, "Sunday Morning").await;
    let target = create_batch(&db, &fixture, "Sunday Evening").await;
    let batches = BatchRepository::new(db.clone());
    let donations = DonationRepository::new(db.clone());

    let donation = donations
        .create(fixture.congregation_id, cash(source, dec!(40.00)))
        .await
        .expect("Failed to create donation");

    let moved = donations
        .move_donation(fixture.congregation_id, donation.id, Some(target))
        .await
        .expect("Failed to move donation");
    assert_eq!(moved.batch_id, Some(target));

    let source_batch = batches
        .find_by_id(fixture.congregation_id, source)
        .await
        .expect("Failed to fetch batch")
        .expect("batch exists");
    let target_batch = batches
        .find_by_id(fixture.congregation_id, target)
        .await
        .expect("Failed to fetch batch")
        .expect("batch exists");
    assert_eq!(source_batch.total_amount, dec!(0.00));
    assert_eq!(target_batch.total_amount, dec!(40.00));
}

#[tokio::test]
async fn test_finalized_batch_is_immutable() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = create_batch(&db, &fixture, "Sunday Morning").await;
    let donations = DonationRepository::new(db.clone());

    let donation = donations
        .create(fixture.congregation_id, cash(batch_id, dec!(50.00)))
        .await
        .expect("Failed to create donation");

    finalize(&db, &fixture, batch_id).await;

    let create_result = donations
        .create(fixture.congregation_id, cash(batch_id, dec!(10.00)))
        .await;
    assert!(matches!(
        create_result,
        Err(DonationError::Invalid(LedgerError::BatchFinalized(id))) if id == batch_id
    ));

    let update_result = donations
        .update(
            fixture.congregation_id,
            donation.id,
            UpdateDonationInput {
                amount: Some(dec!(99.00)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        update_result,
        Err(DonationError::Invalid(LedgerError::BatchFinalized(_)))
    ));

    let delete_result = donations.delete(fixture.congregation_id, donation.id).await;
    assert!(matches!(
        delete_result,
        Err(DonationError::Invalid(LedgerError::BatchFinalized(_)))
    ));

    let move_result = donations
        .move_donation(fixture.congregation_id, donation.id, None)
        .await;
    assert!(matches!(
        move_result,
        Err(DonationError::Invalid(LedgerError::BatchFinalized(_)))
    ));
}

#[tokio::test]
async fn test_check_requires_number_through_repository() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = create_batch(&db, &fixture, "Sunday Morning").await;
    let donations = DonationRepository::new(db.clone());

    let result = donations
        .create(
            fixture.congregation_id,
            CreateDonationInput {
                batch_id: Some(batch_id),
                member_id: None,
                donation_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                donation_type: DonationType::Check,
                amount: dec!(120.00),
                check_number: None,
                notes: None,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(DonationError::Invalid(LedgerError::CheckNumberRequired))
    ));
}

#[tokio::test]
async fn test_blank_check_number_stored_as_null() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = create_batch(&db, &fixture, "Sunday Morning").await;
    let donations = DonationRepository::new(db.clone());

    // A whitespace-only check number on a cash donation counts as absent
    // and must be stored as NULL, not as the raw string.
    let donation = donations
        .create(
            fixture.congregation_id,
            CreateDonationInput {
                batch_id: Some(batch_id),
                member_id: None,
                donation_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                donation_type: DonationType::Cash,
                amount: dec!(30.00),
                check_number: Some("   ".to_string()),
                notes: None,
            },
        )
        .await
        .expect("cash donation with blank check number should be accepted");
    assert_eq!(donation.check_number, None);

    // Same normalization on update: trimming applies, blank clears.
    let updated = donations
        .update(
            fixture.congregation_id,
            donation.id,
            UpdateDonationInput {
                donation_type: Some(DonationType::Check),
                check_number: Some(Some(" 1041 ".to_string())),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update donation");
    assert_eq!(updated.check_number.as_deref(), Some("1041"));
}

#[tokio::test]
async fn test_unassigned_donation_skips_batch_guard() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let donations = DonationRepository::new(db.clone());

    let donation = donations
        .create(
            fixture.congregation_id,
            CreateDonationInput {
                batch_id: None,
                member_id: None,
                donation_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                donation_type: DonationType::Cash,
                amount: dec!(20.00),
                check_number: None,
                notes: Some("mail-in gift".to_string()),
            },
        )
        .await
        .expect("Failed to create unassigned donation");
    assert!(donation.batch_id.is_none());
}
