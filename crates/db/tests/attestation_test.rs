//! Integration tests for the attestation repository.
//!
//! Exercises the full dual-signature cycle plus the eligibility and
//! ordering guards. Requires a Postgres database; each test is skipped
//! when `DATABASE_URL` is not set.

use std::env;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use plately_core::attestation::{AttestationError, AttestationStage};
use plately_db::entities::{congregations, users};
use plately_db::migration::Migrator;
use plately_db::repositories::{
    AttestationRepository, BatchEventRepository, BatchRepository, CreateBatchInput,
    CreateDonationInput, DonationRepository,
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
    unverified_id: Uuid,
}

async fn seed_fixture(db: &DatabaseConnection) -> Fixture {
    let congregation_id = Uuid::new_v4();
    let now = chrono::Utc::now().into();
    congregations::ActiveModel {
        id: Set(congregation_id),
        name: Set(format!("Test Congregation {congregation_id}")),
        report_recipients: Set(Some("treasurer@example.org".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to insert congregation");

    let mut ids = Vec::new();
    for verified in [true, true, false] {
        let id = Uuid::new_v4();
        users::ActiveModel {
            id: Set(id),
            congregation_id: Set(congregation_id),
            display_name: Set(format!("User {id}")),
            email: Set(format!("{id}@example.org")),
            api_token: Set(Uuid::new_v4().simple().to_string()),
            verified: Set(verified),
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
        unverified_id: ids[2],
    }
}

async fn seed_batch_with_donation(db: &DatabaseConnection, fixture: &Fixture) -> Uuid {
    let batches = BatchRepository::new(db.clone());
    let donations = DonationRepository::new(db.clone());

    let batch = batches
        .create(
            fixture.congregation_id,
            fixture.counter_id,
            CreateBatchInput {
                service_name: "Sunday Morning".to_string(),
                service_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                notes: None,
            },
        )
        .await
        .expect("Failed to create batch");

    donations
        .create(
            fixture.congregation_id,
            CreateDonationInput {
                batch_id: Some(batch.id),
                member_id: None,
                donation_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                donation_type: plately_core::ledger::DonationType::Cash,
                amount: dec!(50.00),
                check_number: None,
                notes: None,
            },
        )
        .await
        .expect("Failed to create donation");

    batch.id
}

#[tokio::test]
async fn test_full_attestation_cycle() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = seed_batch_with_donation(&db, &fixture).await;
    let repo = AttestationRepository::new(db.clone());

    let batch = repo
        .attest_primary(fixture.congregation_id, batch_id, fixture.counter_id, "Alice Counter")
        .await
        .expect("primary attestation should succeed");
    assert_eq!(batch.primary_attestor_id, Some(fixture.counter_id));
    assert_eq!(batch.primary_attestor_name.as_deref(), Some("Alice Counter"));

    let batch = repo
        .attest_secondary(
            fixture.congregation_id,
            batch_id,
            fixture.verifier_id,
            true,
            "Carol Verifier",
        )
        .await
        .expect("secondary attestation should succeed");
    assert_eq!(batch.secondary_attestor_id, Some(fixture.verifier_id));

    let result = repo
        .confirm_finalization(
            fixture.congregation_id,
            batch_id,
            fixture.verifier_id,
            "Carol Verifier",
        )
        .await
        .expect("confirmation should succeed");
    assert!(result.caused_transition, "first confirm performs the transition");
    assert!(result.batch.attestation_confirmed_at.is_some());

    // A retry is idempotent success without a second transition.
    let retry = repo
        .confirm_finalization(
            fixture.congregation_id,
            batch_id,
            fixture.verifier_id,
            "Carol Verifier",
        )
        .await
        .expect("repeat confirmation should succeed");
    assert!(!retry.caused_transition);

    let events = BatchEventRepository::new(db)
        .list_for_batch(batch_id)
        .await
        .expect("Failed to list events");
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["primary_attested", "secondary_attested", "finalized"]);
}

#[tokio::test]
async fn test_concurrent_confirms_transition_exactly_once() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = seed_batch_with_donation(&db, &fixture).await;
    let repo = AttestationRepository::new(db.clone());

    repo.attest_primary(fixture.congregation_id, batch_id, fixture.counter_id, "Alice Counter")
        .await
        .expect("primary attestation should succeed");
    repo.attest_secondary(
        fixture.congregation_id,
        batch_id,
        fixture.verifier_id,
        true,
        "Carol Verifier",
    )
    .await
    .expect("secondary attestation should succeed");

    // Two racing confirms: both succeed, but only one performs the
    // transition, so report dispatch can fire at most once.
    let (first, second) = futures::join!(
        repo.confirm_finalization(
            fixture.congregation_id,
            batch_id,
            fixture.verifier_id,
            "Carol Verifier",
        ),
        repo.confirm_finalization(
            fixture.congregation_id,
            batch_id,
            fixture.counter_id,
            "Alice Counter",
        ),
    );
    let first = first.expect("racing confirm should succeed");
    let second = second.expect("racing confirm should succeed");

    let transitions = [first.caused_transition, second.caused_transition];
    assert_eq!(
        transitions.iter().filter(|caused| **caused).count(),
        1,
        "exactly one confirm performs the transition"
    );
    assert!(first.batch.attestation_confirmed_at.is_some());
    assert!(second.batch.attestation_confirmed_at.is_some());

    let events = BatchEventRepository::new(db)
        .list_for_batch(batch_id)
        .await
        .expect("Failed to list events");
    let finalized_events = events.iter().filter(|e| e.event_type == "finalized").count();
    assert_eq!(finalized_events, 1, "the audit trail records one finalization");
}

#[tokio::test]
async fn test_attest_primary_rejects_empty_batch() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batches = BatchRepository::new(db.clone());
    let batch = batches
        .create(
            fixture.congregation_id,
            fixture.counter_id,
            CreateBatchInput {
                service_name: "Sunday Evening".to_string(),
                service_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                notes: None,
            },
        )
        .await
        .expect("Failed to create batch");

    let repo = AttestationRepository::new(db);
    let result = repo
        .attest_primary(fixture.congregation_id, batch.id, fixture.counter_id, "Alice")
        .await;
    assert!(matches!(result, Err(AttestationError::EmptyBatch)));
}

#[tokio::test]
async fn test_attest_secondary_rejects_same_person() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = seed_batch_with_donation(&db, &fixture).await;
    let repo = AttestationRepository::new(db);

    repo.attest_primary(fixture.congregation_id, batch_id, fixture.counter_id, "Alice")
        .await
        .expect("primary attestation should succeed");

    let result = repo
        .attest_secondary(fixture.congregation_id, batch_id, fixture.counter_id, true, "Alice")
        .await;
    assert!(matches!(result, Err(AttestationError::SelfAttestation)));
}

#[tokio::test]
async fn test_attest_secondary_rejects_unverified_user() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = seed_batch_with_donation(&db, &fixture).await;
    let repo = AttestationRepository::new(db);

    repo.attest_primary(fixture.congregation_id, batch_id, fixture.counter_id, "Alice")
        .await
        .expect("primary attestation should succeed");

    let result = repo
        .attest_secondary(
            fixture.congregation_id,
            batch_id,
            fixture.unverified_id,
            false,
            "Eve",
        )
        .await;
    assert!(matches!(
        result,
        Err(AttestationError::UnverifiedAttestor { attestor_id }) if attestor_id == fixture.unverified_id
    ));
}

#[tokio::test]
async fn test_confirm_requires_both_attestations() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = seed_batch_with_donation(&db, &fixture).await;
    let repo = AttestationRepository::new(db);

    let result = repo
        .confirm_finalization(fixture.congregation_id, batch_id, fixture.counter_id, "Alice")
        .await;
    assert!(matches!(
        result,
        Err(AttestationError::InvalidState { stage: AttestationStage::Open, .. })
    ));

    repo.attest_primary(fixture.congregation_id, batch_id, fixture.counter_id, "Alice")
        .await
        .expect("primary attestation should succeed");

    let result = repo
        .confirm_finalization(fixture.congregation_id, batch_id, fixture.counter_id, "Alice")
        .await;
    assert!(matches!(
        result,
        Err(AttestationError::InvalidState { stage: AttestationStage::PrimaryAttested, .. })
    ));
}

#[tokio::test]
async fn test_attestation_not_found_for_other_congregation() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let fixture = seed_fixture(&db).await;
    let batch_id = seed_batch_with_donation(&db, &fixture).await;
    let repo = AttestationRepository::new(db);

    let other_congregation = Uuid::new_v4();
    let result = repo
        .attest_primary(other_congregation, batch_id, fixture.counter_id, "Alice")
        .await;
    assert!(matches!(result, Err(AttestationError::BatchNotFound(id)) if id == batch_id));
}
