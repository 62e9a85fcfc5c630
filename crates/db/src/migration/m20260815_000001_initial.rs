//! Initial database migration.
//!
//! Creates the enums, core tables, check constraints, and indexes for the
//! offering count schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANCY & IDENTITY
        // ============================================================
        db.execute_unprepared(CONGREGATIONS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(MEMBERS_SQL).await?;

        // ============================================================
        // PART 3: COUNTS & LEDGER
        // ============================================================
        db.execute_unprepared(BATCHES_SQL).await?;
        db.execute_unprepared(DONATIONS_SQL).await?;

        // ============================================================
        // PART 4: AUDIT TRAIL
        // ============================================================
        db.execute_unprepared(BATCH_EVENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Batch lifecycle. 'closed' is a legacy value from imported data;
-- the application treats it as 'open'.
CREATE TYPE batch_status AS ENUM ('open', 'closed', 'finalized');

-- Donation kinds
CREATE TYPE donation_type AS ENUM ('cash', 'check');
";

const CONGREGATIONS_SQL: &str = r"
CREATE TABLE congregations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(200) NOT NULL,
    report_recipients TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    congregation_id UUID NOT NULL REFERENCES congregations(id) ON DELETE CASCADE,
    display_name VARCHAR(200) NOT NULL,
    email VARCHAR(255) NOT NULL,
    api_token VARCHAR(128) NOT NULL,
    verified BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (api_token),
    UNIQUE (congregation_id, email)
);

CREATE INDEX idx_users_congregation ON users(congregation_id);
";

const MEMBERS_SQL: &str = r"
CREATE TABLE members (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    congregation_id UUID NOT NULL REFERENCES congregations(id) ON DELETE CASCADE,
    display_name VARCHAR(200) NOT NULL,
    envelope_number INTEGER,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (congregation_id, envelope_number)
);

CREATE INDEX idx_members_congregation ON members(congregation_id);
";

const BATCHES_SQL: &str = r"
CREATE TABLE batches (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    congregation_id UUID NOT NULL REFERENCES congregations(id) ON DELETE CASCADE,
    service_name VARCHAR(200) NOT NULL,
    service_date DATE NOT NULL,
    notes TEXT,
    status batch_status NOT NULL DEFAULT 'open',
    total_amount NUMERIC(12, 2) NOT NULL DEFAULT 0,
    primary_attestor_id UUID REFERENCES users(id),
    primary_attestor_name VARCHAR(200),
    primary_attested_at TIMESTAMPTZ,
    secondary_attestor_id UUID REFERENCES users(id),
    secondary_attestor_name VARCHAR(200),
    secondary_attested_at TIMESTAMPTZ,
    attestation_confirmed_at TIMESTAMPTZ,
    created_by UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    -- A primary attestation is all-or-nothing.
    CONSTRAINT chk_primary_complete CHECK (
        (primary_attestor_id IS NULL) = (primary_attestor_name IS NULL)
        AND (primary_attestor_id IS NULL) = (primary_attested_at IS NULL)
    ),
    -- Likewise for the secondary attestation.
    CONSTRAINT chk_secondary_complete CHECK (
        (secondary_attestor_id IS NULL) = (secondary_attestor_name IS NULL)
        AND (secondary_attestor_id IS NULL) = (secondary_attested_at IS NULL)
    ),
    -- No secondary without a primary.
    CONSTRAINT chk_secondary_requires_primary CHECK (
        secondary_attestor_id IS NULL OR primary_attestor_id IS NOT NULL
    ),
    -- The two counters must be different people.
    CONSTRAINT chk_distinct_attestors CHECK (
        secondary_attestor_id IS NULL
        OR secondary_attestor_id <> primary_attestor_id
    ),
    -- Finalization implies both attestations and a confirmation timestamp.
    CONSTRAINT chk_finalized_complete CHECK (
        status <> 'finalized'
        OR (
            primary_attestor_id IS NOT NULL
            AND secondary_attestor_id IS NOT NULL
            AND attestation_confirmed_at IS NOT NULL
        )
    ),
    CONSTRAINT chk_confirmed_implies_finalized CHECK (
        attestation_confirmed_at IS NULL OR status = 'finalized'
    )
);

CREATE INDEX idx_batches_congregation_date ON batches(congregation_id, service_date);
CREATE INDEX idx_batches_congregation_status ON batches(congregation_id, status);
";

const DONATIONS_SQL: &str = r"
CREATE TABLE donations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    congregation_id UUID NOT NULL REFERENCES congregations(id) ON DELETE CASCADE,
    batch_id UUID REFERENCES batches(id) ON DELETE CASCADE,
    member_id UUID REFERENCES members(id) ON DELETE SET NULL,
    donation_date DATE NOT NULL,
    donation_type donation_type NOT NULL,
    amount NUMERIC(12, 2) NOT NULL,
    check_number VARCHAR(50),
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    -- Checks carry a check number, cash never does.
    CONSTRAINT chk_check_number CHECK (
        (donation_type = 'check' AND check_number IS NOT NULL)
        OR (donation_type = 'cash' AND check_number IS NULL)
    )
);

CREATE INDEX idx_donations_batch ON donations(batch_id);
CREATE INDEX idx_donations_congregation_date ON donations(congregation_id, donation_date);
CREATE INDEX idx_donations_member ON donations(member_id);
";

const BATCH_EVENTS_SQL: &str = r"
CREATE TABLE batch_events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    batch_id UUID NOT NULL REFERENCES batches(id) ON DELETE CASCADE,
    event_type VARCHAR(50) NOT NULL,
    actor_id UUID,
    actor_name VARCHAR(200),
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_batch_events_batch ON batch_events(batch_id, recorded_at);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS batch_events CASCADE;
DROP TABLE IF EXISTS donations CASCADE;
DROP TABLE IF EXISTS batches CASCADE;
DROP TABLE IF EXISTS members CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS congregations CASCADE;
DROP TYPE IF EXISTS donation_type;
DROP TYPE IF EXISTS batch_status;
";
