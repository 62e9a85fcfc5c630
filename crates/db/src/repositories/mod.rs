//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod attestation;
pub mod batch;
pub mod donation;
pub mod event;
pub mod member;
pub mod user;

pub use attestation::{AttestationRepository, ConfirmResult};
pub use batch::{
    BatchError, BatchFilter, BatchRepository, BatchSnapshot, CreateBatchInput, UpdateBatchInput,
};
pub use donation::{CreateDonationInput, DonationError, DonationRepository, UpdateDonationInput};
pub use event::BatchEventRepository;
pub use member::MemberRepository;
pub use user::UserRepository;
