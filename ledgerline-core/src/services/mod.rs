//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
pub mod migration;
pub mod transfer;
pub mod unit_of_work;
pub mod user;

pub use account::{AccountHistory, AccountService, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use migration::{MigrationResult, MigrationService};
pub use transfer::{apply_transfer, TransferService};
pub use unit_of_work::{run_in_transaction, run_in_transaction_until};
pub use user::{
    hash_password, verify_email_hook, verify_password, CreateUserParams, UserService,
};
