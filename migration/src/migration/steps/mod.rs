//! The four side-effecting migration steps.

pub mod blob;
pub mod create;
pub mod data;
pub mod finalize;
pub mod identity;

pub use blob::{transfer_blobs, MAX_BLOB_BYTES};
pub use create::create_account;
pub use data::migrate_data;
pub use finalize::finalize_migration;
pub use identity::{request_identity_transfer, sign_identity_transfer};
