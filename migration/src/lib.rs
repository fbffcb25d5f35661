//! Account migration core for AT Protocol personal data servers (PDS).
//!
//! Moves an account from an origin PDS to a destination PDS: repository
//! snapshot, content blobs, preferences, and finally the PLC identity
//! itself. Progress is never persisted locally; every decision is
//! re-derived from fresh `com.atproto.server.checkAccountStatus` reads of
//! both services, so a run can stop at any point and resume later.
//!
//! # Architecture
//!
//! - **status**: pure next-step comparator and per-step readiness checks
//! - **client**: typed transport boundary (`PdsAgent`/`PdsHost`) with a
//!   `reqwest`-based XRPC implementation
//! - **migration**: the step components (account creation, data transfer,
//!   identity transfer, finalization) and the orchestrator that decides
//!   which one runs next
//! - **crypto**: recovery keypair generation and `did:key` derivation

pub mod client;
pub mod crypto;
pub mod migration;
pub mod status;

pub use client::agent::{PdsAgent, PdsHost};
pub use client::errors::{ClientError, ClientResult};
pub use client::types::AccountStatus;
pub use crypto::RecoveryKeypair;
pub use migration::orchestrator::MigrationOrchestrator;
pub use migration::types::{
    BlobTransferAbort, BlobTransferReport, DataMigrationReport, MigrationDecision, MigrationError,
    PlcTransition,
};
pub use status::{next_step, readiness_for, MigrationStep, StepReadiness};
