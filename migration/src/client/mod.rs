//! Transport boundary for PDS operations.
//!
//! The migration steps only ever talk to the two services through the
//! [`agent::PdsAgent`] and [`agent::PdsHost`] traits; [`http`] provides the
//! production implementations against the XRPC endpoints. Errors carry a
//! structured kind so callers can tell a dead session apart from an
//! ordinary failed call without inspecting message text.

pub mod agent;
pub mod errors;
pub mod http;
pub mod types;

pub use agent::{PdsAgent, PdsHost};
pub use errors::{ClientError, ClientResult};
pub use http::{HttpPdsAgent, HttpPdsHost};
pub use types::{
    AccountStatus, CreateAccountRequest, FetchedBlob, ListedBlobs, NewAccountParams,
    PlcCredentials, ServerDescription, SessionCredentials,
};
