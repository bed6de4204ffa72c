//! Parties domain module (customers and suppliers).
//!
//! Pure domain logic: validation, search, the transact guard and the
//! snapshots billing documents keep. No IO, no HTTP, no storage.

pub mod party;
pub mod snapshot;

pub use party::{ContactInfo, Party, PartyId, PartyInput, PartyKind, PartyStatus};
pub use snapshot::{AdHocParty, PartySnapshot};
