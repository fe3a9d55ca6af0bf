//! Narrator Screen crate - accessibility tree linearization and change filtering.
//!
//! Turns the host's accessibility tree into a single narration string and
//! decides, from successive strings, whether the screen changed enough to be
//! read again.

pub mod filter;
pub mod fingerprint;
pub mod snapshot;

pub use filter::{ChangeSignificanceFilter, FilterDecision};
pub use fingerprint::fingerprint;
pub use snapshot::{Extraction, SnapshotReader, LABEL_SEPARATOR};
