//! Run-keyed artifact storage.
//!
//! Every production cycle owns a directory named after its date key and a
//! fixed set of artifact slots inside it. The store exposes presence checks
//! and atomic reads/writes per slot; the director derives all of its resume
//! state from slot presence, so a write must never be observable half-done.

mod error;
mod store;
mod types;

pub use error::ArtifactError;
pub use store::RunStore;
pub use types::{ArtifactKind, RunId};
