//! vigil-state: cross-invocation state for the vigil probe.
//!
//! The state is a single small JSON document holding the last observed
//! counter values and the time progress was last seen.
//!
//! # Failure policy
//!
//! Reading fails soft: a missing file is a normal first run, and an
//! unreadable or corrupted file degrades to the default state plus a warning.
//! Writing publishes atomically through a sibling temp file and a rename, so
//! a reader never observes a partially written document.

pub mod error;
pub mod store;

pub use error::{StateError, StateResult};
pub use store::{LoadedState, StateStore};
