//! Client-side record caches.
//!
//! - [`collection`] - record bookkeeping without I/O
//! - [`record_store`] - a collection bound to its REST endpoint

mod collection;
mod record_store;

pub use collection::{Collection, Completion, PendingOp};
pub use record_store::RecordStore;
