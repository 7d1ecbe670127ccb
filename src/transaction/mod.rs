//! Transaction module
//!
//! This module contains the transaction state machine, its buffer file and
//! the snapshots used by atomic COMMIT.

pub mod buffer;
pub mod snapshot;
pub mod transaction;

pub use buffer::TransactionBuffer;
pub use snapshot::DataSnapshot;
pub use transaction::{TransactionManager, TransactionState};
