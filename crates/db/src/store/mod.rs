//! `LedgerStore` implementations.

mod memory;
mod pg;

pub use memory::MemoryLedgerStore;
pub use pg::PgLedgerStore;
