pub mod base;
pub mod disk;
pub mod memory;

pub use base::{ResultSink, StorageError};
pub use disk::JsonFileSink;
pub use memory::MemorySink;
