//! Concrete historical data providers

pub mod file;
pub mod memory;

pub use file::FileProvider;
pub use memory::MemoryProvider;
