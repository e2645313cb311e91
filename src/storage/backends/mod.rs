//! Storage backend implementations

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;
