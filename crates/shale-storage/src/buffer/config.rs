//! Buffer pool configuration.

use shale_common::constants::{DEFAULT_POOL_SIZE, MIN_POOL_SIZE, PAGE_SIZE};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    pub pool_size: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified number of frames.
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    /// Creates a configuration from a memory size in bytes.
    pub fn from_memory_size(memory_bytes: usize) -> Self {
        let pool_size = (memory_bytes / PAGE_SIZE).max(MIN_POOL_SIZE);
        Self::new(pool_size)
    }

    /// Sets the number of frames.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Returns the total memory used by the frame array.
    pub fn memory_usage(&self) -> usize {
        self.pool_size * PAGE_SIZE
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size < MIN_POOL_SIZE {
            return Err("pool_size must be at least 1");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
