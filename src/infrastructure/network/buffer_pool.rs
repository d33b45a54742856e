//! Buffer Pool
//!
//! Fixed-size byte buffers recycled through a free list. Acquisition never
//! blocks: when the free list runs dry the pool manufactures another full
//! batch and records a miss.
//!
//! Every live pool is listed in a process-wide directory so that health and
//! metrics endpoints can report on all of them.

use std::collections::VecDeque;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;

/// Process-wide directory of live pools
static POOLS: Lazy<Mutex<Vec<Arc<BufferPool>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Diagnostic snapshot of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolInfo {
    pub name: String,
    pub free_count: usize,
    pub initial_capacity: usize,
    /// `initial_capacity * (1 + misses)`
    pub current_capacity: usize,
    pub buffer_size: usize,
    pub misses: usize,
}

struct PoolState {
    free: VecDeque<Vec<u8>>,
    misses: usize,
}

/// Pool of reusable `buffer_size`-byte buffers.
///
/// Checked-out buffers belong to the caller until handed back with
/// [`BufferPool::release_buffer`]. Nothing tracks provenance: releasing a
/// foreign buffer or the same buffer twice is a caller bug.
pub struct BufferPool {
    name: String,
    initial_capacity: usize,
    buffer_size: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Create a pool with `initial_capacity` pre-allocated buffers and list
    /// it in the process-wide directory.
    pub fn new(name: impl Into<String>, initial_capacity: usize, buffer_size: usize) -> Arc<Self> {
        let free = (0..initial_capacity)
            .map(|_| vec![0u8; buffer_size])
            .collect::<VecDeque<_>>();

        let pool = Arc::new(Self {
            name: name.into(),
            initial_capacity,
            buffer_size,
            state: Mutex::new(PoolState { free, misses: 0 }),
        });

        POOLS.lock().push(Arc::clone(&pool));

        tracing::debug!(
            pool = %pool.name,
            initial_capacity,
            buffer_size,
            "Buffer pool created"
        );

        pool
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Take a buffer from the free list, growing the pool by one batch if empty.
    pub fn acquire_buffer(&self) -> Vec<u8> {
        let mut state = self.state.lock();

        if let Some(buffer) = state.free.pop_front() {
            return buffer;
        }

        state.misses += 1;
        for _ in 0..self.initial_capacity {
            state.free.push_back(vec![0u8; self.buffer_size]);
        }

        tracing::debug!(
            pool = %self.name,
            misses = state.misses,
            current_capacity = self.initial_capacity * (1 + state.misses),
            "Buffer pool exhausted, added a batch"
        );

        // A zero-capacity pool has no batch to draw from
        state
            .free
            .pop_front()
            .unwrap_or_else(|| vec![0u8; self.buffer_size])
    }

    /// Hand a buffer back. `None` is ignored.
    pub fn release_buffer(&self, buffer: impl Into<Option<Vec<u8>>>) {
        let Some(mut buffer) = buffer.into() else {
            return;
        };

        if buffer.len() != self.buffer_size {
            buffer.resize(self.buffer_size, 0);
        }

        self.state.lock().free.push_back(buffer);
    }

    /// Snapshot of this pool's counters.
    pub fn info(&self) -> PoolInfo {
        let state = self.state.lock();
        PoolInfo {
            name: self.name.clone(),
            free_count: state.free.len(),
            initial_capacity: self.initial_capacity,
            current_capacity: self.initial_capacity * (1 + state.misses),
            buffer_size: self.buffer_size,
            misses: state.misses,
        }
    }

    /// Remove this pool from the process-wide directory.
    pub fn free(&self) {
        let mut pools = POOLS.lock();
        pools.retain(|pool| !std::ptr::eq(Arc::as_ptr(pool), self));
        tracing::debug!(pool = %self.name, "Buffer pool freed");
    }
}

/// Snapshot of every pool currently listed in the directory.
pub fn all_pools_info() -> Vec<PoolInfo> {
    let pools: Vec<Arc<BufferPool>> = POOLS.lock().iter().cloned().collect();
    pools.iter().map(|pool| pool.info()).collect()
}
