//! Circular Byte Queue
//!
//! A growable ring buffer that decouples packet producers from the socket
//! writer. Capacity grows in whole blocks and never shrinks.
//!
//! The queue is not synchronized. Each instance must be owned by a single
//! task; share bytes between tasks, not queues.

/// Default growth increment in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 2048;

/// Sentinel returned by [`ByteQueue::packet_id`] when the queue is empty.
pub const NO_PACKET_ID: u8 = 0xFF;

/// Byte queue errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("span at offset {offset} with length {length} exceeds source of {available} bytes")]
    OutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },
}

/// Circular byte buffer with head/tail cursors.
#[derive(Debug)]
pub struct ByteQueue {
    head: usize,
    tail: usize,
    size: usize,
    block_size: usize,
    buffer: Vec<u8>,
}

impl ByteQueue {
    /// Create an empty queue with the default 2048-byte block size.
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Create an empty queue whose capacity starts at, and grows by, `block_size`.
    pub fn with_block_size(block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            head: 0,
            tail: 0,
            size: 0,
            block_size,
            buffer: vec![0; block_size],
        }
    }

    /// Number of bytes currently queued.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Drop all queued bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }

    /// Peek the packet id at the head of the queue.
    ///
    /// Returns [`NO_PACKET_ID`] when nothing is queued.
    pub fn packet_id(&self) -> u8 {
        if self.size >= 1 {
            self.buffer[self.head]
        } else {
            NO_PACKET_ID
        }
    }

    /// Peek the big-endian payload length that follows the packet id.
    ///
    /// Returns 0 until at least the three header bytes are queued.
    pub fn packet_length(&self) -> usize {
        if self.size >= 3 {
            let capacity = self.buffer.len();
            let high = self.buffer[(self.head + 1) % capacity] as usize;
            let low = self.buffer[(self.head + 2) % capacity] as usize;
            (high << 8) | low
        } else {
            0
        }
    }

    /// Append `length` bytes of `data` starting at `offset`.
    ///
    /// Grows the buffer to the next block multiple when the bytes do not fit.
    pub fn enqueue(&mut self, data: &[u8], offset: usize, length: usize) -> Result<(), QueueError> {
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= data.len())
            .ok_or(QueueError::OutOfBounds {
                offset,
                length,
                available: data.len(),
            })?;

        if length == 0 {
            return Ok(());
        }

        let required = self.size + length;
        if required > self.buffer.len() {
            self.set_capacity(required.div_ceil(self.block_size) * self.block_size);
        }

        let source = &data[offset..end];
        let capacity = self.buffer.len();
        let right_length = capacity - self.tail;

        if right_length >= length {
            self.buffer[self.tail..self.tail + length].copy_from_slice(source);
        } else {
            self.buffer[self.tail..].copy_from_slice(&source[..right_length]);
            self.buffer[..length - right_length].copy_from_slice(&source[right_length..]);
        }

        self.tail = (self.tail + length) % capacity;
        self.size += length;

        Ok(())
    }

    /// Move up to `max_length` bytes into `buffer` starting at `offset`.
    ///
    /// The count is also bounded by the room left in `buffer`. Returns the
    /// number of bytes copied, 0 when the queue is empty.
    pub fn dequeue(&mut self, buffer: &mut [u8], offset: usize, max_length: usize) -> usize {
        let room = buffer.len().saturating_sub(offset);
        let count = max_length.min(self.size).min(room);

        if count == 0 {
            return 0;
        }

        let capacity = self.buffer.len();
        let right_length = capacity - self.head;
        let target = &mut buffer[offset..offset + count];

        if right_length >= count {
            target.copy_from_slice(&self.buffer[self.head..self.head + count]);
        } else {
            target[..right_length].copy_from_slice(&self.buffer[self.head..]);
            target[right_length..].copy_from_slice(&self.buffer[..count - right_length]);
        }

        self.head = (self.head + count) % capacity;
        self.size -= count;

        if self.size == 0 {
            self.head = 0;
            self.tail = 0;
        }

        count
    }

    /// Reallocate, laying out queued bytes in logical order from offset 0.
    fn set_capacity(&mut self, capacity: usize) {
        let mut buffer = vec![0; capacity];

        if self.size > 0 {
            let old_capacity = self.buffer.len();
            let right_length = old_capacity - self.head;

            if right_length >= self.size {
                buffer[..self.size].copy_from_slice(&self.buffer[self.head..self.head + self.size]);
            } else {
                buffer[..right_length].copy_from_slice(&self.buffer[self.head..]);
                buffer[right_length..self.size]
                    .copy_from_slice(&self.buffer[..self.size - right_length]);
            }
        }

        tracing::trace!(
            from = self.buffer.len(),
            to = capacity,
            queued = self.size,
            "Byte queue grown"
        );

        self.head = 0;
        self.tail = self.size % capacity;
        self.buffer = buffer;
    }
}

impl Default for ByteQueue {
    fn default() -> Self {
        Self::new()
    }
}
