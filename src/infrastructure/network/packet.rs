//! Length-Prefixed Packets
//!
//! Binary frames carry packets laid out as a 1-byte id, a 2-byte big-endian
//! payload length, then the payload. Packets are encoded into pooled
//! buffers and staged through a [`ByteQueue`] before they reach a socket.

use std::sync::Arc;

use bytes::Bytes;

use super::buffer_pool::BufferPool;
use super::byte_queue::{ByteQueue, QueueError};

/// Header bytes preceding each payload
pub const PACKET_HEADER_LEN: usize = 3;

/// Packet id for a serialized content record
pub const CONTENT_PACKET_ID: u8 = 0x01;

/// Packet errors
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("payload of {len} bytes exceeds the {max} byte packet limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("buffer of {len} bytes cannot hold a packet header")]
    BufferTooSmall { len: usize },

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Largest payload that fits in `buffer_len` bytes including the header.
pub fn max_payload_len(buffer_len: usize) -> usize {
    buffer_len
        .saturating_sub(PACKET_HEADER_LEN)
        .min(u16::MAX as usize)
}

/// Write a packet into `buffer`, returning the number of bytes written.
pub fn encode_packet(id: u8, payload: &[u8], buffer: &mut [u8]) -> Result<usize, PacketError> {
    if buffer.len() < PACKET_HEADER_LEN {
        return Err(PacketError::BufferTooSmall { len: buffer.len() });
    }

    let max = max_payload_len(buffer.len());
    if payload.len() > max {
        return Err(PacketError::PayloadTooLarge {
            len: payload.len(),
            max,
        });
    }

    let len = payload.len() as u16;
    buffer[0] = id;
    buffer[1..PACKET_HEADER_LEN].copy_from_slice(&len.to_be_bytes());
    buffer[PACKET_HEADER_LEN..PACKET_HEADER_LEN + payload.len()].copy_from_slice(payload);

    Ok(PACKET_HEADER_LEN + payload.len())
}

/// Stages packets through a private byte queue using pooled buffers.
///
/// Owned by exactly one task: the broadcast loop or a single connection.
pub struct PacketStager {
    pool: Arc<BufferPool>,
    queue: ByteQueue,
}

impl PacketStager {
    pub fn new(pool: Arc<BufferPool>, block_size: usize) -> Self {
        Self {
            pool,
            queue: ByteQueue::with_block_size(block_size),
        }
    }

    /// Encode a packet into a pooled buffer and append it to the queue.
    pub fn stage(&mut self, id: u8, payload: &[u8]) -> Result<(), PacketError> {
        let mut buffer = self.pool.acquire_buffer();

        let result = encode_packet(id, payload, &mut buffer)
            .and_then(|written| Ok(self.queue.enqueue(&buffer, 0, written)?));

        self.pool.release_buffer(buffer);
        result
    }

    /// Dequeue the next complete packet, header included.
    pub fn next_packet(&mut self) -> Option<Bytes> {
        if self.queue.size() < PACKET_HEADER_LEN {
            return None;
        }

        let total = PACKET_HEADER_LEN + self.queue.packet_length();
        if self.queue.size() < total {
            return None;
        }

        let mut buffer = self.pool.acquire_buffer();
        if buffer.len() < total {
            buffer.resize(total, 0);
        }

        let read = self.queue.dequeue(&mut buffer, 0, total);
        let frame = Bytes::copy_from_slice(&buffer[..read]);

        self.pool.release_buffer(buffer);
        Some(frame)
    }

    /// Bytes staged but not yet taken.
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    /// Discard anything still staged.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
