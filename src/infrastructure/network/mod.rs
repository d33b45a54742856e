//! Network Support Primitives
//!
//! Byte-level building blocks for outbound binary frames:
//! - `ByteQueue`: growable circular byte buffer
//! - `BufferPool`: recycled fixed-size buffers with miss accounting
//! - `PacketStager`: length-prefixed packet staging through both

mod buffer_pool;
mod byte_queue;
mod packet;

pub use buffer_pool::{all_pools_info, BufferPool, PoolInfo};
pub use byte_queue::{ByteQueue, QueueError, DEFAULT_BLOCK_SIZE, NO_PACKET_ID};
pub use packet::{
    encode_packet, max_payload_len, PacketError, PacketStager, CONTENT_PACKET_ID,
    PACKET_HEADER_LEN,
};
