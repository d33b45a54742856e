//! WebSocket Live Stream
//!
//! Live connections, their registry, command routing and the broadcast
//! loop that feeds them content.

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod messages;
pub mod registry;
pub mod session;

pub use broadcast::{BroadcastLoop, TickReport};
pub use connection::{Connection, ConnectionError, ConnectionHandle, OutboundFrame, WsConnection};
pub use dispatcher::{Collaborators, CommandDispatcher, DispatchError};
pub use handler::{run_session, ws_handler};
pub use messages::{Command, CommandEnvelope, CommandError, MessageType};
pub use registry::ConnectionRegistry;
pub use session::{ConnectionState, SessionGuard, SessionState};
