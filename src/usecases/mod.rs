//! Use Cases Layer - Application Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! feed's workflows.
//!
//! Use cases:
//! - `EventClient` / `StreamSession`: single-session connection manager
//! - `EventService`: channel-based event stream
//! - `ReconnectPolicy`: reconnect backoff schedule
//! - `render_board`: text board for the quote book

pub mod backoff;
pub mod board;
pub mod connection;
pub mod context;
pub mod stream;

pub use backoff::ReconnectPolicy;
pub use board::{build_symbol_map, render_board};
pub use connection::{ClientSettings, ConnectionState, EventClient, StreamSession};
pub use context::StreamContext;
pub use stream::EventService;
