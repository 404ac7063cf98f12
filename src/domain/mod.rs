//! Domain layer - Wire codec, typed events and subscription rules.
//!
//! Pure logic for the kabu event stream: frame decoding, per-command
//! event construction, subscription validation and the quote board.
//! Nothing here performs I/O (hexagonal architecture inner ring).

pub mod attributes;
pub mod command;
pub mod decoder;
pub mod event;
pub mod frame;
pub mod params;
pub mod quote;
pub mod quote_book;
pub mod text;

// Re-export core types for convenience
pub use attributes::Attributes;
pub use command::{Command, DEFAULT_COMMANDS};
pub use decoder::decode_event;
pub use event::{Ec, Event, Execution, Fd, FdRow, Kp, NoticeHeader, Ns, Order, Ss, St, Us};
pub use frame::{Frame, decode_frame, encode_frame};
pub use params::{SubscriptionParams, build_ws_url};
pub use quote::{BookLevel, BookSide, Price, Quantity, Quote};
pub use quote_book::{QuoteBook, QuoteRow};
