//! Streaming session control: applies transport chunks to the active message
//! and re-derives its render nodes after each one.

pub mod controller;
pub mod driver;

pub use controller::{
    Completion, ControllerError, ConversationView, RenderCaches, RenderUpdate, StreamState,
    MAX_MESSAGES,
};
pub use driver::{
    drive_stream, run_exchange, ReplayTransport, StreamEvent, StreamOutcome, Transport,
    TransportRequest,
};
