//! Pixelverse is the core of a themeable, multilingual chat front-end.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns messages, the streaming tag parser that turns assistant
//!   output into render nodes, the streaming session controller and the
//!   persisted settings.
//! - [`ui`] turns render nodes into themed terminal lines: markdown blocks,
//!   highlighted code, media frames, thinking blocks and tool-call badges.
//! - [`api`] is the backend client for providers, models, sessions and MCP
//!   servers, with a request cache and retry policy.
//! - [`utils`] holds shared helpers (bounded caches, syntax highlighting,
//!   clipboard, URLs, logging setup).
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
