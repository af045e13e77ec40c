pub mod config;
pub mod copy;
pub mod message;
pub mod parse;
pub mod scroll;
pub mod stream;
pub mod uploads;
