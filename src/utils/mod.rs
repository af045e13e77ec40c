pub mod cache;
pub mod clipboard;
pub mod logging;
pub mod syntax;
pub mod url;
