//! Presentation layer.
//!
//! - [`markdown`] parses markdown into structural blocks with cached code and
//!   diagram rendering; [`media`] classifies URLs for framed embeds.
//! - [`renderer`] materializes render nodes into ratatui lines.
//! - [`theme`] and [`builtin_themes`] hold color policy; [`i18n`] the labels.

pub mod builtin_themes;
pub mod diagram;
pub mod i18n;
pub mod markdown;
pub mod media;
pub mod renderer;
pub mod theme;
