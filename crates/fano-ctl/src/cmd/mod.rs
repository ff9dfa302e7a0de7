//! CLI command modules.

pub mod http;
pub mod inspect;
pub mod playback;
