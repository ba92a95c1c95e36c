//! QA Relay — LINE webhook relay that threads Q&A into Notion.

pub mod config;
pub mod error;
pub mod event;
pub mod interpret;
pub mod line;
pub mod media;
pub mod notion;
pub mod relay;
pub mod server;

#[cfg(test)]
pub(crate) mod testutil;
