// Briefly watermarker library
//
// Queue message -> storage events -> filter -> fetch -> watermark -> publish

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod logging;
pub mod pipeline;
pub mod publisher;
pub mod store;
pub mod types;
pub mod watermark;
