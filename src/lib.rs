//! Canvas MCP Library
//!
//! Response caching, object normalization and error classification for Canvas
//! LMS, plus the tools and MCP server built on them. Exposed as a library for
//! use in integration tests.

pub mod cache;
pub mod canvas;
pub mod cli;
pub mod error;
pub mod normalize;
pub mod server;
pub mod tools;
