//! Canvas LMS upstream client
//!
//! This module contains the HTTP client for the Canvas REST API, the typed
//! objects it produces, and the error hierarchy it raises.

pub mod client;
pub mod error;
pub mod object;

pub use client::{CanvasApi, CanvasClient, Query, DEFAULT_TIMEOUT_SECS};
pub use error::CanvasError;
pub use object::{wrap_json, CanvasObject};
