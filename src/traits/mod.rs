//! Trait abstractions for external capabilities.
//!
//! The engine talks to the outside world only through the [`HttpClient`]
//! trait; everything else (stream decoding, seeking, classification, polling)
//! is pure logic on top of it.

pub mod http;

pub use http::{Headers, HttpClient, HttpError, Query, Response};
