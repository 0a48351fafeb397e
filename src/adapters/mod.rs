//! Concrete implementations of the engine's external capabilities.

pub mod mock;
pub mod reqwest_http;

pub use mock::{MockHttpClient, MockResponse, RecordedRequest};
pub use reqwest_http::ReqwestHttpClient;
