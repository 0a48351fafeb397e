//! topictail - search and poll event streams on a Kafka broker management API
//!
//! The crate logs into the broker UI gateway, runs bounded message searches
//! against topics, decodes the SSE-style event stream those searches return,
//! and polls on a fixed cadence until a predicate holds: a matching string,
//! a record past a timestamp, a submission reaching a pipeline stage, or an
//! email-originated submission appearing.

pub mod adapters;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod poll;
pub mod search;
pub mod seek;
pub mod session;
pub mod stages;
pub mod stream;
pub mod traits;

pub use classify::DecodedMessage;
pub use config::{BrokerEnv, EngineConfig, Region, TopicRegistry};
pub use error::{EngineError, EngineResult};
pub use poll::{PollConfig, PollOutcome, PollSession};
pub use search::TopicSearchClient;
pub use seek::{SeekDirection, SeekMode, SeekSpec};
