//! Endpoint probing
//!
//! - [`decode`] - charset detection and best-effort decoding
//! - [`validate`] - content-validity heuristic and verdicts
//! - [`fetcher`] - one HTTP GET per record
//! - [`pool`] - bounded concurrent fan-out over a batch

pub mod decode;
pub mod fetcher;
pub mod pool;
pub mod validate;

pub use fetcher::EndpointProbe;
pub use pool::{ConcurrentProber, ProbeResults};
pub use validate::{ContentValidator, FailReason, PassReason, Verdict};
