//! File input and output
//!
//! Records come in as JSON arrays from an input directory and leave as one
//! JSON file (or a set of slices) per bucket.

pub mod loader;
pub mod writer;

pub use loader::{LoadedSources, SourceLoader};
pub use writer::{slice_plan, BucketWriter};
