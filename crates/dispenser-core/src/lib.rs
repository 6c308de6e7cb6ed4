//! Dispenser Core Library
//!
//! This crate reads rowlike data from anywhere as one lazy stream of ordered
//! records:
//! - Files, glob patterns, open readers, URLs and inline text
//! - Document collections and in-memory values
//! - CSV, JSON, YAML, pickle, XML, spreadsheets and Python literals
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Reference  │────▶│  Classify   │────▶│   Targets   │────▶│   Detect    │
//! │             │     │  + Resolve  │     │  (ordered)  │     │   format    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────▼──────┐
//! │   Records   │◀────│   Concat    │◀────│    Limit    │◀────│   Decoder   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dispenser_core::{Source, SourceOptions};
//!
//! let options = SourceOptions::default().with_limit(100);
//! for record in Source::with_options("exports/*.csv", options)? {
//!     let record = record?;
//!     println!("{}", serde_json::to_string(&record)?);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod collection;
pub mod concat;
pub mod decoders;
pub mod error;
mod fetch;
pub mod format;
pub mod limit;
pub mod record;
pub mod source;
pub mod target;

pub use classify::{Reference, SourceKind, classify, resolve};
pub use collection::{Collection, MemoryCollection};
pub use error::{BoxError, Error, Result};
pub use format::{FormatTag, detect, sniff};
pub use record::Record;
pub use source::{CsvOptions, Records, Source, SourceOptions};
pub use target::{Target, TargetList};
