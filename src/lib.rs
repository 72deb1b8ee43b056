//! # YDF Reader for Rust
//!
//! A pure Rust decoder for YDF biosignal recordings: a 128-byte ASCII main header,
//! one fixed-width sub-header per channel and per event list entry, a block of
//! interleaved little-endian 16-bit samples, and JSON event payloads stored at the very
//! end of the file.
//!
//! ## Quick Start
//!
//! ```rust
//! use ydfread::{YdfReader, Result};
//!
//! fn main() -> Result<()> {
//!     # ydfread::doctest_utils::create_simple_test_file("quickstart.ydf")?;
//!     // Opening decodes every header; samples and events stay on disk
//!     let mut reader = YdfReader::open("quickstart.ydf")?;
//!
//!     let header = reader.header();
//!     println!("Version: {}", header.version);
//!     println!("Channels: {}, events: {}", header.channel_count(), header.event_count());
//!     println!("Header size: {} bytes", reader.size_of_header());
//!
//!     // Pull every data record into the channels
//!     reader.load_signals()?;
//!     for channel in reader.channels() {
//!         println!("{}: {} samples ({})",
//!             channel.label, channel.physical_values.len(), channel.physical_dimension);
//!     }
//!
//!     // Parse the JSON payload of every event
//!     reader.load_events()?;
//!     for event in reader.events() {
//!         println!("{}: {:?}", event.label, event.payload);
//!     }
//!     # drop(reader);
//!     # std::fs::remove_file("quickstart.ydf").ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Physical vs Digital Values
//!
//! Samples are stored as 16-bit integers. Each channel maps its digital range linearly
//! onto its physical range:
//!
//! ```rust
//! use ydfread::ChannelDescriptor;
//!
//! let channel = ChannelDescriptor {
//!     physical_minimum: -100.0,
//!     physical_maximum: 100.0,
//!     digital_minimum: -32768,
//!     digital_maximum: 32767,
//!     ..Default::default()
//! };
//! assert!((channel.to_physical(16384) - 50.0).abs() < 0.01);
//! ```

pub mod error;
pub mod types;
pub mod utils;
pub mod layout;
pub mod reader;

#[doc(hidden)]
pub mod doctest_utils; // For internal doctest support

// Re-export main types for convenience
pub use error::{YdfError, Result};
pub use types::{HeaderRecord, ChannelDescriptor, EventDescriptor};
pub use layout::{
    FieldSpec, FieldValue, Transform, CHANNEL_RECORD_SIZE, EVENT_RECORD_SIZE, HEADER_SIZE, SAMPLE_SIZE,
};
pub use reader::YdfReader;

/// Library version
///
/// ```rust
/// let version = ydfread::version();
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
