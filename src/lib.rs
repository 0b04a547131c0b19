//! returnscan: merge simplex front/back scans into duplex PDFs.
//!
//! A scanner with a single-sided feeder produces two files for a two-sided
//! stack: the fronts in order, then the backs in reverse order after the
//! stack is flipped. returnscan polls a directory, pairs such files by
//! modification time and page count, interleaves their pages, fixes each
//! page's orientation with an external OSD engine and disposes of the
//! inputs.
//!
//! The building blocks are usable on their own:
//!
//! - [`pairing`] finds an eligible pair in a directory snapshot
//! - [`merge`] interleaves and rotates pages into a new document
//! - [`osd`] renders pages and detects their orientation
//! - [`watch`] drives the poll loop

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod merge;
pub mod osd;
pub mod pairing;
pub mod utils;
pub mod watch;

pub use config::Config;
pub use error::{Result, ReturnScanError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
