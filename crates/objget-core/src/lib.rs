//! Chunked, windowed download of objects from a B2-style storage service.
//!
//! [`Transferer`] fetches an object (or a byte range of it) window by window,
//! validates each window's length and SHA-1, retries failed windows, and
//! writes through positional I/O into a [`dest::DownloadDest`].

pub mod checksum;
pub mod config;
pub mod dest;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod progress;
pub mod range;
pub mod retry;
pub mod strategy;
pub mod transferer;
pub mod transport;

pub use error::TransferError;
pub use metadata::ObjectMetadata;
pub use range::ByteRange;
pub use transferer::{TransferOptions, Transferer};
