//! CLI command handlers.

mod checksum;
mod download;

pub use checksum::run_checksum;
pub use download::{run_download, DownloadArgs};

#[cfg(test)]
pub(crate) use download::default_file_name;
