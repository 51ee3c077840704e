//! Remote data: catalog search, downloads and per-collection runs.

pub mod catalog;
pub mod client;
pub mod collection;
pub mod download;
pub mod grid;

#[cfg(test)]
pub(crate) mod test_server;

pub use catalog::{CatalogClient, GranulePage};
pub use client::HttpClient;
pub use collection::{select_granules, CollectionOutput, CollectionRunner, CollectionSummary};
pub use download::{download_with_skip, has_content, DownloadStatus};
pub use grid::{GridDownloader, GridSummary};
