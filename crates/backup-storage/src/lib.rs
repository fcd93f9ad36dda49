//! Backup Storage - Object store destination adapters
//!
//! Implements the `Blob` port against concrete object stores:
//! - [`s3::S3Blob`] - primary destination, backed by `aws-sdk-s3`
//! - [`azure::AzureBlobDest`] - secondary destination, backed by a
//!   minimal Shared-Key-signed REST client

pub mod azure;
pub mod s3;

pub use azure::AzureBlobDest;
pub use s3::S3Blob;
