//! Mirror Storage Library
//!
//! Managed object storage for mirrored attachments: the `Storage` trait, an S3
//! backend and a local filesystem backend with signed temporary URLs.
//!
//! # Object identifiers
//!
//! Uploads return an object identifier made of the backend root and the storage
//! key:
//!
//! - **S3**: `s3://{bucket}/{key}`
//! - **Local**: `local://objects/{key}`
//!
//! A record value that starts with the backend root already lives in managed
//! storage and is never mirrored again.
//!
//! # Storage key format
//!
//! Mirrored attachments are content addressed:
//! `{prefix}/{record_id}/{field}_{hash16}{ext}`. Key generation lives in the
//! `keys` module so every caller derives the same path for the same source URL.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(feature = "storage-local")]
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use mirror_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
#[cfg(feature = "storage-local")]
pub use signing::UrlSigner;
pub use traits::{Storage, StorageError, StorageResult, TemporaryUrl, TemporaryUrlRequest};
