//! Mirror Core Library
//!
//! This crate provides the domain models, error types, configuration and clock
//! abstraction shared by every attachment-mirror component.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BaseConfig, CachePolicy, Config, MirrorServiceConfig, OriginCredentials, OriginOverrides,
    OriginSettings,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AttachmentBundle, AttachmentFieldSet, AttachmentTask, DownloadUrlMap, FieldResult,
    MirroredObject, StudentDetail, StudentRecord,
};
pub use storage_types::StorageBackend;
