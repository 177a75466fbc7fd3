//! Mirror Services Layer
//!
//! Business services of the attachment mirror: the two TTL caches, the bounded
//! mirror orchestrator, and the student detail and bundle services built on
//! top of them. HTTP handling stays in `mirror-api`.

pub mod archive;
pub mod cache;
pub mod detail;
pub mod mirror;

pub use archive::{create_zip_archive, ArchiveEntry, BuiltArchive};
pub use cache::{CacheEntry, FileIdentityCache, MirrorCaches, TemporaryUrlCache, TtlCache};
pub use detail::StudentDetailService;
pub use mirror::{run_bounded, AttachmentMirror, MirrorError, MirrorRequest};
pub use mirror_storage::{create_storage, Storage, StorageBackend, StorageError};
