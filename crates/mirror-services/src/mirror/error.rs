use mirror_origin::FetchError;
use mirror_storage::StorageError;
use thiserror::Error;

/// Why a single attachment could not be mirrored.
///
/// Contained by the orchestrator: the field is logged and left out of the
/// result, sibling fields are unaffected.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("origin returned HTTP {0}")]
    Status(u16),

    #[error("origin returned an empty file")]
    EmptyContent,

    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("storage returned an empty object id")]
    EmptyObjectId,
}
