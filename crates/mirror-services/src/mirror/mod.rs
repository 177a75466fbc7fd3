//! Bounded attachment mirroring
//!
//! [`AttachmentMirror`] copies a record's attachments from the origin into
//! managed storage through a fixed-size worker pool ([`run_bounded`]) and
//! returns temporary URLs for the ones that made it.

mod error;
mod orchestrator;
mod pool;

pub use error::MirrorError;
pub use orchestrator::{AttachmentMirror, MirrorRequest};
pub use pool::run_bounded;
