//! Application state shared by every handler.

use mirror_core::Config;
#[cfg(feature = "storage-local")]
use mirror_storage::LocalStorage;
use mirror_services::{Storage, StudentDetailService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub students: Arc<StudentDetailService>,
    pub storage: Arc<dyn Storage>,
    /// Set when the local backend is active; the `/files` route verifies
    /// signatures against it.
    #[cfg(feature = "storage-local")]
    pub local_files: Option<LocalStorage>,
}
