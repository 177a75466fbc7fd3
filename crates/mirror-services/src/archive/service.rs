use anyhow::{Context, Result};
use mirror_storage::Storage;
use std::io::Write;
use std::path::Path;

/// One file to place in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name inside the archive, reduced to a single path component.
    pub name: String,
    pub object_id: String,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_id: object_id.into(),
        }
    }
}

/// ZIP bytes and the number of entries written.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub data: Vec<u8>,
    pub file_count: usize,
}

/// Reduce an entry name to its base name so it cannot escape the extraction
/// directory.
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Download `entries` from `storage` and pack them into a DEFLATE ZIP.
///
/// Objects that cannot be downloaded are skipped with a warning; the returned
/// `file_count` says how many made it in.
pub async fn create_zip_archive(
    storage: &dyn Storage,
    entries: Vec<ArchiveEntry>,
) -> Result<BuiltArchive> {
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let mut files = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match storage.download(&entry.object_id).await {
            Ok(data) => {
                let name = sanitize_archive_filename(&entry.name, &format!("unnamed_{}", index));
                files.push((name, data));
            }
            Err(e) => {
                tracing::warn!(
                    object_id = %entry.object_id,
                    error = %e,
                    "Skipping attachment that could not be downloaded"
                );
            }
        }
    }

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, data) in &files {
            zip.start_file(name.as_str(), options)
                .with_context(|| format!("Failed to add file to ZIP: {}", name))?;
            zip.write_all(data)
                .with_context(|| format!("Failed to write file data to ZIP: {}", name))?;
        }

        zip.finish().context("Failed to finalize ZIP archive")?;
    }

    Ok(BuiltArchive {
        data: buffer,
        file_count: files.len(),
    })
}
