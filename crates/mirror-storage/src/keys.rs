//! Content-addressed key generation for mirrored attachments.
//!
//! Key format: `{prefix}/{record_id}/{field}_{hash16}{ext}` where `hash16` is the
//! first 16 hex characters of the MD5 digest of the source URL. The same source
//! URL therefore always lands on the same key for a given record and field, so
//! re-uploads overwrite instead of accumulating copies.

const UNKNOWN_SEGMENT: &str = "unknown";
const FALLBACK_EXTENSION: &str = ".bin";
const HASH_LEN: usize = 16;
const MAX_EXTENSION_LEN: usize = 10;

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
///
/// An empty input becomes `unknown`.
pub fn sanitize_segment(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        UNKNOWN_SEGMENT.to_string()
    } else {
        sanitized
    }
}

/// First 16 hex characters of the MD5 digest of `source_url`.
pub fn content_hash(source_url: &str) -> String {
    let digest = md5::compute(source_url.as_bytes());
    let mut hash = hex::encode(digest.0);
    hash.truncate(HASH_LEN);
    hash
}

/// Lowercased extension (with the leading dot) of the URL path, if it has one.
///
/// Query string and fragment are ignored, as is the host of an absolute URL.
pub fn extension_from_url(source_url: &str) -> Option<String> {
    let without_query = source_url
        .split(['?', '#'])
        .next()
        .unwrap_or(source_url);

    let path = match without_query.find("://") {
        Some(idx) => {
            let after_scheme = &without_query[idx + 3..];
            after_scheme.find('/').map(|p| &after_scheme[p..]).unwrap_or("")
        }
        None => without_query,
    };

    let file_name = path.rsplit('/').next().unwrap_or(path);
    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }

    let ext = &file_name[dot + 1..];
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Extension implied by a response content type.
pub fn extension_from_content_type(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("png") {
        ".png"
    } else if ct.contains("jpeg") || ct.contains("jpg") {
        ".jpg"
    } else if ct.contains("webp") {
        ".webp"
    } else if ct.contains("gif") {
        ".gif"
    } else if ct.contains("pdf") {
        ".pdf"
    } else {
        FALLBACK_EXTENSION
    }
}

/// Extension for a mirrored object: URL path first, then content type, then `.bin`.
pub fn infer_extension(source_url: &str, content_type: Option<&str>) -> String {
    extension_from_url(source_url).unwrap_or_else(|| {
        content_type
            .map(extension_from_content_type)
            .unwrap_or(FALLBACK_EXTENSION)
            .to_string()
    })
}

/// Deterministic storage key for a mirrored attachment.
pub fn mirror_storage_key(
    prefix: &str,
    record_id: &str,
    field_name: &str,
    source_url: &str,
    extension: &str,
) -> String {
    let prefix = prefix.trim_matches('/');
    let name = format!(
        "{}/{}_{}{}",
        sanitize_segment(record_id),
        sanitize_segment(field_name),
        content_hash(source_url),
        extension
    );
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Extension (with the dot) of a storage key or object id, if any.
pub fn key_extension(key: &str) -> Option<&str> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name.rfind('.').filter(|&i| i > 0).map(|i| &file_name[i..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_segment("42"), "42");
        assert_eq!(sanitize_segment("a b/c.d"), "a_b_c_d");
        assert_eq!(sanitize_segment("id_card-front"), "id_card-front");
        assert_eq!(sanitize_segment("张三"), "__");
        assert_eq!(sanitize_segment(""), "unknown");
    }

    #[test]
    fn content_hash_is_16_hex_chars() {
        let hash = content_hash("https://origin.example.com/files/a.jpg");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(content_hash(""), "d41d8cd98f00b204");
    }

    #[test]
    fn extension_from_path_ignores_query_and_host() {
        assert_eq!(
            extension_from_url("https://h.example.com/files/A.JPG?token=x.png"),
            Some(".jpg".to_string())
        );
        assert_eq!(extension_from_url("https://h.example.com"), None);
        assert_eq!(extension_from_url("https://h.example.com/files/raw"), None);
        assert_eq!(extension_from_url("/files/.hidden"), None);
        assert_eq!(extension_from_url("/files/doc.pdf#page=2"), Some(".pdf".to_string()));
    }

    #[test]
    fn extension_falls_back_to_content_type() {
        assert_eq!(infer_extension("/files/raw", Some("image/png")), ".png");
        assert_eq!(infer_extension("/files/raw", Some("image/JPEG")), ".jpg");
        assert_eq!(infer_extension("/files/raw", Some("image/webp")), ".webp");
        assert_eq!(infer_extension("/files/raw", Some("image/gif")), ".gif");
        assert_eq!(infer_extension("/files/raw", Some("application/pdf")), ".pdf");
        assert_eq!(infer_extension("/files/raw", Some("text/plain")), ".bin");
        assert_eq!(infer_extension("/files/raw", None), ".bin");
        assert_eq!(infer_extension("/files/a.jpeg", Some("image/png")), ".jpeg");
    }

    #[test]
    fn same_inputs_give_same_key() {
        let a = mirror_storage_key("origin-sync/preview", "42", "photo_path", "/files/a.jpg", ".jpg");
        let b = mirror_storage_key("origin-sync/preview", "42", "photo_path", "/files/a.jpg", ".jpg");
        assert_eq!(a, b);
        assert_eq!(
            a,
            format!("origin-sync/preview/42/photo_path_{}.jpg", content_hash("/files/a.jpg"))
        );
    }

    #[test]
    fn different_sources_give_different_keys() {
        let a = mirror_storage_key("p", "42", "photo_path", "/files/a.jpg", ".jpg");
        let b = mirror_storage_key("p", "42", "photo_path", "/files/b.jpg", ".jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn key_sanitizes_record_and_field() {
        let key = mirror_storage_key("/p/", "", "photo path", "/x", ".bin");
        assert!(key.starts_with("p/unknown/photo_path_"));
    }

    #[test]
    fn key_extension_reads_last_segment() {
        assert_eq!(key_extension("p/42/photo_path_abc.jpg"), Some(".jpg"));
        assert_eq!(key_extension("local://objects/p/42/photo_path_abc.pdf"), Some(".pdf"));
        assert_eq!(key_extension("p/4.2/raw"), None);
    }
}
