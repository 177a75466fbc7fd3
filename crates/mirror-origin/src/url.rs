//! URL resolution for origin-supplied attachment paths.

use mirror_core::constants::ORIGIN_API_MARKER;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters a URL may not carry literally. Reserved characters and existing
/// escapes are left alone.
const URI_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'[')
    .add(b']');

/// Like [`URI_ENCODE`] but also escapes `%`, for input whose escapes could not
/// be trusted.
const URI_ENCODE_ALL: &AsciiSet = &URI_ENCODE.add(b'%');

/// Escapes that stay escaped when normalizing, since decoding them would change
/// the URL structure. `%25` is kept too: after decoding, every `%` left in the
/// string starts a valid escape and the re-encode pass leaves it alone.
const KEPT_ESCAPES: &[u8] = b";/?:@&=+$,#%";

/// Turn a possibly relative path into an absolute, safely escaped URL.
///
/// Existing escapes are normalized (decoded then re-encoded). Input with
/// malformed escapes is encoded as-is instead. Blank input yields an empty
/// string.
pub fn to_absolute_url(base_url: &str, path: &str) -> String {
    let raw = path.trim();
    if raw.is_empty() {
        return String::new();
    }

    let absolute = if is_absolute(raw) {
        raw.to_string()
    } else if raw.starts_with('/') {
        format!("{}{}", base_url, raw)
    } else {
        format!("{}/{}", base_url, raw)
    };

    match decode_uri(&absolute) {
        Some(decoded) => utf8_percent_encode(&decoded, URI_ENCODE).to_string(),
        None => utf8_percent_encode(&absolute, URI_ENCODE_ALL).to_string(),
    }
}

/// Base address observed in a response URL, falling back to `configured_base`.
///
/// When the observed URL contains the API marker (`/api/`) after at least one
/// character, everything before it becomes the base for the rest of the request.
pub fn resolve_effective_base(configured_base: &str, observed_url: &str) -> String {
    let raw = observed_url.trim();
    match raw.find(ORIGIN_API_MARKER) {
        Some(idx) if idx > 0 => raw[..idx].trim_end_matches('/').to_string(),
        _ => configured_base.to_string(),
    }
}

/// The `http://` variant of an `https://` URL.
pub fn downgrade_to_http(url: &str) -> Option<String> {
    let scheme = url.get(..8)?;
    if scheme.eq_ignore_ascii_case("https://") {
        Some(format!("http://{}", &url[8..]))
    } else {
        None
    }
}

pub(crate) fn is_https(url: &str) -> bool {
    url.get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
}

fn is_absolute(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Decode percent escapes except reserved ones and `%25`. `None` on a malformed escape
/// or when the decoded bytes are not UTF-8.
fn decode_uri(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let hi = hex_value(*bytes.get(i + 1)?)?;
        let lo = hex_value(*bytes.get(i + 2)?)?;
        let decoded = (hi << 4) | lo;
        if KEPT_ESCAPES.contains(&decoded) {
            out.extend_from_slice(&bytes[i..i + 3]);
        } else {
            out.push(decoded);
        }
        i += 3;
    }

    String::from_utf8(out).ok()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
