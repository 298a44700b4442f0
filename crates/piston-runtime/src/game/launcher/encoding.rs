//! Decoding of game output whose encoding isn't known up front.
//!
//! Older game versions and some JVMs write console output in the platform's
//! legacy code page (GBK, Shift_JIS, windows-1252...) rather than UTF-8.

use encoding_rs::{Encoding, UTF_8};

pub trait EncodingDetector: Send + Sync {
    /// Best guess for `bytes`, `None` when nothing can be told
    fn guess(&self, bytes: &[u8]) -> Option<&'static Encoding>;

    fn decode(&self, bytes: &[u8], encoding: &'static Encoding) -> String {
        let (text, _, _) = encoding.decode(bytes);
        text.into_owned()
    }
}

/// BOM sniffing then UTF-8 validation. Anything else is left to the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncodingDetector;

impl EncodingDetector for DefaultEncodingDetector {
    fn guess(&self, bytes: &[u8]) -> Option<&'static Encoding> {
        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return Some(encoding);
        }
        match std::str::from_utf8(bytes) {
            Ok(_) => Some(UTF_8),
            // A multi-byte sequence cut at the chunk boundary is still UTF-8
            Err(e) if e.error_len().is_none() => Some(UTF_8),
            Err(_) => None,
        }
    }
}

/// Resolve a WHATWG label, falling back to UTF-8 for unknown labels
pub fn encoding_for_label(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        log::warn!("Unknown fallback encoding {:?}, using UTF-8", label);
        UTF_8
    })
}

/// Decode a chunk with the detector's guess, or `fallback` when it has none
pub fn decode_chunk(detector: &dyn EncodingDetector, bytes: &[u8], fallback: &'static Encoding) -> String {
    let encoding = detector.guess(bytes).unwrap_or(fallback);
    detector.decode(bytes, encoding)
}
