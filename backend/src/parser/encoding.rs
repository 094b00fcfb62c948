//! Encoding candidates: label resolution, detection and strict decoding.

use encoding_rs::{Encoding, UTF_8};

use crate::error::{LoadError, LoadResult};

/// Label that asks for byte-level detection instead of a fixed encoding.
pub const AUTO_LABEL: &str = "auto";

/// One entry of the candidate list, resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Candidate {
    Fixed(&'static Encoding),
    Auto,
}

impl Candidate {
    /// The concrete encoding for these bytes.
    pub fn encoding_for(&self, bytes: &[u8]) -> &'static Encoding {
        match self {
            Candidate::Fixed(encoding) => encoding,
            Candidate::Auto => detect_encoding(bytes),
        }
    }
}

/// Resolve a user-facing label (`utf-8`, `cp949`, `euc-kr`, `auto`, ...).
///
/// Labels follow the WHATWG set known to `encoding_rs`, plus the Windows
/// code page names people actually type.
pub fn resolve_label(label: &str) -> LoadResult<Candidate> {
    let normalized = label.trim().to_ascii_lowercase();
    if normalized == AUTO_LABEL {
        return Ok(Candidate::Auto);
    }

    let canonical = match normalized.as_str() {
        "cp949" | "ms949" | "uhc" => "windows-949",
        "cp1252" => "windows-1252",
        "latin-1" => "latin1",
        other => other,
    };

    Encoding::for_label(canonical.as_bytes())
        .map(Candidate::Fixed)
        .ok_or_else(|| LoadError::UnknownEncoding(label.to_string()))
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    let label = match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "cp949" | "uhc" | "euc-kr" => "euc-kr".to_string(),
        other => other.to_string(),
    };

    Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8)
}

/// Decode without replacement characters.
///
/// Returns `None` when the bytes are malformed for `encoding`. A BOM that
/// belongs to `encoding` is stripped; a foreign BOM is left in place and
/// will usually make the decode fail.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{EUC_KR, WINDOWS_1252};

    #[test]
    fn test_resolve_labels() {
        assert_eq!(resolve_label("UTF-8").unwrap(), Candidate::Fixed(UTF_8));
        assert_eq!(resolve_label("cp949").unwrap(), Candidate::Fixed(EUC_KR));
        assert_eq!(resolve_label("euc-kr").unwrap(), Candidate::Fixed(EUC_KR));
        assert_eq!(resolve_label("cp1252").unwrap(), Candidate::Fixed(WINDOWS_1252));
        assert_eq!(resolve_label(" auto ").unwrap(), Candidate::Auto);
    }

    #[test]
    fn test_unknown_label() {
        let err = resolve_label("ebcdic-klingon").unwrap_err();
        assert!(matches!(err, LoadError::UnknownEncoding(ref l) if l == "ebcdic-klingon"));
    }

    #[test]
    fn test_strict_decode_rejects_foreign_bytes() {
        let (korean, _, _) = EUC_KR.encode("날짜,평균기온");
        assert!(decode_strict(&korean, UTF_8).is_none());
        assert_eq!(decode_strict(&korean, EUC_KR).unwrap(), "날짜,평균기온");
    }

    #[test]
    fn test_strict_decode_strips_own_bom() {
        let bytes = b"\xEF\xBB\xBFyear,value";
        assert_eq!(decode_strict(bytes, UTF_8).unwrap(), "year,value");
    }

    #[test]
    fn test_detect_ascii_as_utf8() {
        assert_eq!(detect_encoding(b"year,value\n2000,1.5\n"), UTF_8);
    }
}
