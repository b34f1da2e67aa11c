//! Text encoding detection and document reading.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Text encodings tried when reading an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8, with or without a byte order mark
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// GBK (CP936); `gb2312` is accepted as an alias since GBK is its superset
    #[serde(rename = "gbk", alias = "gb2312")]
    Gbk,
    /// GB18030, the full Unicode mapping of the GB family
    #[serde(rename = "gb18030")]
    Gb18030,
    /// UTF-16 little endian (BOM required)
    #[serde(rename = "utf-16le")]
    Utf16Le,
    /// UTF-16 big endian (BOM required)
    #[serde(rename = "utf-16be")]
    Utf16Be,
    /// ISO-8859-1; never fails, so it only makes sense last
    #[serde(rename = "latin-1", alias = "latin1")]
    Latin1,
}

impl TextEncoding {
    /// Default decoding order.
    pub const DEFAULT_ORDER: [TextEncoding; 5] = [
        TextEncoding::Utf8,
        TextEncoding::Gbk,
        TextEncoding::Gb18030,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
    ];

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Gb18030 => "gb18030",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Decode bytes with this encoding, returning `None` on failure.
    pub fn decode(&self, data: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let body = data.strip_prefix(UTF8_BOM).unwrap_or(data);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            TextEncoding::Gbk => decode_strict(encoding_rs::GBK, data),
            TextEncoding::Gb18030 => decode_strict(encoding_rs::GB18030, data),
            TextEncoding::Utf16Le => {
                let body = data.strip_prefix(UTF16LE_BOM)?;
                decode_utf16(body, u16::from_le_bytes)
            }
            TextEncoding::Utf16Be => {
                let body = data.strip_prefix(UTF16BE_BOM)?;
                decode_utf16(body, u16::from_be_bytes)
            }
            TextEncoding::Latin1 => Some(data.iter().map(|&b| b as char).collect()),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Decode without replacement characters; any malformed sequence rejects the whole input.
fn decode_strict(encoding: &'static encoding_rs::Encoding, data: &[u8]) -> Option<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(data);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

fn decode_utf16(body: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if body.len() % 2 != 0 {
        return None;
    }
    let units = body.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<std::result::Result<String, _>>().ok()
}

/// Decode bytes by trying each encoding in order.
///
/// Returns the decoded text together with the encoding that succeeded,
/// or `None` if every encoding rejected the data.
pub fn decode_bytes(data: &[u8], encodings: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    encodings
        .iter()
        .find_map(|enc| enc.decode(data).map(|text| (text, *enc)))
}

/// Read a whole document as text.
///
/// # Returns
/// * `Ok((text, encoding))` on success
/// * `Err(Error::InputNotFound)` if the path does not exist
/// * `Err(Error::DecodeFailure)` if no encoding could decode the content
pub fn read_document<P: AsRef<Path>>(
    path: P,
    encodings: &[TextEncoding],
) -> Result<(String, TextEncoding)> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    let data = std::fs::read(path)?;
    decode_bytes(&data, encodings).ok_or_else(|| Error::DecodeFailure {
        path: path.to_path_buf(),
        tried: encodings
            .iter()
            .map(TextEncoding::label)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Check whether a path carries one of the selected extensions.
///
/// Comparison is case-insensitive and configured types may include a
/// leading dot (`".md"` and `"md"` are equivalent).
pub fn has_selected_extension<S: AsRef<str>>(path: &Path, file_types: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    file_types
        .iter()
        .any(|t| t.as_ref().trim().trim_start_matches('.').eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_decode_plain_utf8() {
        let (text, enc) = decode_bytes("├── a.py".as_bytes(), &TextEncoding::DEFAULT_ORDER).unwrap();
        assert_eq!(text, "├── a.py");
        assert_eq!(enc, TextEncoding::Utf8);
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"## src/a.py");
        let (text, _) = decode_bytes(&data, &TextEncoding::DEFAULT_ORDER).unwrap();
        assert_eq!(text, "## src/a.py");
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let mut data = UTF16LE_BOM.to_vec();
        for unit in "hi/".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, enc) = decode_bytes(&data, &TextEncoding::DEFAULT_ORDER).unwrap();
        assert_eq!(text, "hi/");
        assert_eq!(enc, TextEncoding::Utf16Le);
    }

    #[test]
    fn test_decode_gbk_after_utf8() {
        // "# 你好" in GBK
        let data = [0x23, 0x20, 0xC4, 0xE3, 0xBA, 0xC3];
        let (text, enc) = decode_bytes(&data, &TextEncoding::DEFAULT_ORDER).unwrap();
        assert_eq!(text, "# 你好");
        assert_eq!(enc, TextEncoding::Gbk);
    }

    #[test]
    fn test_gbk_rejects_malformed() {
        assert!(TextEncoding::Gbk.decode(&[0xC4, 0x20]).is_none());
        assert!(TextEncoding::Gb18030.decode(&[0xFF, 0xFE]).is_none());
    }

    #[test]
    fn test_utf16_requires_bom() {
        assert!(TextEncoding::Utf16Le.decode(&[0x68, 0x00]).is_none());
    }

    #[test]
    fn test_invalid_utf8_fails_without_latin1() {
        let data = [0x66, 0x6F, 0xE9, 0x20];
        assert!(decode_bytes(&data, &TextEncoding::DEFAULT_ORDER).is_none());

        let (text, enc) = decode_bytes(&data, &[TextEncoding::Utf8, TextEncoding::Latin1]).unwrap();
        assert_eq!(text, "foé ");
        assert_eq!(enc, TextEncoding::Latin1);
    }

    #[test]
    fn test_read_document_missing() {
        let result = read_document("/nonexistent/transcript.md", &TextEncoding::DEFAULT_ORDER);
        assert!(matches!(result, Err(Error::InputNotFound(_))));
    }

    #[test]
    fn test_has_selected_extension() {
        let types = ["md", ".TXT"];
        assert!(has_selected_extension(&PathBuf::from("chat.md"), &types));
        assert!(has_selected_extension(&PathBuf::from("chat.MD"), &types));
        assert!(has_selected_extension(&PathBuf::from("notes.txt"), &types));
        assert!(!has_selected_extension(&PathBuf::from("main.rs"), &types));
        assert!(!has_selected_extension(&PathBuf::from("README"), &types));
    }

    #[test]
    fn test_encoding_serde_labels() {
        let list: Vec<TextEncoding> = serde_json::from_str(r#"["utf-8", "gb2312", "latin-1"]"#).unwrap();
        assert_eq!(list, vec![TextEncoding::Utf8, TextEncoding::Gbk, TextEncoding::Latin1]);
    }
}
