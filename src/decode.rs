//! Container decoder: rack file bytes to XML text.
//!
//! Rack presets are gzip-compressed UTF-8 XML. Decoding is all-or-nothing
//! and side-effect free; every failure carries the source reference so the
//! caller can report it.

use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{source_file:?} is not a gzip container")]
    NotCompressed { source_file: PathBuf },

    #[error("{source_file:?}: corrupt or truncated compressed stream: {message}")]
    BadStream {
        source_file: PathBuf,
        message: String,
    },

    #[error("{source_file:?}: decompressed content is not valid UTF-8 text")]
    NotText { source_file: PathBuf },

    #[error("failed to read {source_file:?}: {source}")]
    Io {
        source_file: PathBuf,
        source: std::io::Error,
    },
}

/// Read and decode a rack file from disk.
pub fn decode_rack_file(path: &Path) -> Result<String, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        source_file: path.to_path_buf(),
        source,
    })?;
    decode_rack_bytes(&bytes, path)
}

/// Decode in-memory rack file bytes. `source` is only used for error
/// reporting.
pub fn decode_rack_bytes(bytes: &[u8], source: &Path) -> Result<String, DecodeError> {
    if bytes.len() < GZIP_MAGIC.len() || bytes[..2] != GZIP_MAGIC {
        return Err(DecodeError::NotCompressed {
            source_file: source.to_path_buf(),
        });
    }

    let mut decoder = GzDecoder::new(bytes);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::BadStream {
            source_file: source.to_path_buf(),
            message: e.to_string(),
        })?;

    String::from_utf8(decompressed).map_err(|_| DecodeError::NotText {
        source_file: source.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    fn gz(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_round_trips_xml_text() {
        let xml = "<Root><Chain/></Root>";
        let decoded = decode_rack_bytes(&gz(xml.as_bytes()), Path::new("a.adg")).unwrap();
        assert_eq!(decoded, xml);
    }

    #[test]
    fn test_rejects_plain_bytes() {
        let err = decode_rack_bytes(b"<Root/>", Path::new("plain.adg")).unwrap_err();
        assert!(matches!(err, DecodeError::NotCompressed { .. }));
    }

    #[test]
    fn test_rejects_empty_input() {
        let err = decode_rack_bytes(b"", Path::new("empty.adg")).unwrap_err();
        assert!(matches!(err, DecodeError::NotCompressed { .. }));
    }

    #[test]
    fn test_rejects_truncated_stream() {
        let mut bytes = gz(b"<Root><Chain/></Root>");
        bytes.truncate(bytes.len() - 6);
        let err = decode_rack_bytes(&bytes, Path::new("cut.adg")).unwrap_err();
        assert!(matches!(err, DecodeError::BadStream { .. }));
    }

    #[test]
    fn test_rejects_non_utf8_payload() {
        let err =
            decode_rack_bytes(&gz(&[0xff, 0xfe, 0x00, 0x80]), Path::new("bin.adg")).unwrap_err();
        assert!(matches!(err, DecodeError::NotText { .. }));
    }

    #[test]
    fn test_error_carries_source_reference() {
        let err = decode_rack_bytes(b"junk", Path::new("some/file.adg")).unwrap_err();
        assert!(err.to_string().contains("file.adg"));
    }
}
