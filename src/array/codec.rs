//! Zarr codecs.
//!
//! Array chunks are encoded using a sequence of codecs: an array to bytes
//! codec (`bytes`, little endian) optionally followed by a bytes to bytes
//! compression codec (`zstd`). A [`CodecChain`] validates the sequence at
//! metadata parse time and reduces it to the decode transform to apply to
//! each fetched chunk.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#id18>.

use serde::Deserialize;
use thiserror::Error;

use crate::{metadata::Metadata, storage::Bytes};

/// The decode transform of a codec chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecKind {
    /// Chunk payloads are stored as raw little endian bytes.
    Identity,
    /// Chunk payloads are zstd compressed little endian bytes.
    Zstd,
}

/// A codec chain reduced from the `codecs` list of array metadata.
#[derive(Clone, Debug)]
pub struct CodecChain {
    kind: CodecKind,
}

/// The endianness of the `bytes` codec.
#[derive(Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Endianness {
    Little,
    Big,
}

/// Configuration of the `bytes` codec.
#[derive(Deserialize, Clone, Debug)]
struct BytesCodecConfiguration {
    #[serde(default)]
    endian: Option<Endianness>,
}

impl CodecChain {
    /// Create a codec chain from the `codecs` list of array metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the list holds an unrecognised codec, big
    /// endian data, or codecs in an unsupported order.
    pub fn from_metadata(metadatas: &[Metadata]) -> Result<Self, CodecError> {
        let mut bytes_seen = false;
        let mut kind = CodecKind::Identity;
        for metadata in metadatas {
            match metadata.name() {
                "bytes" => {
                    if bytes_seen {
                        return Err(CodecError::from("duplicate bytes codec"));
                    }
                    if kind != CodecKind::Identity {
                        return Err(CodecError::from(
                            "the bytes codec must precede compression codecs",
                        ));
                    }
                    bytes_seen = true;
                    if !metadata.configuration_is_none_or_empty() {
                        let configuration: BytesCodecConfiguration = metadata
                            .to_configuration()
                            .map_err(|err| CodecError::from(err.to_string()))?;
                        if configuration.endian == Some(Endianness::Big) {
                            return Err(CodecError::UnsupportedEndianness("big".to_string()));
                        }
                    }
                }
                "zstd" => {
                    if !bytes_seen {
                        return Err(CodecError::from(
                            "the bytes codec must precede the zstd codec",
                        ));
                    }
                    if kind != CodecKind::Identity {
                        return Err(CodecError::from("duplicate compression codec"));
                    }
                    kind = CodecKind::Zstd;
                }
                name => return Err(CodecError::UnsupportedCodec(name.to_string())),
            }
        }
        if !bytes_seen {
            return Err(CodecError::from("the codec chain is missing a bytes codec"));
        }
        Ok(Self { kind })
    }

    /// Returns the decode transform of the chain.
    #[must_use]
    pub const fn kind(&self) -> CodecKind {
        self.kind
    }

    /// Decode an encoded chunk payload.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if decompression fails.
    pub fn decode(&self, encoded: Bytes) -> Result<Bytes, CodecError> {
        match self.kind {
            CodecKind::Identity => Ok(encoded),
            CodecKind::Zstd => zstd::decode_all(encoded.as_ref())
                .map(Bytes::from)
                .map_err(CodecError::IOError),
        }
    }
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The codec is not supported.
    #[error("unsupported codec {_0}")]
    UnsupportedCodec(String),
    /// The endianness is not supported.
    #[error("unsupported endianness {_0}, chunks must be little endian")]
    UnsupportedEndianness(String),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadatas(json: &str) -> Vec<Metadata> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn codec_chain_bytes_zstd() {
        let chain = CodecChain::from_metadata(&metadatas(
            r#"[
                {"name": "bytes", "configuration": {"endian": "little"}},
                {"name": "zstd", "configuration": {"level": 3, "checksum": false}}
            ]"#,
        ))
        .unwrap();
        assert_eq!(chain.kind(), CodecKind::Zstd);
    }

    #[test]
    fn codec_chain_bytes_only() {
        let chain = CodecChain::from_metadata(&metadatas(r#"["bytes"]"#)).unwrap();
        assert_eq!(chain.kind(), CodecKind::Identity);
    }

    #[test]
    fn codec_chain_big_endian() {
        let err = CodecChain::from_metadata(&metadatas(
            r#"[{"name": "bytes", "configuration": {"endian": "big"}}]"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedEndianness(_)));
    }

    #[test]
    fn codec_chain_unsupported_codec() {
        let err = CodecChain::from_metadata(&metadatas(
            r#"["bytes", {"name": "gzip", "configuration": {"level": 1}}]"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedCodec(name) if name == "gzip"));
    }

    #[test]
    fn codec_chain_invalid_order() {
        assert!(CodecChain::from_metadata(&metadatas(
            r#"[{"name": "zstd", "configuration": {"level": 3, "checksum": false}}, "bytes"]"#,
        ))
        .is_err());
    }

    #[test]
    fn codec_chain_missing_bytes() {
        let err = CodecChain::from_metadata(&metadatas(r#"[]"#)).unwrap_err();
        assert!(matches!(err, CodecError::Other(msg) if msg.contains("missing a bytes codec")));
    }

    #[test]
    fn codec_chain_decode_zstd() {
        let chain = CodecChain::from_metadata(&metadatas(r#"["bytes", "zstd"]"#)).unwrap();
        let decoded: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 8];
        let encoded = zstd::encode_all(decoded, 3).unwrap();
        assert_eq!(chain.decode(Bytes::from(encoded)).unwrap().as_ref(), decoded);

        assert!(chain.decode(Bytes::from_static(&[0xde, 0xad])).is_err());
    }

    #[test]
    fn codec_chain_decode_identity() {
        let chain = CodecChain::from_metadata(&metadatas(r#"["bytes"]"#)).unwrap();
        let decoded = Bytes::from_static(&[1, 2, 3]);
        assert_eq!(chain.decode(decoded.clone()).unwrap(), decoded);
    }
}
