//! Decoding of little endian chunk payloads into typed elements.

use thiserror::Error;

use crate::array::data_type::DataType;

use std::ops::Range;

/// An element decode error.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decoded chunk holds fewer bytes than the requested elements.
    #[error("decoded chunk has {actual} bytes, expected at least {expected}")]
    ShortBuffer {
        /// Bytes required to cover the requested elements.
        expected: u64,
        /// Bytes present in the decoded chunk.
        actual: u64,
    },
    /// A code unit is not a valid Unicode scalar value.
    #[error("invalid code point {_0:#x}")]
    InvalidCodePoint(u32),
    /// The element type does not match the array data type.
    #[error("data type {_0} cannot be decoded into the requested element type")]
    IncompatibleElementType(String),
}

/// Decoding of typed elements from the decoded payload of a chunk.
pub trait ElementDecode: Sized {
    /// Decode the elements `within` a decoded chunk payload.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the payload holds fewer bytes than the
    /// requested elements, a payload value is invalid, or `data_type` is
    /// incompatible with `Self`.
    fn decode_range(
        data_type: &DataType,
        bytes: &[u8],
        within: &Range<u64>,
    ) -> Result<Vec<Self>, DecodeError>;
}

/// Bounds check `within` against the payload and return its byte range.
fn element_bytes<'a>(
    bytes: &'a [u8],
    within: &Range<u64>,
    element_size: u64,
) -> Result<&'a [u8], DecodeError> {
    if within.start >= within.end {
        return Ok(&[]);
    }
    let expected = within.end.saturating_mul(element_size);
    let actual = bytes.len() as u64;
    if actual < expected {
        return Err(DecodeError::ShortBuffer { expected, actual });
    }
    let start = usize::try_from(within.start * element_size).unwrap();
    let end = usize::try_from(expected).unwrap();
    Ok(&bytes[start..end])
}

impl ElementDecode for f64 {
    fn decode_range(
        data_type: &DataType,
        bytes: &[u8],
        within: &Range<u64>,
    ) -> Result<Vec<Self>, DecodeError> {
        if *data_type != DataType::Float64 {
            return Err(DecodeError::IncompatibleElementType(data_type.name()));
        }
        let bytes = element_bytes(bytes, within, 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|element| {
                let mut le = [0u8; 8];
                le.copy_from_slice(element);
                f64::from_le_bytes(le)
            })
            .collect())
    }
}

impl ElementDecode for i64 {
    fn decode_range(
        data_type: &DataType,
        bytes: &[u8],
        within: &Range<u64>,
    ) -> Result<Vec<Self>, DecodeError> {
        if *data_type != DataType::Int64 {
            return Err(DecodeError::IncompatibleElementType(data_type.name()));
        }
        let bytes = element_bytes(bytes, within, 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|element| {
                let mut le = [0u8; 8];
                le.copy_from_slice(element);
                i64::from_le_bytes(le)
            })
            .collect())
    }
}

impl ElementDecode for String {
    fn decode_range(
        data_type: &DataType,
        bytes: &[u8],
        within: &Range<u64>,
    ) -> Result<Vec<Self>, DecodeError> {
        let DataType::FixedUnicode { code_units } = data_type else {
            return Err(DecodeError::IncompatibleElementType(data_type.name()));
        };
        let element_size = u64::from(code_units.get()) * 4;
        let bytes = element_bytes(bytes, within, element_size)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let element_size = usize::try_from(element_size).unwrap();
        let mut elements = Vec::with_capacity(bytes.len() / element_size);
        for element in bytes.chunks_exact(element_size) {
            let mut string = String::new();
            for unit in element.chunks_exact(4) {
                let mut le = [0u8; 4];
                le.copy_from_slice(unit);
                let code = u32::from_le_bytes(le);
                // zero code units are padding, skipped wherever they occur
                if code == 0 {
                    continue;
                }
                let Some(character) = char::from_u32(code) else {
                    return Err(DecodeError::InvalidCodePoint(code));
                };
                string.push(character);
            }
            elements.push(string.trim().to_string());
        }
        Ok(elements)
    }
}
