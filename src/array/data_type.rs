//! Zarr data types.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#data-types>.

use derive_more::From;
use serde::Deserialize;
use thiserror::Error;

use crate::metadata::{Metadata, MetadataError, MetadataOptions};

use std::num::NonZeroU32;

/// A data type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataType {
    /// `float64` IEEE 754 double-precision floating point: sign bit, 11 bits exponent, 52 bits mantissa.
    Float64,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `fixed_length_utf32` string: a fixed number of UCS-4 code units per element.
    FixedUnicode {
        /// Code units per element. Each code unit occupies four bytes.
        code_units: NonZeroU32,
    },
}

/// An unsupported data type error.
#[derive(Debug, Error, From)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

/// Configuration of the `fixed_length_utf32` data type.
#[derive(Deserialize, Clone, Debug)]
struct FixedLengthUtf32Configuration {
    /// Size of an element in bytes.
    length_bytes: u32,
}

impl DataType {
    /// Create a data type from metadata.
    ///
    /// A `fixed_length_utf32` (alias `numpy.fixed_length_ucs4`) data type
    /// without a configuration falls back to
    /// [`MetadataOptions::default_string_code_units`] with a warning.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the metadata does not name a supported
    /// data type or carries an invalid configuration.
    pub fn from_metadata(
        metadata: &Metadata,
        options: &MetadataOptions,
    ) -> Result<Self, MetadataError> {
        match metadata.name() {
            "float64" => Ok(Self::Float64),
            "int64" => Ok(Self::Int64),
            "fixed_length_utf32" | "numpy.fixed_length_ucs4" => {
                if metadata.configuration_is_none_or_empty() {
                    let code_units = options.default_string_code_units();
                    tracing::warn!(
                        "data type {} has no length_bytes, assuming {} code units per element",
                        metadata.name(),
                        code_units
                    );
                    Ok(Self::FixedUnicode { code_units })
                } else {
                    let configuration: FixedLengthUtf32Configuration =
                        metadata.to_configuration()?;
                    match NonZeroU32::new(configuration.length_bytes / 4) {
                        Some(code_units) if configuration.length_bytes % 4 == 0 => {
                            Ok(Self::FixedUnicode { code_units })
                        }
                        _ => Err(MetadataError::InvalidStringLength(u64::from(
                            configuration.length_bytes,
                        ))),
                    }
                }
            }
            name => Err(UnsupportedDataTypeError(name.to_string()).into()),
        }
    }

    /// Returns the data type name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Float64 => "float64".to_string(),
            Self::Int64 => "int64".to_string(),
            Self::FixedUnicode { .. } => "fixed_length_utf32".to_string(),
        }
    }

    /// Returns the size of an element in bytes.
    #[must_use]
    pub fn element_size(&self) -> u64 {
        match self {
            Self::Float64 | Self::Int64 => 8,
            Self::FixedUnicode { code_units } => u64::from(code_units.get()) * 4,
        }
    }
}
