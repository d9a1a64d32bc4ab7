//! Zarr V3 array metadata.
//!
//! The [`Metadata`] structure represents most fields in array metadata (see
//! [`ArrayMetadata`]), which is structured as JSON with a name and optional
//! configuration, or just a string representing the name.
//! It provides convenience functions for converting metadata to and from a
//! configuration specific to each:
//!  - [data type](crate::array::data_type),
//!  - [chunk grid](crate::array::chunk_grid), and
//!  - [codec](crate::array::codec).

use derive_more::From;
use serde::{de::DeserializeOwned, ser::SerializeMap, Deserialize, Serialize};
use thiserror::Error;

use std::num::NonZeroU32;

use crate::{
    array::{codec::CodecError, data_type::UnsupportedDataTypeError},
    storage::StoreKey,
};

/// Metadata with a name and optional configuration.
///
/// Can be deserialised from a JSON string or name/configuration map.
/// For example:
/// ```json
/// "bytes"
/// ```
/// or
/// ```json
/// {
///     "name": "bytes",
///     "configuration": {
///       "endian": "little"
///     }
/// }
/// ```
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Metadata {
    name: String,
    configuration: Option<MetadataConfiguration>,
}

impl TryFrom<&str> for Metadata {
    type Error = serde_json::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(s)
    }
}

impl core::fmt::Display for Metadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(configuration) = &self.configuration {
            write!(f, "{} {:?}", self.name, configuration)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl serde::Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if let Some(configuration) = &self.configuration {
            let mut s = s.serialize_map(Some(2))?;
            s.serialize_entry("name", &self.name)?;
            s.serialize_entry("configuration", configuration)?;
            s.end()
        } else {
            s.serialize_str(self.name.as_str())
        }
    }
}

impl<'de> serde::Deserialize<'de> for Metadata {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct MetadataNameConfiguration {
            name: String,
            #[serde(default)]
            configuration: Option<MetadataConfiguration>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MetadataIntermediate {
            Name(String),
            NameConfiguration(MetadataNameConfiguration),
        }

        let metadata = MetadataIntermediate::deserialize(d)?;
        match metadata {
            MetadataIntermediate::Name(name) => Ok(Self {
                name,
                configuration: None,
            }),
            MetadataIntermediate::NameConfiguration(metadata) => Ok(Self {
                name: metadata.name,
                configuration: metadata.configuration,
            }),
        }
    }
}

impl Metadata {
    /// Create metadata from `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }

    /// Create metadata from `name` and `configuration`.
    #[must_use]
    pub fn new_with_configuration(name: &str, configuration: MetadataConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration: Some(configuration),
        }
    }

    /// Try and convert [`Metadata`] to a serializable configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationInvalidError`] if the metadata cannot be converted.
    pub fn to_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, ConfigurationInvalidError> {
        self.configuration.as_ref().map_or_else(
            || {
                Err(ConfigurationInvalidError::new(
                    &self.name,
                    self.configuration.clone(),
                ))
            },
            |configuration| {
                serde_json::from_value(serde_json::Value::Object(configuration.clone())).map_err(
                    |_| ConfigurationInvalidError::new(&self.name, self.configuration.clone()),
                )
            },
        )
    }

    /// Returns the metadata name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metadata configuration.
    #[must_use]
    pub const fn configuration(&self) -> Option<&MetadataConfiguration> {
        self.configuration.as_ref()
    }

    /// Returns true if the configuration is none or an empty map.
    #[must_use]
    pub fn configuration_is_none_or_empty(&self) -> bool {
        self.configuration
            .as_ref()
            .map_or(true, serde_json::Map::is_empty)
    }
}

/// An invalid configuration error.
#[derive(Debug, Error, From)]
#[error("{name} is unsupported, configuration: {configuration:?}")]
pub struct ConfigurationInvalidError {
    name: String,
    configuration: Option<MetadataConfiguration>,
}

impl ConfigurationInvalidError {
    /// Create a new invalid configuration error.
    #[must_use]
    pub fn new(name: &str, configuration: Option<MetadataConfiguration>) -> Self {
        Self {
            name: name.to_string(),
            configuration,
        }
    }

    /// Return the name of the invalid configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the underlying configuration metadata of the invalid configuration.
    #[must_use]
    pub const fn configuration(&self) -> Option<&MetadataConfiguration> {
        self.configuration.as_ref()
    }
}

/// Configuration metadata.
pub type MetadataConfiguration = serde_json::Map<String, serde_json::Value>;

/// Zarr V3 array metadata, the `zarr.json` document stored beside the chunks
/// of an array.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, derive_more::Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadata {
    /// The Zarr format. Must be `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// The node type. Must be `"array"`.
    pub node_type: monostate::MustBe!("array"),
    /// The array shape, one extent per dimension.
    pub shape: Vec<u64>,
    /// The data type of the array elements.
    pub data_type: Metadata,
    /// The mapping of array indices to chunk grid cells.
    pub chunk_grid: Metadata,
    /// The mapping of chunk grid cell coordinates to store keys.
    pub chunk_key_encoding: Metadata,
    /// The fill value. Retained verbatim, never applied to chunk data.
    #[serde(default)]
    pub fill_value: serde_json::Value,
    /// The codecs applied to chunk payloads on their way to the store.
    pub codecs: Vec<Metadata>,
    /// Optional user attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Optional storage transformers. Rejected unless empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_transformers: Vec<Metadata>,
    /// Optional dimension names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
}

/// Datasets written by the CSV converter store datetimes as
/// `YYYY-MM-DD HH:MM:SS` strings, 19 UCS-4 code units per element.
const DEFAULT_STRING_CODE_UNITS: NonZeroU32 = match NonZeroU32::new(19) {
    Some(code_units) => code_units,
    None => unreachable!(),
};

/// Options for interpreting array metadata.
#[derive(Debug, Clone)]
pub struct MetadataOptions {
    default_string_code_units: NonZeroU32,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            default_string_code_units: DEFAULT_STRING_CODE_UNITS,
        }
    }
}

impl MetadataOptions {
    /// Return the code units per element assumed for a fixed-length string
    /// data type whose metadata omits its configuration.
    #[must_use]
    pub const fn default_string_code_units(&self) -> NonZeroU32 {
        self.default_string_code_units
    }

    /// Set the code units per element assumed for a fixed-length string data
    /// type whose metadata omits its configuration.
    pub fn set_default_string_code_units(&mut self, code_units: NonZeroU32) -> &mut Self {
        self.default_string_code_units = code_units;
        self
    }
}

/// An array metadata error.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The metadata document is missing from the store.
    #[error("array metadata {0} is missing from the store")]
    MissingMetadata(StoreKey),
    /// The metadata document failed to parse.
    #[error("error parsing array metadata {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// Unsupported data type.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// Invalid name/configuration metadata.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationInvalidError),
    /// Unsupported codec chain.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// The array is not one dimensional.
    #[error("array has dimensionality {0}, expected 1")]
    UnsupportedDimensionality(usize),
    /// The chunk grid dimensionality does not match the array dimensionality.
    #[error("chunk grid has dimensionality {0}, array has dimensionality {1}")]
    InvalidChunkGridDimensionality(usize, usize),
    /// Unsupported chunk grid.
    #[error("unsupported chunk grid {0}")]
    UnsupportedChunkGrid(String),
    /// Unsupported chunk key encoding.
    #[error("unsupported chunk key encoding {0}")]
    UnsupportedChunkKeyEncoding(String),
    /// The metadata declares storage transformers, which are not supported.
    #[error("storage transformers are not supported")]
    UnsupportedStorageTransformers,
    /// Invalid fixed-length string size in bytes.
    #[error("invalid string length_bytes {0}, expected a non-zero multiple of 4")]
    InvalidStringLength(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_name() {
        let metadata = Metadata::try_from(r#""bytes""#);
        assert!(metadata.is_ok());
        let metadata = metadata.unwrap();
        assert_eq!(metadata.to_string(), "bytes");
        assert_eq!(metadata.name(), "bytes");
        assert!(metadata.configuration_is_none_or_empty());
    }

    #[test]
    fn metadata_name_configuration() {
        let metadata =
            Metadata::try_from(r#"{"name":"bytes","configuration":{"endian":"little"}}"#);
        assert!(metadata.is_ok());
        let metadata = metadata.unwrap();
        assert_eq!(metadata.name(), "bytes");
        assert!(!metadata.configuration_is_none_or_empty());
    }

    #[test]
    fn metadata_invalid_fields() {
        let metadata = Metadata::try_from(r#"{"name":"bytes","invalid":{"endian":"little"}}"#);
        assert!(metadata.is_err());
    }

    #[test]
    fn array_metadata_converter_document() {
        let json = r#"{
            "zarr_format": 3,
            "node_type": "array",
            "shape": [672],
            "data_type": "float64",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [96]}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": "NaN",
            "codecs": [
                {"name": "bytes", "configuration": {"endian": "little"}},
                {"name": "zstd", "configuration": {"level": 3, "checksum": false}}
            ],
            "attributes": {"units": "m"}
        }"#;
        let metadata = serde_json::from_str::<ArrayMetadata>(json);
        assert!(metadata.is_ok());
        let metadata = metadata.unwrap();
        assert_eq!(metadata.shape, vec![672]);
        assert_eq!(metadata.data_type.name(), "float64");
        assert_eq!(metadata.codecs.len(), 2);
        assert!(metadata.storage_transformers.is_empty());
    }

    #[test]
    fn array_metadata_wrong_node_type() {
        let json = r#"{
            "zarr_format": 3,
            "node_type": "group",
            "shape": [672],
            "data_type": "float64",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [96]}},
            "chunk_key_encoding": {"name": "default"},
            "fill_value": 0.0,
            "codecs": ["bytes"]
        }"#;
        assert!(serde_json::from_str::<ArrayMetadata>(json).is_err());
    }
}
