//! Zarr arrays.
//!
//! An array is a node in a store holding chunked one dimensional data and
//! associated metadata.
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#array>.
//!
//! Use [`Array::open`] to read the metadata of an existing array from a
//! store, then [`Array::retrieve_range_elements`] to fetch and decode an
//! element range.

pub mod chunk_grid;
pub mod codec;
pub mod data_type;
pub mod element;

pub use self::{
    chunk_grid::{ChunkGrid, ChunkSlice, RegularChunkGridConfiguration},
    codec::{CodecChain, CodecError, CodecKind},
    data_type::{DataType, UnsupportedDataTypeError},
    element::{DecodeError, ElementDecode},
};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    metadata::{ArrayMetadata, MetadataError, MetadataOptions},
    node::{NodePath, NodePathError},
    storage::{data_key, meta_key, AsyncReadableStorageTraits, Bytes, StorageError, StoreKey},
};

use std::ops::Range;
use std::sync::Arc;

/// A chunk key separator.
#[derive(Copy, Clone, Eq, PartialEq, Debug, derive_more::Display)]
pub enum ChunkKeySeparator {
    /// The slash '/' character.
    #[display("/")]
    Slash,
    /// The dot '.' character.
    #[display(".")]
    Dot,
}

impl serde::Serialize for ChunkKeySeparator {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            ChunkKeySeparator::Slash => s.serialize_char('/'),
            ChunkKeySeparator::Dot => s.serialize_char('.'),
        }
    }
}

impl<'de> serde::Deserialize<'de> for ChunkKeySeparator {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        if let serde_json::Value::String(separator) = value {
            if separator == "/" {
                return Ok(ChunkKeySeparator::Slash);
            } else if separator == "." {
                return Ok(ChunkKeySeparator::Dot);
            }
        }
        Err(serde::de::Error::custom(
            "chunk key separator must be a `.` or `/`.",
        ))
    }
}

/// Configuration of the `default` chunk key encoding.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct DefaultChunkKeyEncodingConfiguration {
    /// The chunk key separator.
    #[serde(default = "default_separator")]
    pub separator: ChunkKeySeparator,
}

const fn default_separator() -> ChunkKeySeparator {
    ChunkKeySeparator::Slash
}

/// An array error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A metadata error.
    #[error(transparent)]
    MetadataError(#[from] MetadataError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// An element decode error.
    #[error(transparent)]
    DecodeError(#[from] DecodeError),
    /// A chunk within the requested range is missing from the store.
    #[error("chunk {_0} is missing from the store")]
    MissingChunk(StoreKey),
}

/// A Zarr array.
///
/// The array is defined by the parameters lowered from its JSON metadata
/// (see [`ArrayMetadata`]): a one dimensional shape, a data type, a regular
/// chunk grid, a `default` chunk key encoding, and a codec chain. The fill
/// value is retained in the metadata but never applied; a chunk which should
/// exist and does not is an error.
#[derive(Debug)]
pub struct Array<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the array in the store.
    path: NodePath,
    /// The number of elements in the array.
    len: u64,
    /// The data type of the array.
    data_type: DataType,
    /// The chunk grid of the array.
    chunk_grid: ChunkGrid,
    /// The separator of the `default` chunk key encoding.
    chunk_key_separator: ChunkKeySeparator,
    /// The codecs applied to chunk payloads in the store.
    codecs: CodecChain,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array in `storage` at `path` from existing `metadata`.
    /// This does not read from the store, see [`Array::open`].
    ///
    /// # Errors
    ///
    /// Returns an [`ArrayError`] if `path` is invalid or the metadata cannot
    /// be lowered to a supported array: a dimensionality other than one, an
    /// unsupported data type, chunk grid, chunk key encoding or codec, or
    /// declared storage transformers.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: &ArrayMetadata,
        options: &MetadataOptions,
    ) -> Result<Self, ArrayError> {
        let path = NodePath::new(path)?;

        if metadata.shape.len() != 1 {
            return Err(MetadataError::UnsupportedDimensionality(metadata.shape.len()).into());
        }
        let len = metadata.shape[0];

        let data_type = DataType::from_metadata(&metadata.data_type, options)?;

        if metadata.chunk_grid.name() != "regular" {
            return Err(
                MetadataError::UnsupportedChunkGrid(metadata.chunk_grid.name().to_string()).into(),
            );
        }
        let chunk_grid_configuration: RegularChunkGridConfiguration = metadata
            .chunk_grid
            .to_configuration()
            .map_err(MetadataError::from)?;
        if chunk_grid_configuration.chunk_shape.len() != metadata.shape.len() {
            return Err(MetadataError::InvalidChunkGridDimensionality(
                chunk_grid_configuration.chunk_shape.len(),
                metadata.shape.len(),
            )
            .into());
        }
        let chunk_grid = ChunkGrid::new(chunk_grid_configuration.chunk_shape[0]);

        if metadata.chunk_key_encoding.name() != "default" {
            return Err(MetadataError::UnsupportedChunkKeyEncoding(
                metadata.chunk_key_encoding.name().to_string(),
            )
            .into());
        }
        let chunk_key_separator = if metadata.chunk_key_encoding.configuration_is_none_or_empty() {
            ChunkKeySeparator::Slash
        } else {
            let configuration: DefaultChunkKeyEncodingConfiguration = metadata
                .chunk_key_encoding
                .to_configuration()
                .map_err(MetadataError::from)?;
            configuration.separator
        };

        let codecs = CodecChain::from_metadata(&metadata.codecs).map_err(MetadataError::from)?;

        if !metadata.storage_transformers.is_empty() {
            return Err(MetadataError::UnsupportedStorageTransformers.into());
        }

        Ok(Self {
            storage,
            path,
            len,
            data_type,
            chunk_grid,
            chunk_key_separator,
            codecs,
        })
    }

    /// Returns the number of elements in the array.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the array holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the node path of the array.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Returns the data type of the array.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the chunk grid of the array.
    #[must_use]
    pub const fn chunk_grid(&self) -> &ChunkGrid {
        &self.chunk_grid
    }

    /// Returns the separator of the chunk key encoding.
    #[must_use]
    pub const fn chunk_key_separator(&self) -> ChunkKeySeparator {
        self.chunk_key_separator
    }

    /// Returns the store key of the chunk at `coordinate`.
    #[must_use]
    pub fn chunk_key(&self, coordinate: u64) -> StoreKey {
        data_key(&self.path, coordinate, self.chunk_key_separator)
    }
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> Array<TStorage> {
    /// Open an existing array in `storage` at `path`, reading its metadata
    /// from the store with default [`MetadataOptions`].
    ///
    /// # Errors
    ///
    /// Returns an [`ArrayError`] if the metadata document is missing,
    /// malformed, or cannot be lowered to a supported array.
    pub async fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, ArrayError> {
        Self::open_opt(storage, path, &MetadataOptions::default()).await
    }

    /// Open an existing array in `storage` at `path` with `options`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArrayError`] if the metadata document is missing,
    /// malformed, or cannot be lowered to a supported array.
    pub async fn open_opt(
        storage: Arc<TStorage>,
        path: &str,
        options: &MetadataOptions,
    ) -> Result<Self, ArrayError> {
        let node_path = NodePath::new(path)?;
        let key = meta_key(&node_path);
        let metadata_bytes = storage
            .get(&key)
            .await?
            .ok_or_else(|| MetadataError::MissingMetadata(key.clone()))?;
        let metadata: ArrayMetadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|err| MetadataError::InvalidMetadata(key, err.to_string()))?;
        Self::new_with_metadata(storage, path, &metadata, options)
    }

    /// Retrieve the encoded bytes of the chunk at `coordinate`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::MissingChunk`] if the chunk is not in the store,
    /// or [`ArrayError::StorageError`] if the fetch fails.
    pub async fn retrieve_chunk_encoded(&self, coordinate: u64) -> Result<Bytes, ArrayError> {
        let key = self.chunk_key(coordinate);
        self.storage
            .get(&key)
            .await?
            .ok_or(ArrayError::MissingChunk(key))
    }

    /// Retrieve the decoded elements of the array within `range`.
    ///
    /// The range is clamped to the array length; a range past the end of the
    /// array yields no elements. Chunk fetches are issued concurrently and
    /// every fetch must succeed before any payload is decoded.
    ///
    /// # Errors
    ///
    /// Returns an [`ArrayError`] if a chunk is missing from the store, a
    /// fetch fails, or a payload fails to decode.
    pub async fn retrieve_range_elements<T: ElementDecode>(
        &self,
        range: &Range<u64>,
    ) -> Result<Vec<T>, ArrayError> {
        let slices = self.chunk_grid.chunk_slices(self.len, range);
        if slices.is_empty() {
            return Ok(Vec::new());
        }
        let encoded = try_join_all(
            slices
                .iter()
                .map(|slice| self.retrieve_chunk_encoded(slice.coordinate)),
        )
        .await?;

        let num_elements = slices
            .iter()
            .map(|slice| slice.within.end - slice.within.start)
            .sum::<u64>();
        let mut elements = Vec::with_capacity(usize::try_from(num_elements).unwrap());
        for (slice, encoded) in std::iter::zip(&slices, encoded) {
            let decoded = self.codecs.decode(encoded)?;
            elements.append(&mut T::decode_range(
                &self.data_type,
                &decoded,
                &slice.within,
            )?);
        }
        Ok(elements)
    }
}
