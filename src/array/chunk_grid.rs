//! Zarr chunk grids, reduced to a regular grid over one dimensional arrays.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#chunk-grids>.

use serde::Deserialize;

use std::num::NonZeroU64;
use std::ops::Range;

/// Configuration of the `regular` chunk grid.
#[derive(Deserialize, Clone, Debug)]
pub struct RegularChunkGridConfiguration {
    /// The chunk extent per dimension.
    pub chunk_shape: Vec<NonZeroU64>,
}

/// A regular chunk grid over a one dimensional array.
///
/// Every chunk spans `chunk_len` elements. The final chunk of an array may
/// extend past the end of the array, in which case it holds fewer elements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChunkGrid {
    chunk_len: NonZeroU64,
}

/// The intersection of an element index range with a single chunk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChunkSlice {
    /// The coordinate of the chunk on the grid.
    pub coordinate: u64,
    /// The element range within the chunk, relative to the chunk start.
    pub within: Range<u64>,
}

impl ChunkGrid {
    /// Create a chunk grid with `chunk_len` elements per chunk.
    #[must_use]
    pub const fn new(chunk_len: NonZeroU64) -> Self {
        Self { chunk_len }
    }

    /// Returns the number of elements per chunk.
    #[must_use]
    pub const fn chunk_len(&self) -> NonZeroU64 {
        self.chunk_len
    }

    /// Returns the number of chunks holding an array of `array_len` elements.
    #[must_use]
    pub const fn grid_len(&self, array_len: u64) -> u64 {
        (array_len + self.chunk_len.get() - 1) / self.chunk_len.get()
    }

    /// Returns the array index coverage of the chunk at `coordinate`.
    #[must_use]
    pub const fn chunk_coverage(&self, coordinate: u64) -> Range<u64> {
        coordinate * self.chunk_len.get()..(coordinate + 1) * self.chunk_len.get()
    }

    /// Split an element index `range` over the chunks it touches.
    ///
    /// The range is clamped to `array_len`. Slices are returned in ascending
    /// coordinate order and their `within` ranges are relative to the start
    /// of each chunk.
    #[must_use]
    pub fn chunk_slices(&self, array_len: u64, range: &Range<u64>) -> Vec<ChunkSlice> {
        let start = range.start.min(array_len);
        let end = range.end.min(array_len);
        if start >= end {
            return Vec::new();
        }
        let first = start / self.chunk_len.get();
        let last = (end - 1) / self.chunk_len.get();
        (first..=last)
            .map(|coordinate| {
                let coverage = self.chunk_coverage(coordinate);
                ChunkSlice {
                    coordinate,
                    within: start.max(coverage.start) - coverage.start
                        ..end.min(coverage.end) - coverage.start,
                }
            })
            .collect()
    }
}
