//! The tide query engine.
//!
//! A [`QueryEngine`] resolves a series through the dataset [`Manifest`],
//! opens the backing time and value arrays, and retrieves the samples
//! overlapping a [`TimeWindow`] as [`TimeSeriesPoint`]s.

pub mod slot;

pub use slot::{SelectionSlot, SelectionTicket};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{AbortHandle, Abortable, Aborted};
use itertools::izip;
use std::ops::Range;
use thiserror::Error;

use crate::{
    array::{Array, ArrayError, DataType, DecodeError},
    manifest::{Manifest, ManifestError},
    metadata::MetadataOptions,
    node::{NodePath, NodePathError},
    storage::AsyncReadableStorageTraits,
    timeline::{TimeSeriesPoint, TimeWindow},
};

/// The stage of the query pipeline a failure occurred in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
pub enum QueryStage {
    /// Resolving the series through the manifest.
    #[display("series resolution")]
    ResolveSeries,
    /// Opening and validating the array metadata documents.
    #[display("metadata open")]
    OpenMetadata,
    /// Fetching chunk payloads from the store.
    #[display("chunk fetch")]
    Fetch,
    /// Decoding chunk payloads into elements.
    #[display("chunk decode")]
    Decode,
    /// The query was aborted before completion.
    #[display("cancellation")]
    Cancelled,
}

/// The underlying error behind a [`QueryError`].
#[derive(Debug, Error)]
pub enum QuerySource {
    /// A manifest error.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// An array error.
    #[error(transparent)]
    Array(#[from] ArrayError),
    /// An array length disagreeing with the manifest sample count.
    #[error("array {path} has {actual} elements, the manifest declares {expected}")]
    AxisMismatch {
        /// The node path of the offending array.
        path: NodePath,
        /// The sample count declared by the manifest.
        expected: u64,
        /// The length of the array in the store.
        actual: u64,
    },
}

/// A query failure, carrying the failing [`QueryStage`] for diagnostics.
#[derive(Debug, Error)]
#[error("query for series {series_id} failed during {stage}")]
pub struct QueryError {
    series_id: String,
    stage: QueryStage,
    #[source]
    source: Option<QuerySource>,
}

impl QueryError {
    fn new(series_id: &str, stage: QueryStage, source: impl Into<QuerySource>) -> Self {
        Self {
            series_id: series_id.to_string(),
            stage,
            source: Some(source.into()),
        }
    }

    fn cancelled(series_id: &str) -> Self {
        Self {
            series_id: series_id.to_string(),
            stage: QueryStage::Cancelled,
            source: None,
        }
    }

    /// Returns the identifier of the series the query targeted.
    #[must_use]
    pub fn series_id(&self) -> &str {
        &self.series_id
    }

    /// Returns the stage the query failed in.
    #[must_use]
    pub const fn stage(&self) -> QueryStage {
        self.stage
    }
}

/// Classify a retrieval failure: payloads that arrived but would not decode
/// are decode failures, everything else failed in transit.
fn retrieval_stage(err: &ArrayError) -> QueryStage {
    match err {
        ArrayError::CodecError(_) | ArrayError::DecodeError(_) => QueryStage::Decode,
        _ => QueryStage::Fetch,
    }
}

/// A builder for a [`QueryEngine`].
///
/// ```
/// # use tidezarr::manifest::Manifest;
/// # use tidezarr::query::QueryEngineBuilder;
/// # use tidezarr::storage::store::MemoryStore;
/// # use std::sync::Arc;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manifest = Manifest::from_slice(
///     br#"{"locations": {"NEWPORT": {"start_time": 0, "interval_ms": 60000, "count": 10}}}"#,
/// )?;
/// let engine = QueryEngineBuilder::new(manifest).build(Arc::new(MemoryStore::new()));
/// # Ok(())
/// # }
/// ```
pub struct QueryEngineBuilder {
    manifest: Manifest,
    options: MetadataOptions,
    root: Option<NodePath>,
}

impl QueryEngineBuilder {
    /// Create a builder for an engine resolving series through `manifest`.
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            options: MetadataOptions::default(),
            root: None,
        }
    }

    /// Set the metadata interpretation options.
    pub fn metadata_options(&mut self, options: MetadataOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Nest every array path under `root`, for datasets stored under a
    /// prefix such as `/tides.zarr`.
    pub fn root(&mut self, root: NodePath) -> &mut Self {
        self.root = Some(root);
        self
    }

    /// Build the engine over `storage`.
    pub fn build<TStorage: ?Sized>(&self, storage: Arc<TStorage>) -> QueryEngine<TStorage> {
        QueryEngine {
            storage,
            manifest: self.manifest.clone(),
            options: self.options.clone(),
            root: self.root.clone(),
        }
    }
}

/// A query engine over a tide dataset held in `storage`.
///
/// The engine is stateless across queries: every query resolves, fetches,
/// and decodes independently, so concurrent queries never interfere.
pub struct QueryEngine<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    manifest: Manifest,
    options: MetadataOptions,
    root: Option<NodePath>,
}

impl<TStorage: ?Sized> QueryEngine<TStorage> {
    /// Returns the manifest the engine resolves series through.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Returns the metadata interpretation options.
    #[must_use]
    pub const fn metadata_options(&self) -> &MetadataOptions {
        &self.options
    }

    fn prefixed_path(&self, path: &NodePath) -> Result<NodePath, NodePathError> {
        match &self.root {
            Some(root) if root.as_str() != "/" => {
                NodePath::new(&format!("{}{}", root.as_str(), path.as_str()))
            }
            _ => Ok(path.clone()),
        }
    }
}

impl<TStorage: ?Sized + AsyncReadableStorageTraits> QueryEngine<TStorage> {
    /// Retrieve every sample of `series_id` within `window`, inclusive at
    /// both ends, in ascending time order.
    ///
    /// A window overlapping no samples yields `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] carrying the failing [`QueryStage`] if the
    /// series is unknown, array metadata cannot be opened, an array length
    /// disagrees with the manifest, or a chunk fails to fetch or decode.
    /// Any failure aborts the whole query; partial tables are never
    /// returned.
    pub async fn query(
        &self,
        series_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<TimeSeriesPoint>, QueryError> {
        let start = Instant::now();
        let entry = self
            .manifest
            .resolve(series_id)
            .map_err(|err| QueryError::new(series_id, QueryStage::ResolveSeries, err))?;

        let index_range = entry.axis().index_range(window);
        if index_range.is_empty() {
            tracing::debug!(series_id, "query window overlaps no samples");
            return Ok(Vec::new());
        }

        let open_err = |err: NodePathError| {
            QueryError::new(series_id, QueryStage::OpenMetadata, ArrayError::from(err))
        };
        let time_path = self.prefixed_path(entry.time_path()).map_err(open_err)?;
        let value_path = self.prefixed_path(entry.value_path()).map_err(open_err)?;
        let (time_array, value_array) = futures::try_join!(
            Array::open_opt(self.storage.clone(), time_path.as_str(), &self.options),
            Array::open_opt(self.storage.clone(), value_path.as_str(), &self.options),
        )
        .map_err(|err| QueryError::new(series_id, QueryStage::OpenMetadata, err))?;

        let expected = entry.axis().count();
        for array in [&time_array, &value_array] {
            if array.len() != expected {
                return Err(QueryError::new(
                    series_id,
                    QueryStage::OpenMetadata,
                    QuerySource::AxisMismatch {
                        path: array.path().clone(),
                        expected,
                        actual: array.len(),
                    },
                ));
            }
        }

        let chunks = time_array
            .chunk_grid()
            .chunk_slices(time_array.len(), &index_range)
            .len()
            + value_array
                .chunk_grid()
                .chunk_slices(value_array.len(), &index_range)
                .len();
        let (timestamps, values) = futures::try_join!(
            Self::retrieve_timestamps(&time_array, &index_range),
            value_array.retrieve_range_elements::<f64>(&index_range),
        )
        .map_err(|err| {
            let stage = retrieval_stage(&err);
            QueryError::new(series_id, stage, err)
        })?;

        let mut points = Vec::with_capacity(timestamps.len());
        for (timestamp_ms, value) in izip!(timestamps, values) {
            if window.contains(timestamp_ms) {
                points.push(TimeSeriesPoint {
                    timestamp_ms,
                    value,
                });
            }
        }
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(
            series_id,
            points = points.len(),
            chunks,
            elapsed_ms,
            "query complete"
        );
        Ok(points)
    }

    /// Start a query that can be aborted.
    ///
    /// Returns the [`AbortHandle`] and the query future. Aborting drops any
    /// outstanding chunk fetches and resolves the future to a [`QueryError`]
    /// with stage [`QueryStage::Cancelled`].
    pub fn query_abortable<'a>(
        &'a self,
        series_id: &'a str,
        window: &'a TimeWindow,
    ) -> (
        AbortHandle,
        impl Future<Output = Result<Vec<TimeSeriesPoint>, QueryError>> + 'a,
    ) {
        let (handle, registration) = AbortHandle::new_pair();
        let query = Abortable::new(self.query(series_id, window), registration);
        let series_id = series_id.to_string();
        let future = async move {
            match query.await {
                Ok(result) => result,
                Err(Aborted) => {
                    tracing::debug!(series_id, "query aborted");
                    Err(QueryError::cancelled(&series_id))
                }
            }
        };
        (handle, future)
    }

    /// Decode the time column per its data type. Datasets in circulation
    /// store the time axis as either int64 or float64 epoch milliseconds.
    #[allow(clippy::cast_possible_truncation)]
    async fn retrieve_timestamps(
        array: &Array<TStorage>,
        range: &Range<u64>,
    ) -> Result<Vec<i64>, ArrayError> {
        match array.data_type() {
            DataType::Int64 => array.retrieve_range_elements::<i64>(range).await,
            DataType::Float64 => {
                let elements = array.retrieve_range_elements::<f64>(range).await?;
                Ok(elements.into_iter().map(|element| element as i64).collect())
            }
            DataType::FixedUnicode { .. } => Err(ArrayError::DecodeError(
                DecodeError::IncompatibleElementType(array.data_type().name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::array::CodecError;
    use crate::storage::{store::MemoryStore, StorageError};

    #[test]
    fn query_stage_display() {
        assert_eq!(QueryStage::ResolveSeries.to_string(), "series resolution");
        assert_eq!(QueryStage::OpenMetadata.to_string(), "metadata open");
        assert_eq!(QueryStage::Fetch.to_string(), "chunk fetch");
        assert_eq!(QueryStage::Decode.to_string(), "chunk decode");
        assert_eq!(QueryStage::Cancelled.to_string(), "cancellation");
    }

    #[test]
    fn query_error_display() {
        let err = QueryError::new(
            "ANCHORAGE",
            QueryStage::ResolveSeries,
            ManifestError::UnknownSeries("ANCHORAGE".to_string()),
        );
        assert_eq!(err.series_id(), "ANCHORAGE");
        assert_eq!(err.stage(), QueryStage::ResolveSeries);
        assert_eq!(
            err.to_string(),
            "query for series ANCHORAGE failed during series resolution"
        );
        assert!(std::error::Error::source(&err).is_some());

        let cancelled = QueryError::cancelled("ANCHORAGE");
        assert_eq!(cancelled.stage(), QueryStage::Cancelled);
        assert!(std::error::Error::source(&cancelled).is_none());
    }

    #[test]
    fn retrieval_stage_classification() {
        let fetch = ArrayError::StorageError(StorageError::from("connection reset"));
        assert_eq!(retrieval_stage(&fetch), QueryStage::Fetch);

        let missing = ArrayError::MissingChunk("a/tide_m/c/0".try_into().unwrap());
        assert_eq!(retrieval_stage(&missing), QueryStage::Fetch);

        let decode = ArrayError::DecodeError(DecodeError::ShortBuffer {
            expected: 16,
            actual: 8,
        });
        assert_eq!(retrieval_stage(&decode), QueryStage::Decode);

        let corrupt = ArrayError::CodecError(CodecError::from("corrupt frame"));
        assert_eq!(retrieval_stage(&corrupt), QueryStage::Decode);
    }

    #[test]
    fn engine_prefixed_paths() -> Result<(), Box<dyn std::error::Error>> {
        let manifest = Manifest::from_slice(
            br#"{"locations": {"NEWPORT": {"start_time": 0, "interval_ms": 60000, "count": 10}}}"#,
        )?;
        let store = Arc::new(MemoryStore::new());

        let engine = QueryEngineBuilder::new(manifest.clone()).build(store.clone());
        let entry = engine.manifest().resolve("NEWPORT")?;
        assert_eq!(
            engine.prefixed_path(entry.value_path())?.as_str(),
            "/NEWPORT/tide_m"
        );

        let engine = QueryEngineBuilder::new(manifest)
            .root(NodePath::new("/tides.zarr")?)
            .build(store);
        let entry = engine.manifest().resolve("NEWPORT")?;
        assert_eq!(
            engine.prefixed_path(entry.time_path())?.as_str(),
            "/tides.zarr/NEWPORT/time"
        );
        assert_eq!(
            engine.prefixed_path(entry.value_path())?.as_str(),
            "/tides.zarr/NEWPORT/tide_m"
        );
        Ok(())
    }
}
