//! The dataset manifest.
//!
//! A tide dataset stores a `locations.json` document alongside its arrays
//! listing every series it contains. Two document shapes are in circulation:
//! datasets with a shared time axis and (optionally sharded) per-location
//! value arrays, and flat datasets where each location carries its own time
//! axis. [`Manifest`] parses both and resolves each series to the node paths
//! of its backing arrays.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    node::{NodePath, NodePathError},
    storage::{AsyncReadableStorageTraits, StoreKey},
    timeline::{InvalidIntervalError, TimeAxis},
};

/// The name of the timestamp array of a series.
pub const TIME_ARRAY_NAME: &str = "time";

/// The name of the value array of a series.
pub const VALUE_ARRAY_NAME: &str = "tide_m";

#[derive(Deserialize, Debug)]
struct TimeDocument {
    start_time: i64,
    interval_ms: i64,
    count: u64,
}

#[derive(Deserialize, Debug)]
struct SharedLocationDocument {
    #[serde(default)]
    shard: Option<String>,
    count: u64,
    #[serde(default)]
    tide_min: Option<f64>,
    #[serde(default)]
    tide_max: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct FlatLocationDocument {
    start_time: i64,
    interval_ms: i64,
    count: u64,
    #[serde(default)]
    tide_min: Option<f64>,
    #[serde(default)]
    tide_max: Option<f64>,
}

/// The two manifest shapes written by the dataset converters.
///
/// Shared-time documents carry a top level `time` object, so that variant is
/// tried first. Unknown fields (such as `end_time`) are ignored.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ManifestDocument {
    SharedTime {
        time: TimeDocument,
        locations: BTreeMap<String, SharedLocationDocument>,
    },
    PerLocation {
        locations: BTreeMap<String, FlatLocationDocument>,
    },
}

/// A series resolved from the manifest: its time axis, the node paths of the
/// backing arrays, and the summary statistics carried by the document.
#[derive(Clone, Debug)]
pub struct SeriesEntry {
    axis: TimeAxis,
    time_path: NodePath,
    value_path: NodePath,
    shard: Option<String>,
    tide_min: Option<f64>,
    tide_max: Option<f64>,
}

impl SeriesEntry {
    /// Returns the sampling axis of the series.
    #[must_use]
    pub const fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    /// Returns the node path of the timestamp array.
    #[must_use]
    pub const fn time_path(&self) -> &NodePath {
        &self.time_path
    }

    /// Returns the node path of the value array.
    #[must_use]
    pub const fn value_path(&self) -> &NodePath {
        &self.value_path
    }

    /// Returns the shard directory holding the value array, if the dataset is
    /// sharded.
    #[must_use]
    pub fn shard(&self) -> Option<&str> {
        self.shard.as_deref()
    }

    /// Returns the minimum value recorded by the converter, if present.
    ///
    /// Retained as-is from the manifest, never recomputed.
    #[must_use]
    pub const fn tide_min(&self) -> Option<f64> {
        self.tide_min
    }

    /// Returns the maximum value recorded by the converter, if present.
    #[must_use]
    pub const fn tide_max(&self) -> Option<f64> {
        self.tide_max
    }
}

/// A parsed manifest mapping series identifiers to [`SeriesEntry`].
#[derive(Clone, Debug)]
pub struct Manifest {
    series: BTreeMap<String, SeriesEntry>,
}

/// A manifest error.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] crate::storage::StorageError),
    /// The manifest document is missing from the store.
    #[error("manifest {_0} is missing from the store")]
    MissingManifest(StoreKey),
    /// The manifest document does not match either supported shape.
    #[error("error parsing manifest: {_0}")]
    InvalidManifest(String),
    /// A series declares a non-positive sampling interval.
    #[error(transparent)]
    InvalidInterval(#[from] InvalidIntervalError),
    /// A series name or shard produces an invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A location sample count disagrees with the shared time axis.
    #[error("series {series_id} has {actual} samples, the shared time axis has {expected}")]
    CountMismatch {
        /// The series with the mismatched count.
        series_id: String,
        /// The sample count of the shared time axis.
        expected: u64,
        /// The sample count declared by the location.
        actual: u64,
    },
    /// The requested series is not listed in the manifest.
    #[error("series {_0} is not present in the manifest")]
    UnknownSeries(String),
}

impl Manifest {
    /// The store key of the manifest document written by the converters.
    pub const DEFAULT_KEY: &'static str = "locations.json";

    /// Parse a manifest document from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] if the document does not match either
    /// supported shape or declares an inconsistent series.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let document: ManifestDocument = serde_json::from_slice(bytes)
            .map_err(|err| ManifestError::InvalidManifest(err.to_string()))?;
        Self::from_document(document)
    }

    /// Fetch the manifest document at `key` from `storage` and parse it.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] if the document is missing, cannot be
    /// retrieved, or does not parse.
    pub async fn open<TStorage: ?Sized + AsyncReadableStorageTraits>(
        storage: &TStorage,
        key: &StoreKey,
    ) -> Result<Self, ManifestError> {
        let bytes = storage
            .get(key)
            .await?
            .ok_or_else(|| ManifestError::MissingManifest(key.clone()))?;
        Self::from_slice(&bytes)
    }

    fn from_document(document: ManifestDocument) -> Result<Self, ManifestError> {
        let mut series = BTreeMap::new();
        match document {
            ManifestDocument::SharedTime { time, locations } => {
                let axis = TimeAxis::new(time.start_time, time.interval_ms, time.count)?;
                let time_path = NodePath::root().child(TIME_ARRAY_NAME)?;
                for (name, location) in locations {
                    if location.count != time.count {
                        return Err(ManifestError::CountMismatch {
                            series_id: name,
                            expected: time.count,
                            actual: location.count,
                        });
                    }
                    let value_path = match &location.shard {
                        Some(shard) => NodePath::root()
                            .child(shard)?
                            .child(&name)?
                            .child(VALUE_ARRAY_NAME)?,
                        None => NodePath::root().child(&name)?.child(VALUE_ARRAY_NAME)?,
                    };
                    let entry = SeriesEntry {
                        axis: axis.clone(),
                        time_path: time_path.clone(),
                        value_path,
                        shard: location.shard,
                        tide_min: location.tide_min,
                        tide_max: location.tide_max,
                    };
                    series.insert(name, entry);
                }
            }
            ManifestDocument::PerLocation { locations } => {
                for (name, location) in locations {
                    let axis =
                        TimeAxis::new(location.start_time, location.interval_ms, location.count)?;
                    let entry = SeriesEntry {
                        axis,
                        time_path: NodePath::root().child(&name)?.child(TIME_ARRAY_NAME)?,
                        value_path: NodePath::root().child(&name)?.child(VALUE_ARRAY_NAME)?,
                        shard: None,
                        tide_min: location.tide_min,
                        tide_max: location.tide_max,
                    };
                    series.insert(name, entry);
                }
            }
        }
        Ok(Self { series })
    }

    /// Returns the entry for `series_id`, if present.
    #[must_use]
    pub fn get(&self, series_id: &str) -> Option<&SeriesEntry> {
        self.series.get(series_id)
    }

    /// Returns the entry for `series_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnknownSeries`] if the series is not listed.
    pub fn resolve(&self, series_id: &str) -> Result<&SeriesEntry, ManifestError> {
        self.series
            .get(series_id)
            .ok_or_else(|| ManifestError::UnknownSeries(series_id.to_string()))
    }

    /// Returns the series identifiers in lexicographic order.
    pub fn series_ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Returns the number of series in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns true if the manifest lists no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;

    const SHARED_MANIFEST: &str = r#"{
        "time": {
            "start_time": 1700000000000,
            "end_time": 1700003540000,
            "interval_ms": 60000,
            "count": 60
        },
        "locations": {
            "ANCHORAGE": { "shard": "a", "count": 60, "tide_min": -1.2, "tide_max": 9.8 },
            "NEWPORT": { "shard": "n", "count": 60 }
        }
    }"#;

    #[test]
    fn manifest_shared_time_axis() -> Result<(), Box<dyn std::error::Error>> {
        let manifest = Manifest::from_slice(SHARED_MANIFEST.as_bytes())?;
        assert_eq!(manifest.len(), 2);
        assert!(!manifest.is_empty());
        assert_eq!(
            manifest.series_ids().collect::<Vec<_>>(),
            ["ANCHORAGE", "NEWPORT"]
        );

        let anchorage = manifest.resolve("ANCHORAGE")?;
        assert_eq!(anchorage.axis().start_time_ms(), 1_700_000_000_000);
        assert_eq!(anchorage.axis().interval_ms(), 60_000);
        assert_eq!(anchorage.axis().count(), 60);
        assert_eq!(anchorage.time_path().as_str(), "/time");
        assert_eq!(anchorage.value_path().as_str(), "/a/ANCHORAGE/tide_m");
        assert_eq!(anchorage.shard(), Some("a"));
        assert_eq!(anchorage.tide_min(), Some(-1.2));
        assert_eq!(anchorage.tide_max(), Some(9.8));

        let newport = manifest.resolve("NEWPORT")?;
        assert_eq!(newport.time_path().as_str(), "/time");
        assert_eq!(newport.value_path().as_str(), "/n/NEWPORT/tide_m");
        assert_eq!(newport.tide_min(), None);
        assert_eq!(newport.tide_max(), None);
        Ok(())
    }

    #[test]
    fn manifest_shared_without_shard() -> Result<(), Box<dyn std::error::Error>> {
        let manifest = Manifest::from_slice(
            br#"{
                "time": { "start_time": 0, "interval_ms": 1000, "count": 4 },
                "locations": { "SEWARD": { "count": 4 } }
            }"#,
        )?;
        let seward = manifest.resolve("SEWARD")?;
        assert_eq!(seward.time_path().as_str(), "/time");
        assert_eq!(seward.value_path().as_str(), "/SEWARD/tide_m");
        assert_eq!(seward.shard(), None);
        Ok(())
    }

    #[test]
    fn manifest_per_location() -> Result<(), Box<dyn std::error::Error>> {
        let manifest = Manifest::from_slice(
            br#"{
                "locations": {
                    "NEWPORT": {
                        "start_time": 1000,
                        "interval_ms": 60000,
                        "count": 100,
                        "tide_min": 0.1
                    },
                    "SEWARD": {
                        "start_time": 2000,
                        "interval_ms": 30000,
                        "count": 7
                    }
                }
            }"#,
        )?;
        assert_eq!(manifest.len(), 2);

        let newport = manifest.resolve("NEWPORT")?;
        assert_eq!(newport.axis().start_time_ms(), 1000);
        assert_eq!(newport.axis().interval_ms(), 60_000);
        assert_eq!(newport.axis().count(), 100);
        assert_eq!(newport.time_path().as_str(), "/NEWPORT/time");
        assert_eq!(newport.value_path().as_str(), "/NEWPORT/tide_m");
        assert_eq!(newport.shard(), None);
        assert_eq!(newport.tide_min(), Some(0.1));

        let seward = manifest.resolve("SEWARD")?;
        assert_eq!(seward.axis().count(), 7);
        assert_eq!(seward.time_path().as_str(), "/SEWARD/time");
        Ok(())
    }

    #[test]
    fn manifest_count_mismatch() {
        let err = Manifest::from_slice(
            br#"{
                "time": { "start_time": 0, "interval_ms": 1000, "count": 60 },
                "locations": { "ANCHORAGE": { "shard": "a", "count": 59 } }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::CountMismatch {
                expected: 60,
                actual: 59,
                ..
            }
        ));
    }

    #[test]
    fn manifest_invalid_interval() {
        let err = Manifest::from_slice(
            br#"{
                "locations": {
                    "NEWPORT": { "start_time": 0, "interval_ms": 0, "count": 10 }
                }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidInterval(_)));
    }

    #[test]
    fn manifest_invalid_document() {
        assert!(matches!(
            Manifest::from_slice(b"[1, 2, 3]").unwrap_err(),
            ManifestError::InvalidManifest(_)
        ));
        assert!(matches!(
            Manifest::from_slice(br#"{ "locations": { "NEWPORT": {} } }"#).unwrap_err(),
            ManifestError::InvalidManifest(_)
        ));
        assert!(matches!(
            Manifest::from_slice(b"not json").unwrap_err(),
            ManifestError::InvalidManifest(_)
        ));
    }

    #[test]
    fn manifest_unknown_series() -> Result<(), Box<dyn std::error::Error>> {
        let manifest = Manifest::from_slice(SHARED_MANIFEST.as_bytes())?;
        assert!(manifest.get("NOWHERE").is_none());
        assert!(matches!(
            manifest.resolve("NOWHERE"),
            Err(ManifestError::UnknownSeries(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn manifest_open() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        let key: StoreKey = Manifest::DEFAULT_KEY.try_into()?;

        let err = Manifest::open(&store, &key).await.unwrap_err();
        assert!(matches!(err, ManifestError::MissingManifest(_)));

        store.set(&key, SHARED_MANIFEST.as_bytes().to_vec());
        let manifest = Manifest::open(&store, &key).await?;
        assert_eq!(manifest.len(), 2);
        Ok(())
    }
}
