//! A rust library for querying tide time series stored as chunked [Zarr V3](https://zarr.dev) arrays.
//!
//! `tidezarr` reads the datasets written by the tide gauge converters: a `locations.json`
//! manifest listing every station, a `time` array of epoch milliseconds, and one `tide_m`
//! value array per station, chunked and optionally `zstd` compressed. It supports the subset
//! of Zarr V3 those converters produce: one dimensional arrays, the `regular` chunk grid,
//! the `default` chunk key encoding, the little-endian `bytes` codec, and `zstd`.
//!
//! ## Getting Started
//! - Open a [`manifest::Manifest`] from a store and build a [`query::QueryEngine`] with
//!   [`query::QueryEngineBuilder`]. [`query`] and [`storage`] are good places to start.
//! - Query a series with a [`timeline::TimeWindow`]; samples arrive as
//!   [`timeline::TimeSeriesPoint`]s in ascending time order.
//! - Arrays can also be read directly with [`array::Array`], bypassing the manifest.
//!
//! ## Example
//! ```rust,ignore
//! # use std::sync::Arc;
//! let store = Arc::new(tidezarr::storage::store::FilesystemStore::new(
//!     "/path/to/tides.zarr",
//! )?);
//!
//! let manifest_key = tidezarr::manifest::Manifest::DEFAULT_KEY.try_into()?;
//! let manifest = tidezarr::manifest::Manifest::open(store.as_ref(), &manifest_key).await?;
//!
//! let engine = tidezarr::query::QueryEngineBuilder::new(manifest).build(store);
//! let window = tidezarr::timeline::TimeWindow::new(1_700_000_000_000, 1_700_003_600_000);
//! let points = engine.query("ANCHORAGE", &window).await?;
//! println!("{} samples", points.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Non-Default
//!  - `http`: the `HTTPStore` for datasets served over HTTP.
//!
//! ## Licence
//! `tidezarr` is licensed under either of
//!  - the Apache License, Version 2.0 [LICENCE-APACHE](./LICENCE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license [LICENCE-MIT](./LICENCE-MIT) or <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
// #![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod manifest;
pub mod metadata;
pub mod node;
pub mod query;
pub mod storage;
pub mod timeline;
