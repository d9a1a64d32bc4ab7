use std::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;

use tidezarr::{
    array::{Array, DataType},
    metadata::MetadataOptions,
    storage::store::MemoryStore,
};

const DATETIMES: [&str; 3] = [
    "2023-11-14 22:13:20",
    "2023-11-14 22:14:20",
    "2023-11-14 22:15:20",
];

fn ucs4(value: &str, code_units: usize) -> Vec<u8> {
    let mut units: Vec<u32> = value.chars().map(u32::from).collect();
    units.resize(code_units, 0);
    units.iter().flat_map(|u| u.to_le_bytes()).collect()
}

fn string_zarr_json(data_type: &str) -> String {
    serde_json::json!({
        "zarr_format": 3,
        "node_type": "array",
        "shape": [3],
        "data_type": data_type,
        "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2]}},
        "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
        "fill_value": "",
        "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}]
    })
    .to_string()
}

fn datetime_store(
    data_type_json: &str,
    code_units: usize,
) -> Result<Arc<MemoryStore>, Box<dyn Error>> {
    let store = MemoryStore::new();
    let zarr_json = string_zarr_json("PLACEHOLDER").replace(r#""PLACEHOLDER""#, data_type_json);
    store.set(&"dt/zarr.json".try_into()?, zarr_json.into_bytes());
    let mut chunk0 = ucs4(DATETIMES[0], code_units);
    chunk0.extend(ucs4(DATETIMES[1], code_units));
    store.set(&"dt/c/0".try_into()?, chunk0);
    store.set(&"dt/c/1".try_into()?, ucs4(DATETIMES[2], code_units));
    Ok(Arc::new(store))
}

#[tokio::test]
async fn retrieve_datetime_strings() -> Result<(), Box<dyn Error>> {
    // 24 code units per element, so every 19 character datetime is zero padded
    let store = datetime_store(
        r#"{"name": "fixed_length_utf32", "configuration": {"length_bytes": 96}}"#,
        24,
    )?;
    let array = Array::open(store, "/dt").await?;
    assert_eq!(
        array.data_type(),
        &DataType::FixedUnicode {
            code_units: NonZeroU32::new(24).unwrap()
        }
    );
    let elements = array.retrieve_range_elements::<String>(&(0..3)).await?;
    assert_eq!(elements, DATETIMES);
    let tail = array.retrieve_range_elements::<String>(&(1..3)).await?;
    assert_eq!(tail, DATETIMES[1..3]);
    Ok(())
}

#[tokio::test]
async fn retrieve_strings_with_ucs4_alias() -> Result<(), Box<dyn Error>> {
    let store = datetime_store(
        r#"{"name": "numpy.fixed_length_ucs4", "configuration": {"length_bytes": 76}}"#,
        19,
    )?;
    let array = Array::open(store, "/dt").await?;
    let elements = array.retrieve_range_elements::<String>(&(0..3)).await?;
    assert_eq!(elements, DATETIMES);
    Ok(())
}

#[tokio::test]
async fn retrieve_strings_without_length_configuration() -> Result<(), Box<dyn Error>> {
    // documents written by the CSV converter omit length_bytes; 19 code
    // units per element is assumed unless the options say otherwise
    let store = datetime_store(r#""fixed_length_utf32""#, 19)?;
    let array = Array::open(store, "/dt").await?;
    assert_eq!(
        array.data_type(),
        &DataType::FixedUnicode {
            code_units: NonZeroU32::new(19).unwrap()
        }
    );
    let elements = array.retrieve_range_elements::<String>(&(0..3)).await?;
    assert_eq!(elements, DATETIMES);

    let store = datetime_store(r#""fixed_length_utf32""#, 24)?;
    let mut options = MetadataOptions::default();
    options.set_default_string_code_units(NonZeroU32::new(24).unwrap());
    let array = Array::open_opt(store, "/dt", &options).await?;
    let elements = array.retrieve_range_elements::<String>(&(0..3)).await?;
    assert_eq!(elements, DATETIMES);
    Ok(())
}

#[tokio::test]
async fn retrieve_clamps_out_of_bounds_ranges() -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new();
    store.set(
        &"series/zarr.json".try_into()?,
        serde_json::json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": [5],
            "data_type": "int64",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2]}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": 0,
            "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}]
        })
        .to_string()
        .into_bytes(),
    );
    let values: Vec<i64> = vec![10, 20, 30, 40, 50];
    for (coordinate, chunk) in values.chunks(2).enumerate() {
        let bytes: Vec<u8> = chunk.iter().flat_map(|e| e.to_le_bytes()).collect();
        store.set(&format!("series/c/{coordinate}").as_str().try_into()?, bytes);
    }

    let array = Array::open(Arc::new(store), "/series").await?;
    assert_eq!(array.len(), 5);
    assert_eq!(array.retrieve_range_elements::<i64>(&(0..5)).await?, values);
    // the range is clamped to the array length
    assert_eq!(array.retrieve_range_elements::<i64>(&(3..10)).await?, [40, 50]);
    assert!(array.retrieve_range_elements::<i64>(&(7..9)).await?.is_empty());
    assert!(array.retrieve_range_elements::<i64>(&(2..2)).await?.is_empty());
    Ok(())
}
