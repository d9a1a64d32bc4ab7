//! A HTTP store.

use crate::storage::{AsyncReadableStorageTraits, MaybeBytes, StorageError, StoreKey};

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use std::str::FromStr;

/// A HTTP store.
#[derive(Debug)]
pub struct HTTPStore {
    base_url: Url,
    client: Client,
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<url::ParseError> for StorageError {
    fn from(err: url::ParseError) -> Self {
        Self::Other(err.to_string())
    }
}

impl HTTPStore {
    /// Create a new HTTP store at a given `base_url`.
    ///
    /// # Errors
    ///
    /// Returns a [`HTTPStoreCreateError`] if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<HTTPStore, HTTPStoreCreateError> {
        let base_url = Url::from_str(base_url)
            .map_err(|_| HTTPStoreCreateError::InvalidBaseURL(base_url.into()))?;
        Ok(HTTPStore {
            base_url,
            client: Client::new(),
        })
    }

    /// Maps a [`StoreKey`] to a HTTP [`Url`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn key_to_url(&self, key: &StoreKey) -> Result<Url, url::ParseError> {
        let url = self.base_url.as_str().trim_end_matches('/').to_string() + "/" + key.as_str();
        Url::parse(&url)
    }
}

#[async_trait::async_trait]
impl AsyncReadableStorageTraits for HTTPStore {
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let url = self.key_to_url(key)?;
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.bytes().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(StorageError::from(format!(
                "http unexpected status code: {}",
                response.status()
            ))),
        }
    }
}

/// A HTTP store creation error.
#[derive(Debug, Error)]
pub enum HTTPStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The url is not valid.
    #[error("base url {0} is not valid")]
    InvalidBaseURL(String),
}
