use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Result};
use aws_sdk_s3::{
    operation::{get_object::GetObjectError, head_object::HeadObjectError},
    primitives::ByteStream,
};
use futures::lock::Mutex;
use log::debug;
use thiserror::Error;

pub use crate::object_storage::{S3Location, DEFAULT_PREFIX};

mod object_storage;

/// Blobs shorter than this are left behind by interrupted writes and are treated as missing.
pub const MIN_ARTIFACT_SIZE: u64 = 256;

const PARTIAL_SUFFIX: &str = ".partial";

pub struct CacheStore(StoreKind);

impl CacheStore {
    #[must_use]
    pub fn filesystem(directory: impl Into<PathBuf>) -> Self {
        Self(StoreKind::Filesystem {
            directory: directory.into(),
        })
    }

    #[must_use]
    pub const fn object_storage(location: S3Location) -> Self {
        Self(StoreKind::ObjectStorage { location })
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self(StoreKind::InMemory {
            map: Mutex::default(),
        })
    }

    /// Checks whether a valid artifact is stored under `key`.
    ///
    /// Errors are logged and reported as absence.
    pub async fn has(&self, key: &str) -> bool {
        match self.stored_size(key).await {
            Ok(size) => size.is_some_and(|size| size >= MIN_ARTIFACT_SIZE),
            Err(error) => {
                debug!("failed to look up {key} in {}: {error:?}", self.describe());
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let bytes = match self.kind() {
            StoreKind::Filesystem { directory } => {
                match fs_err::tokio::read(directory.join(key)).await {
                    Ok(bytes) => bytes,
                    Err(error) if error.kind() == ErrorKind::NotFound => {
                        return Err(not_found(key));
                    }
                    Err(error) => return Err(error.into()),
                }
            }
            StoreKind::ObjectStorage { location } => {
                let response = location
                    .client
                    .get_object()
                    .bucket(location.bucket.as_ref())
                    .key(location.key_for(key))
                    .send()
                    .await;

                match response {
                    Ok(output) => output.body.collect().await?.into_bytes().to_vec(),
                    Err(error)
                        if error
                            .as_service_error()
                            .is_some_and(GetObjectError::is_no_such_key) =>
                    {
                        return Err(not_found(key));
                    }
                    Err(error) => return Err(error.into()),
                }
            }
            StoreKind::InMemory { map } => map
                .lock()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| not_found(key))?,
        };

        let size = u64::try_from(bytes.len())?;

        ensure!(
            size >= MIN_ARTIFACT_SIZE,
            Error::ArtifactTooSmall {
                key: key.to_owned(),
                size,
            },
        );

        Ok(bytes)
    }

    /// Stores `bytes` under `key`, replacing any previous value.
    ///
    /// Filesystem writes go to a temporary file that is renamed into place afterwards.
    pub async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        match self.kind() {
            StoreKind::Filesystem { directory } => {
                let path = directory.join(key);
                let partial_path = directory.join(format!("{key}{PARTIAL_SUFFIX}"));

                fs_err::tokio::create_dir_all(directory).await?;
                fs_err::tokio::write(&partial_path, bytes).await?;
                fs_err::tokio::rename(partial_path, path).await?;
            }
            StoreKind::ObjectStorage { location } => {
                location
                    .client
                    .put_object()
                    .bucket(location.bucket.as_ref())
                    .key(location.key_for(key))
                    .body(ByteStream::from(bytes))
                    .send()
                    .await?;
            }
            StoreKind::InMemory { map } => {
                map.lock().await.insert(key.to_owned(), bytes);
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind() {
            StoreKind::Filesystem { directory } => directory.display().to_string(),
            StoreKind::ObjectStorage { location } => location.to_string(),
            StoreKind::InMemory { .. } => "in-memory".to_owned(),
        }
    }

    async fn stored_size(&self, key: &str) -> Result<Option<u64>> {
        match self.kind() {
            StoreKind::Filesystem { directory } => file_size(&directory.join(key)).await,
            StoreKind::ObjectStorage { location } => {
                let response = location
                    .client
                    .head_object()
                    .bucket(location.bucket.as_ref())
                    .key(location.key_for(key))
                    .send()
                    .await;

                match response {
                    Ok(output) => Ok(output
                        .content_length()
                        .map(u64::try_from)
                        .transpose()?),
                    Err(error)
                        if error
                            .as_service_error()
                            .is_some_and(HeadObjectError::is_not_found) =>
                    {
                        Ok(None)
                    }
                    Err(error) => Err(error.into()),
                }
            }
            StoreKind::InMemory { map } => map
                .lock()
                .await
                .get(key)
                .map(|bytes| u64::try_from(bytes.len()))
                .transpose()
                .map_err(Into::into),
        }
    }

    const fn kind(&self) -> &StoreKind {
        &self.0
    }
}

enum StoreKind {
    Filesystem { directory: PathBuf },
    ObjectStorage { location: S3Location },
    InMemory { map: Mutex<BTreeMap<String, Vec<u8>>> },
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("artifact {key} is not in the cache")]
    NotFound { key: String },
    #[error("artifact {key} is {size} bytes long, which is too short to be complete")]
    ArtifactTooSmall { key: String, size: u64 },
    #[error("S3 bucket is not configured")]
    MissingBucket,
    #[error("S3 {0} is not set in the environment")]
    MissingCredentials(&'static str),
}

fn not_found(key: &str) -> anyhow::Error {
    Error::NotFound {
        key: key.to_owned(),
    }
    .into()
}

async fn file_size(path: &Path) -> Result<Option<u64>> {
    match fs_err::tokio::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata.len())),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}
