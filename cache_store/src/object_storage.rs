use core::fmt::{Display, Formatter, Result as FmtResult};
use std::{env, sync::Arc};

use anyhow::Result;
use aws_credential_types::{provider::SharedCredentialsProvider, Credentials};
use aws_sdk_s3::{
    config::{BehaviorVersion, Builder as S3ConfigBuilder},
    Client as S3Client,
};
use aws_types::region::Region;

use crate::Error;

pub const DEFAULT_PREFIX: &str = "cache/";

const DEFAULT_REGION: &str = "us-east-1";
const CREDENTIALS_PROVIDER_NAME: &str = "epoch_cacher";

/// Bucket and key prefix that artifacts are stored under.
pub struct S3Location {
    pub client: Arc<S3Client>,
    pub bucket: Arc<str>,
    pub prefix: Arc<str>,
}

impl Display for S3Location {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "s3://{}/{}", self.bucket, self.prefix)
    }
}

impl S3Location {
    /// Builds a client from `AWS_REGION`, `AWS_ENDPOINT_URL` and the usual credential variables.
    pub fn from_env(bucket: &str, prefix: &str) -> Result<Self> {
        if bucket.is_empty() {
            return Err(Error::MissingBucket.into());
        }

        let region = env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_owned());
        let endpoint = env::var("AWS_ENDPOINT_URL").ok();
        let client = build_s3_client(region, endpoint)?;

        Ok(Self {
            client: Arc::new(client),
            bucket: bucket.into(),
            prefix: normalize_prefix(prefix).into(),
        })
    }

    #[must_use]
    pub fn key_for(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.trim_start_matches('/'))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');

    if trimmed.is_empty() {
        return String::new();
    }

    format!("{trimmed}/")
}

fn build_s3_client(region: String, endpoint: Option<String>) -> Result<S3Client> {
    let access_key =
        env::var("AWS_ACCESS_KEY_ID").map_err(|_| Error::MissingCredentials("access key"))?;
    let secret_key =
        env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| Error::MissingCredentials("secret key"))?;
    let session_token = env::var("AWS_SESSION_TOKEN").ok();

    let credentials = Credentials::new(
        access_key,
        secret_key,
        session_token,
        None,
        CREDENTIALS_PROVIDER_NAME,
    );

    let mut builder = S3ConfigBuilder::new()
        .region(Region::new(region))
        .credentials_provider(SharedCredentialsProvider::new(credentials));

    if let Some(endpoint) = endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    let config = builder.behavior_version(BehaviorVersion::latest()).build();

    Ok(S3Client::from_conf(config))
}
