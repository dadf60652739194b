//! `StoreGateway` over an S3-compatible endpoint via `aws-sdk-s3`.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    error::{DisplayErrorContext, SdkError},
    primitives::{ByteStream, DateTime as SmithyDateTime},
};
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::SystemTime};
use tracing::{debug, instrument, warn};

use super::store::{Connector, StoreError, StoreGateway, StoreResult};
use crate::models::{object::ObjectRecord, source::SourceConfig};

const CREDENTIALS_PROVIDER: &str = "s3-resource-source";

pub struct S3Gateway {
    client: Client,
    bucket: String,
}

impl S3Gateway {
    /// Build a client for `source`. Does not touch the network.
    ///
    /// Uses static credentials and path-style addressing, which MinIO and
    /// most S3-compatible stores require.
    pub async fn connect(source: &SourceConfig) -> Self {
        let credentials = Credentials::new(
            source.access_key.clone(),
            source.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(source.region().to_string()))
            .credentials_provider(credentials)
            .endpoint_url(source.endpoint_url());

        if source.use_ssl() && source.skip_ssl_verification {
            warn!(endpoint = %source.endpoint, "TLS certificate verification disabled");
            loader = loader.http_client(insecure::http_client());
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        debug!(?source, "S3 client configured");
        Self {
            client: Client::from_conf(s3_config),
            bucket: source.bucket.clone(),
        }
    }
}

/// Connects to the endpoint named in the source.
pub struct S3Connector;

#[async_trait]
impl Connector for S3Connector {
    async fn connect(&self, source: &SourceConfig) -> Arc<dyn StoreGateway> {
        Arc::new(S3Gateway::connect(source).await)
    }
}

#[async_trait]
impl StoreGateway for S3Gateway {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn bucket_exists(&self) -> StoreResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let missing = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || http_status(&err) == Some(404);
                if missing {
                    debug!("bucket does not exist");
                    Ok(false)
                } else {
                    Err(classify("S3 HeadBucket", err))
                }
            }
        }
    }

    /// Automatically paginates through all results.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_objects(&self, prefix: &str) -> StoreResult<Vec<ObjectRecord>> {
        let mut records = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| {
                    if err.as_service_error().is_some_and(|e| e.is_no_such_bucket()) {
                        StoreError::BucketNotFound(self.bucket.clone())
                    } else {
                        classify("S3 ListObjectsV2", err)
                    }
                })?;

            for obj in resp.contents() {
                let Some(key) = obj.key() else {
                    continue;
                };
                let record = ObjectRecord::new(
                    key,
                    obj.e_tag().unwrap_or_default().trim_matches('"'),
                    to_utc(obj.last_modified()),
                    obj.size().unwrap_or(0).max(0) as u64,
                );
                if record.is_directory_marker() {
                    continue;
                }
                records.push(record);
            }

            match resp.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = records.len(), "listed objects");
        Ok(records)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get_object(&self, key: &str) -> StoreResult<ByteStream> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let missing = err.as_service_error().is_some_and(|e| e.is_no_such_key())
                    || http_status(&err) == Some(404);
                if missing {
                    StoreError::ObjectNotFound {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                    }
                } else {
                    classify("S3 GetObject", err)
                }
            })?;
        Ok(resp.body)
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket))]
    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        size: u64,
        content_type: &str,
    ) -> StoreResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(size as i64)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|err| classify("S3 PutObject", err))?;

        debug!(size, "object uploaded");
        Ok(())
    }
}

fn http_status<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|resp| resp.status().as_u16())
}

/// Map an SDK failure onto the gateway's error taxonomy.
fn classify<E>(operation: &str, err: SdkError<E>) -> StoreError
where
    E: std::error::Error + 'static,
{
    let detail = format!("{}: {}", operation, DisplayErrorContext(&err));
    match http_status(&err) {
        Some(401 | 403) => StoreError::PermissionDenied(detail),
        _ => StoreError::Connectivity(detail),
    }
}

fn to_utc(value: Option<&SmithyDateTime>) -> DateTime<Utc> {
    value
        .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// HTTP client for `skip_ssl_verification`: rustls with a verifier that
/// accepts any server certificate.
mod insecure {
    use super::*;
    use aws_sdk_s3::config::SharedHttpClient;
    use rustls::{
        Certificate, ClientConfig, ServerName,
        client::{ServerCertVerified, ServerCertVerifier},
    };

    struct AcceptAnyServerCert;

    impl ServerCertVerifier for AcceptAnyServerCert {
        fn verify_server_cert(
            &self,
            _end_entity: &Certificate,
            _intermediates: &[Certificate],
            _server_name: &ServerName,
            _scts: &mut dyn Iterator<Item = &[u8]>,
            _ocsp_response: &[u8],
            _now: SystemTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }
    }

    pub(super) fn http_client() -> SharedHttpClient {
        let tls = ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
            .with_no_client_auth();
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .build();
        HyperClientBuilder::new().build(connector)
    }
}
