use crate::error::{self, Result};
use crate::sigv4::{self, ALGORITHM};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};
use log::debug;
use snafu::{ensure, ResultExt};
use std::fmt;
use std::time::Duration;

/// How long a presigned token request stays valid.
pub const TOKEN_EXPIRATION: Duration = Duration::from_secs(60);
/// The signed header that binds a token to a single cluster.
pub const CLUSTER_ID_HEADER: &str = "x-k8s-aws-id";

const SERVICE: &str = "sts";
const ACTION: &str = "GetCallerIdentity";
const STS_API_VERSION: &str = "2011-06-15";
const METHOD: &str = "GET";
const PATH: &str = "/";

/// Signs `sts:GetCallerIdentity` requests for one region with the credentials of an explicitly
/// provided credentials provider.
#[derive(Clone, Debug)]
pub struct CredentialSigner {
    provider: SharedCredentialsProvider,
    region: String,
}

impl CredentialSigner {
    pub fn new<S>(provider: SharedCredentialsProvider, region: S) -> Result<Self>
    where
        S: Into<String>,
    {
        let region = region.into();
        validate_region(&region)?;
        Ok(Self { provider, region })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign a token request for `cluster_name` at the current time.
    pub async fn sign(&self, cluster_name: &str) -> Result<SignedRequest> {
        self.sign_at(cluster_name, Utc::now()).await
    }

    /// Sign a token request for `cluster_name` as of `signed_at`.
    pub async fn sign_at(
        &self,
        cluster_name: &str,
        signed_at: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        let credentials = self
            .provider
            .provide_credentials()
            .await
            .context(error::CredentialsSnafu)?;
        presign(&credentials, &self.region, cluster_name, signed_at)
    }
}

/// A presigned `GET` request against the regional STS endpoint. The body is always empty.
#[derive(Clone, Eq, PartialEq)]
pub struct SignedRequest {
    host: String,
    headers: Vec<(String, String)>,
    canonical_query: String,
    signature: String,
    cluster_name: String,
    region: String,
    signed_at: DateTime<Utc>,
}

impl SignedRequest {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn signed_at(&self) -> DateTime<Utc> {
        self.signed_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.signed_at + chrono::Duration::seconds(TOKEN_EXPIRATION.as_secs() as i64)
    }

    /// The presigned URL: the signed query followed by `X-Amz-Signature`.
    pub fn presigned_url(&self) -> String {
        format!(
            "https://{}{}?{}&X-Amz-Signature={}",
            self.host, PATH, self.canonical_query, self.signature
        )
    }
}

// The signature and the query (which may carry a session token) stay out of logs.
impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequest")
            .field("method", &METHOD)
            .field("host", &self.host)
            .field("cluster_name", &self.cluster_name)
            .field("region", &self.region)
            .field("signed_at", &self.signed_at)
            .finish_non_exhaustive()
    }
}

/// Presign an STS `GetCallerIdentity` request bound to `cluster_name`.
pub fn presign(
    credentials: &Credentials,
    region: &str,
    cluster_name: &str,
    signed_at: DateTime<Utc>,
) -> Result<SignedRequest> {
    ensure!(!cluster_name.trim().is_empty(), error::EmptyClusterNameSnafu);
    validate_region(region)?;

    let host = sts_host(region);
    let amz_date = signed_at.format("%Y%m%dT%H%M%SZ").to_string();
    let date = signed_at.format("%Y%m%d").to_string();
    let scope = sigv4::credential_scope(&date, region, SERVICE);
    let headers = vec![
        ("host".to_string(), host.clone()),
        (CLUSTER_ID_HEADER.to_string(), cluster_name.to_string()),
    ];
    let (_, signed_headers) = sigv4::canonical_headers(&headers);

    let mut params = vec![
        ("Action".to_string(), ACTION.to_string()),
        ("Version".to_string(), STS_API_VERSION.to_string()),
        ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
        (
            "X-Amz-Credential".to_string(),
            format!("{}/{}", credentials.access_key_id(), scope),
        ),
        ("X-Amz-Date".to_string(), amz_date.clone()),
        (
            "X-Amz-Expires".to_string(),
            TOKEN_EXPIRATION.as_secs().to_string(),
        ),
        ("X-Amz-SignedHeaders".to_string(), signed_headers),
    ];
    if let Some(session_token) = credentials.session_token() {
        params.push((
            "X-Amz-Security-Token".to_string(),
            session_token.to_string(),
        ));
    }

    let canonical_query = sigv4::canonical_query(&params);
    let canonical_request = sigv4::canonical_request(
        METHOD,
        PATH,
        &canonical_query,
        &headers,
        &sigv4::sha256_hex(b""),
    );
    let string_to_sign = sigv4::string_to_sign(&amz_date, &scope, &canonical_request);
    let signing_key =
        sigv4::signing_key(credentials.secret_access_key(), &date, region, SERVICE)?;
    let signature = sigv4::signature(&signing_key, &string_to_sign)?;
    debug!(
        "Signed token request for cluster '{}' in '{}' at {}",
        cluster_name, region, amz_date
    );

    Ok(SignedRequest {
        host,
        headers,
        canonical_query,
        signature,
        cluster_name: cluster_name.to_string(),
        region: region.to_string(),
        signed_at,
    })
}

fn sts_host(region: &str) -> String {
    if region.starts_with("cn-") {
        format!("sts.{}.amazonaws.com.cn", region)
    } else {
        format!("sts.{}.amazonaws.com", region)
    }
}

fn validate_region(region: &str) -> Result<()> {
    ensure!(
        !region.is_empty()
            && region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
        error::InvalidRegionSnafu { region }
    );
    Ok(())
}
