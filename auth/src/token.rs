use crate::error::{self, Result};
use crate::signer::SignedRequest;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use snafu::{OptionExt, ResultExt};
use std::fmt;

/// The literal every EKS bearer token starts with.
pub const TOKEN_PREFIX: &str = "k8s-aws-v1.";

/// A bearer token accepted by the EKS API server. The value is never printed: `Debug` redacts it
/// and there is no `Display` or `Serialize` implementation.
#[derive(Clone, Eq, PartialEq)]
pub struct BearerToken {
    value: String,
    cluster_name: String,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    /// Base64url-encode the presigned URL of `request`, drop every trailing `=` and add the
    /// `k8s-aws-v1.` prefix.
    pub fn encode(request: &SignedRequest) -> Self {
        let encoded = URL_SAFE.encode(request.presigned_url());
        Self {
            value: format!("{}{}", TOKEN_PREFIX, encoded.trim_end_matches('=')),
            cluster_name: request.cluster_name().to_string(),
            expires_at: request.expires_at(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The cluster this token was minted for.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"<redacted>")
            .field("cluster_name", &self.cluster_name)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Recover the presigned URL from a bearer token.
pub fn decode(token: &str) -> Result<String> {
    let encoded = token
        .strip_prefix(TOKEN_PREFIX)
        .context(error::TokenPrefixSnafu {
            prefix: TOKEN_PREFIX,
        })?;
    let mut padded = encoded.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = URL_SAFE
        .decode(padded.as_bytes())
        .context(error::TokenDecodeSnafu)?;
    String::from_utf8(bytes).context(error::TokenUtf8Snafu)
}
