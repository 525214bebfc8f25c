use aws_credential_types::provider::error::CredentialsError;
use snafu::Snafu;
use std::string::FromUtf8Error;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unable to decode certificate authority for cluster '{}': {}", cluster, source))]
    CertificateAuthority {
        cluster: String,
        source: base64::DecodeError,
    },

    #[snafu(display(
        "Token minted for cluster '{}' cannot be used for cluster '{}'",
        token_cluster,
        cluster
    ))]
    ClusterMismatch {
        cluster: String,
        token_cluster: String,
    },

    #[snafu(display("Certificate authority for cluster '{}' is empty", cluster))]
    EmptyCertificateAuthority { cluster: String },

    #[snafu(display("Unable to load AWS credentials for signing: {}", source))]
    Credentials { source: CredentialsError },

    #[snafu(display("A cluster name is required to sign a token request"))]
    EmptyClusterName,

    #[snafu(display("Cluster endpoint '{}' is not a valid https URL", endpoint))]
    Endpoint { endpoint: String },

    #[snafu(display("'{}' is not a valid region name", region))]
    InvalidRegion { region: String },

    #[snafu(display("Unable to build kubeconfig for cluster '{}': {}", cluster, source))]
    Kubeconfig {
        cluster: String,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to compute request signature: {}", source))]
    SigningKey { source: hmac::digest::InvalidLength },

    #[snafu(display("Unable to decode token: {}", source))]
    TokenDecode { source: base64::DecodeError },

    #[snafu(display("Token for cluster '{}' expired at {}", cluster, expired_at))]
    TokenExpired { cluster: String, expired_at: String },

    #[snafu(display("Token does not start with '{}'", prefix))]
    TokenPrefix { prefix: String },

    #[snafu(display("Decoded token is not valid UTF-8: {}", source))]
    TokenUtf8 { source: FromUtf8Error },
}

pub type Result<T> = std::result::Result<T, Error>;
