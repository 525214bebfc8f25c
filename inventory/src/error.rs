use crate::model::FailureKind;
use crate::{cluster_api, control_plane};
use aws_sdk_s3::error::{GetBucketLocationError, PutObjectError};
use aws_sdk_s3::types::SdkError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unable to find the region of bucket '{}': {}", bucket, source))]
    BucketLocation {
        bucket: String,
        source: SdkError<GetBucketLocationError>,
    },

    #[snafu(display("Unable to query cluster '{}': {}", cluster, source))]
    ClusterApi {
        cluster: String,
        source: cluster_api::Error,
    },

    #[snafu(display("Invalid configuration: {}", what))]
    Config { what: String },

    #[snafu(display("Control plane request for cluster '{}' failed: {}", cluster, source))]
    ControlPlane {
        cluster: String,
        source: control_plane::Error,
    },

    #[snafu(display("Unable to authenticate to cluster '{}': {}", cluster, source))]
    Credential {
        cluster: String,
        source: eks_auth::Error,
    },

    #[snafu(display("Inventory is incomplete: {} cluster(s) or region(s) failed", count))]
    Incomplete { count: usize },

    #[snafu(display("Invalid output location '{}': {}", output, reason))]
    OutputLocation { output: String, reason: String },

    #[snafu(display("Unable to serialize inventory: {}", source))]
    RenderJson { source: serde_json::Error },

    #[snafu(display("Unable to build inventory workbook: {}", source))]
    RenderXlsx {
        source: rust_xlsxwriter::XlsxError,
    },

    #[snafu(display("Unable to upload report to 's3://{}/{}': {}", bucket, key, source))]
    S3Upload {
        bucket: String,
        key: String,
        source: SdkError<PutObjectError>,
    },

    #[snafu(display("Unable to write report to '{}': {}", path, source))]
    WriteReport {
        path: String,
        source: std::io::Error,
    },
}

impl Error {
    /// How a per-cluster error is reported. `None` for errors that concern the whole run.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::Credential { .. } => Some(FailureKind::Credential),
            Error::ClusterApi { .. } => Some(FailureKind::ClusterUnreachable),
            Error::ControlPlane { .. } => Some(FailureKind::UpstreamService),
            Error::BucketLocation { .. }
            | Error::Config { .. }
            | Error::Incomplete { .. }
            | Error::OutputLocation { .. }
            | Error::RenderJson { .. }
            | Error::RenderXlsx { .. }
            | Error::S3Upload { .. }
            | Error::WriteReport { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
