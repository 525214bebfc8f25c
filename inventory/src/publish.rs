use crate::error::{self, Error, Result};
use aws_sdk_s3::model::BucketLocationConstraint;
use aws_sdk_s3::types::ByteStream;
use aws_types::region::Region;
use aws_types::SdkConfig;
use log::{debug, info};
use snafu::{ensure, ResultExt};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::AsyncWriteExt;

const S3_SCHEME: &str = "s3://";
const STDOUT: &str = "-";
/// Buckets in `us-east-1` have no location constraint.
const DEFAULT_BUCKET_REGION: &str = "us-east-1";
/// Legacy location constraint of buckets created in `eu-west-1`.
const LEGACY_EU_CONSTRAINT: &str = "EU";
const LEGACY_EU_REGION: &str = "eu-west-1";

/// Where the rendered report goes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutputLocation {
    S3 { bucket: String, key: String },
    File(PathBuf),
    Stdout,
}

impl FromStr for OutputLocation {
    type Err = Error;

    fn from_str(location: &str) -> Result<Self> {
        let location = location.trim();
        ensure!(
            !location.is_empty(),
            error::OutputLocationSnafu {
                output: location,
                reason: "location is empty",
            }
        );
        if location == STDOUT {
            return Ok(Self::Stdout);
        }
        match location.strip_prefix(S3_SCHEME) {
            Some(rest) => {
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                ensure!(
                    !bucket.is_empty() && !key.is_empty() && !key.ends_with('/'),
                    error::OutputLocationSnafu {
                        output: location,
                        reason: "expected s3://bucket/key",
                    }
                );
                Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            None => Ok(Self::File(PathBuf::from(location))),
        }
    }
}

impl Display for OutputLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputLocation::S3 { bucket, key } => write!(f, "{}{}/{}", S3_SCHEME, bucket, key),
            OutputLocation::File(path) => write!(f, "{}", path.display()),
            OutputLocation::Stdout => write!(f, "{}", STDOUT),
        }
    }
}

/// The region a bucket lives in, from its `GetBucketLocation` location constraint.
pub fn bucket_region(constraint: Option<&BucketLocationConstraint>) -> String {
    match constraint.map(|constraint| constraint.as_str()) {
        None | Some("") => DEFAULT_BUCKET_REGION.to_string(),
        Some(LEGACY_EU_CONSTRAINT) => LEGACY_EU_REGION.to_string(),
        Some(region) => region.to_string(),
    }
}

/// An S3 client for the region `bucket` lives in, so that uploads work whichever region `config`
/// is for.
async fn bucket_client(bucket: &str, config: &SdkConfig) -> Result<aws_sdk_s3::Client> {
    let output = aws_sdk_s3::Client::new(config)
        .get_bucket_location()
        .bucket(bucket)
        .send()
        .await
        .context(error::BucketLocationSnafu { bucket })?;
    let region = bucket_region(output.location_constraint());
    debug!("Bucket '{}' is in '{}'", bucket, region);
    let s3_config = aws_sdk_s3::config::Builder::from(config)
        .region(Region::new(region))
        .build();
    Ok(aws_sdk_s3::Client::from_conf(s3_config))
}

/// Store `body` at `location`. `config` is only used for S3 uploads, where it supplies the
/// credentials and the region the bucket location is looked up from.
pub async fn publish(
    body: Vec<u8>,
    content_type: &str,
    location: &OutputLocation,
    config: &SdkConfig,
) -> Result<()> {
    match location {
        OutputLocation::S3 { bucket, key } => {
            bucket_client(bucket, config)
                .await?
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(body))
                .send()
                .await
                .context(error::S3UploadSnafu { bucket, key })?;
        }
        OutputLocation::File(path) => {
            tokio::fs::write(path, &body)
                .await
                .context(error::WriteReportSnafu {
                    path: path.display().to_string(),
                })?;
        }
        OutputLocation::Stdout => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&body)
                .await
                .context(error::WriteReportSnafu { path: STDOUT })?;
            stdout
                .flush()
                .await
                .context(error::WriteReportSnafu { path: STDOUT })?;
        }
    }
    info!("Published inventory report to '{}'", location);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use aws_types::region::Region;

    #[test]
    fn locations_are_parsed() {
        assert_eq!(
            "s3://inventory-bucket/reports/eks.json"
                .parse::<OutputLocation>()
                .unwrap(),
            OutputLocation::S3 {
                bucket: "inventory-bucket".to_string(),
                key: "reports/eks.json".to_string(),
            }
        );
        assert_eq!(
            "./eks.json".parse::<OutputLocation>().unwrap(),
            OutputLocation::File(PathBuf::from("./eks.json"))
        );
        assert_eq!(
            "-".parse::<OutputLocation>().unwrap(),
            OutputLocation::Stdout
        );
    }

    #[test]
    fn incomplete_s3_locations_are_rejected() {
        for location in ["s3://bucket", "s3://bucket/", "s3:///key", "s3://bucket/dir/", ""] {
            assert!(
                location.parse::<OutputLocation>().is_err(),
                "'{}' should be rejected",
                location
            );
        }
    }

    #[test]
    fn rejected_location_is_named_in_error() {
        let error = "s3://bucket".parse::<OutputLocation>().unwrap_err();
        assert!(matches!(
            &error,
            Error::OutputLocation { output, .. } if output == "s3://bucket"
        ));
        assert!(error.to_string().contains("'s3://bucket'"));
    }

    #[test]
    fn bucket_region_from_location_constraint() {
        assert_eq!(bucket_region(None), "us-east-1");
        assert_eq!(
            bucket_region(Some(&BucketLocationConstraint::from(""))),
            "us-east-1"
        );
        assert_eq!(
            bucket_region(Some(&BucketLocationConstraint::from("EU"))),
            "eu-west-1"
        );
        assert_eq!(
            bucket_region(Some(&BucketLocationConstraint::from("ap-southeast-2"))),
            "ap-southeast-2"
        );
    }

    #[test]
    fn display_round_trips_s3() {
        let location = "s3://bucket/a/b.txt".parse::<OutputLocation>().unwrap();
        assert_eq!(location.to_string(), "s3://bucket/a/b.txt");
    }

    #[tokio::test]
    async fn report_is_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let config = SdkConfig::builder()
            .region(Region::new("us-west-2"))
            .build();
        publish(
            b"[]\n".to_vec(),
            "application/json",
            &OutputLocation::File(path.clone()),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("inventory.json");
        let config = SdkConfig::builder().build();
        let result = publish(
            Vec::new(),
            "application/json",
            &OutputLocation::File(path),
            &config,
        )
        .await;
        assert!(matches!(result, Err(Error::WriteReport { .. })));
    }
}
