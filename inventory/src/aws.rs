use crate::constants::{ASSUME_ROLE_SESSION_DURATION, ASSUME_ROLE_SESSION_NAME};
use aws_config::default_provider::credentials::default_provider;
use aws_config::sts::AssumeRoleProvider;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;
use aws_types::region::Region;
use aws_types::SdkConfig;
use log::info;
use std::time::Duration;

/// The credentials used for every region, both by the SDK clients and for minting cluster tokens.
/// If `assume_role` is given, the default credentials chain is used to assume it through STS in
/// `region`.
pub async fn credentials_provider(
    assume_role: Option<&str>,
    region: &str,
) -> SharedCredentialsProvider {
    let base_provider = SharedCredentialsProvider::new(default_provider().await);
    match assume_role {
        Some(role_arn) => {
            info!("Using credentials for assumed role '{}'", role_arn);
            SharedCredentialsProvider::new(
                AssumeRoleProvider::builder(role_arn)
                    .region(Region::new(region.to_string()))
                    .session_name(ASSUME_ROLE_SESSION_NAME)
                    .session_length(ASSUME_ROLE_SESSION_DURATION)
                    .build(base_provider),
            )
        }
        None => base_provider,
    }
}

/// SDK configuration for `region` with the standard retry policy and an operation timeout.
pub async fn sdk_config(
    region: &str,
    credentials: &SharedCredentialsProvider,
    timeout: Duration,
) -> SdkConfig {
    info!("Creating aws config for region '{}'", region);
    aws_config::from_env()
        .region(Region::new(region.to_string()))
        .credentials_provider(credentials.clone())
        .retry_config(RetryConfig::standard())
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(timeout)
                .operation_timeout(timeout)
                .build(),
        )
        .load()
        .await
}
