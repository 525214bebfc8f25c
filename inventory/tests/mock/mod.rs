/*!

Mock implementations of [`ControlPlane`] and [`ClusterConnector`] so that an inventory pass can be
tested without AWS or Kubernetes.

!*/

pub(crate) mod cluster;
pub(crate) mod control_plane;

use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{future, ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use eks_inventory::cluster_api::DeploymentInfo;
use eks_inventory::control_plane::{AddonDescription, ClusterDescription, NodeGroupDescription};

/// Static credentials; signing never leaves the process.
pub(crate) fn credentials() -> SharedCredentialsProvider {
    SharedCredentialsProvider::new(Credentials::new(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        Some("session-token".to_string()),
        None,
        "mock",
    ))
}

/// A provider with nothing to offer, like the default chain on a host without credentials.
#[derive(Debug)]
struct NoCredentials;

impl ProvideCredentials for NoCredentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Err(CredentialsError::not_loaded(
            "no credentials in the environment",
        )))
    }
}

pub(crate) fn missing_credentials() -> SharedCredentialsProvider {
    SharedCredentialsProvider::new(NoCredentials)
}

pub(crate) fn description(name: &str, region: &str) -> ClusterDescription {
    ClusterDescription {
        name: name.to_string(),
        region: region.to_string(),
        version: "1.27".to_string(),
        status: "ACTIVE".to_string(),
        vpc_id: format!("vpc-{}", name),
        platform_version: "eks.5".to_string(),
        endpoint: Some(format!(
            "https://{}.gr7.{}.eks.amazonaws.com",
            name.to_uppercase(),
            region
        )),
        // "test certificate"
        certificate_authority_data: Some("dGVzdCBjZXJ0aWZpY2F0ZQ==".to_string()),
    }
}

pub(crate) fn node_group(name: &str, instance_types: &[&str]) -> NodeGroupDescription {
    NodeGroupDescription {
        name: name.to_string(),
        instance_types: instance_types.iter().map(|s| s.to_string()).collect(),
        ami_type: "AL2_x86_64".to_string(),
        version: "1.27".to_string(),
        release_version: "1.27.1-20230703".to_string(),
        status: "ACTIVE".to_string(),
        desired_size: Some(2),
    }
}

pub(crate) fn addon(name: &str, role_arn: Option<&str>) -> AddonDescription {
    AddonDescription {
        name: name.to_string(),
        version: "v1.0.0-eksbuild.1".to_string(),
        status: "ACTIVE".to_string(),
        service_account_role_arn: role_arn.map(str::to_string),
    }
}

pub(crate) fn deployment(name: &str, match_labels: &[(&str, &str)]) -> DeploymentInfo {
    DeploymentInfo {
        name: name.to_string(),
        match_labels: match_labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        status: "Available".to_string(),
        service_account: name.to_string(),
    }
}
