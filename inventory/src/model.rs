use crate::cluster_api::DeploymentInfo;
use crate::config::GpuClassifier;
use crate::control_plane::{AddonDescription, NodeGroupDescription};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Everything collected about one cluster during a single pass.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInventory {
    pub name: String,
    pub region: String,
    /// Kubernetes version, e.g. `1.27`.
    pub version: String,
    pub status: String,
    pub vpc_id: String,
    pub platform_version: String,
    pub node_groups: Vec<NodeGroupRecord>,
    /// Managed add-ons followed by the configured workloads, in lookup order.
    pub addons: Vec<AddonRecord>,
    /// Every pod in the inventoried namespace.
    pub namespace_pods: Vec<String>,
    /// Configured workloads that have no deployment in the namespace.
    pub absent_workloads: Vec<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroupRecord {
    pub name: String,
    pub instance_types: Vec<String>,
    pub ami_type: String,
    pub is_gpu: bool,
    pub version: String,
    pub release_version: String,
    pub status: String,
    pub desired_size: Option<i32>,
}

impl NodeGroupRecord {
    pub fn new(description: NodeGroupDescription, classifier: &GpuClassifier) -> Self {
        let mut instance_types: Vec<String> = Vec::new();
        for instance_type in description.instance_types {
            if !instance_types.contains(&instance_type) {
                instance_types.push(instance_type);
            }
        }
        Self {
            is_gpu: classifier.is_gpu(&instance_types),
            name: description.name,
            instance_types,
            ami_type: description.ami_type,
            version: description.version,
            release_version: description.release_version,
            status: description.status,
            desired_size: description.desired_size,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkloadKind {
    ManagedAddon,
    Workload,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonRecord {
    pub name: String,
    pub kind: WorkloadKind,
    /// Empty for workloads that are not managed add-ons.
    pub version: String,
    pub status: String,
    pub service_account: String,
    pub pods: Vec<String>,
}

impl AddonRecord {
    pub fn managed(description: AddonDescription, pods: Vec<String>) -> Self {
        // Only the role name is reported, e.g. `AmazonEKS_EBS_CSI_DriverRole`.
        let service_account = description
            .service_account_role_arn
            .as_deref()
            .and_then(|arn| arn.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        Self {
            name: description.name,
            kind: WorkloadKind::ManagedAddon,
            version: description.version,
            status: description.status,
            service_account,
            pods,
        }
    }

    /// A deployment that is not a managed add-on. Its status is the deployment's first
    /// condition.
    pub fn workload(deployment: DeploymentInfo, pods: Vec<String>) -> Self {
        Self {
            name: deployment.name,
            kind: WorkloadKind::Workload,
            version: String::new(),
            status: deployment.status,
            service_account: deployment.service_account,
            pods,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// A token could not be minted or the client configuration was invalid.
    Credential,
    /// The cluster API server could not be queried.
    ClusterUnreachable,
    /// The EKS control plane returned an error.
    UpstreamService,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Credential => write!(f, "credential"),
            FailureKind::ClusterUnreachable => write!(f, "cluster unreachable"),
            FailureKind::UpstreamService => write!(f, "upstream service"),
        }
    }
}

/// A cluster (or a whole region, when `cluster` is `None`) that was skipped.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFailure {
    pub region: String,
    pub cluster: Option<String>,
    pub kind: FailureKind,
    pub reason: String,
}

impl Display for ClusterFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cluster {
            Some(cluster) => write!(
                f,
                "{} ({}) [{}]: {}",
                cluster, self.region, self.kind, self.reason
            ),
            None => write!(f, "region {} [{}]: {}", self.region, self.kind, self.reason),
        }
    }
}

/// The outcome of one inventory pass. Failures do not prevent the other clusters from being
/// reported.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub clusters: Vec<ClusterInventory>,
    pub failures: Vec<ClusterFailure>,
}

impl InventoryReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn node_group_instance_types_are_deduplicated_in_order() {
        let record = NodeGroupRecord::new(
            NodeGroupDescription {
                name: "mixed".to_string(),
                instance_types: vec![
                    "m5.large".to_string(),
                    "g5.xlarge".to_string(),
                    "m5.large".to_string(),
                ],
                ..Default::default()
            },
            &GpuClassifier::default(),
        );
        assert_eq!(record.instance_types, vec!["m5.large", "g5.xlarge"]);
        assert!(record.is_gpu);
    }

    #[test]
    fn managed_addon_reports_role_name() {
        let record = AddonRecord::managed(
            AddonDescription {
                name: "aws-ebs-csi-driver".to_string(),
                version: "v1.19.0-eksbuild.2".to_string(),
                status: "ACTIVE".to_string(),
                service_account_role_arn: Some(
                    "arn:aws:iam::111122223333:role/AmazonEKS_EBS_CSI_DriverRole".to_string(),
                ),
            },
            vec![],
        );
        assert_eq!(record.service_account, "AmazonEKS_EBS_CSI_DriverRole");
        assert_eq!(record.kind, WorkloadKind::ManagedAddon);

        let without_role = AddonRecord::managed(
            AddonDescription {
                name: "coredns".to_string(),
                ..Default::default()
            },
            vec![],
        );
        assert_eq!(without_role.service_account, "");
    }

    #[test]
    fn workload_takes_status_from_deployment() {
        let record = AddonRecord::workload(
            DeploymentInfo {
                name: "aws-load-balancer-controller".to_string(),
                status: "Available".to_string(),
                service_account: "aws-load-balancer-controller".to_string(),
                ..Default::default()
            },
            vec!["aws-load-balancer-controller-7d9f-abcde".to_string()],
        );
        assert_eq!(record.kind, WorkloadKind::Workload);
        assert_eq!(record.version, "");
        assert_eq!(record.status, "Available");
        assert_eq!(record.pods.len(), 1);
    }

    #[test]
    fn failure_display_names_cluster_or_region() {
        let cluster = ClusterFailure {
            region: "us-west-2".to_string(),
            cluster: Some("prod".to_string()),
            kind: FailureKind::ClusterUnreachable,
            reason: "timed out".to_string(),
        };
        assert_eq!(
            cluster.to_string(),
            "prod (us-west-2) [cluster unreachable]: timed out"
        );
        let region = ClusterFailure {
            cluster: None,
            kind: FailureKind::UpstreamService,
            ..cluster
        };
        assert_eq!(
            region.to_string(),
            "region us-west-2 [upstream service]: timed out"
        );
    }
}
