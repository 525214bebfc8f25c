use async_trait::async_trait;
use aws_sdk_eks::error::{
    DescribeAddonError, DescribeAddonErrorKind, DescribeClusterError, DescribeClusterErrorKind,
    DescribeNodegroupError, DescribeNodegroupErrorKind, ListAddonsError, ListClustersError,
    ListNodegroupsError,
};
use aws_sdk_eks::model::{Addon, Cluster, Nodegroup};
use aws_sdk_eks::types::SdkError;
use aws_types::SdkConfig;
use eks_auth::ClusterConnection;
use log::{debug, trace};
use snafu::{OptionExt, ResultExt, Snafu};
use std::collections::HashMap;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    #[snafu(display("Unable to describe add-on '{}' of cluster '{}': {}", addon, cluster, source))]
    DescribeAddon {
        cluster: String,
        addon: String,
        source: SdkError<DescribeAddonError>,
    },

    #[snafu(display("Unable to describe cluster '{}': {}", cluster, source))]
    DescribeCluster {
        cluster: String,
        source: SdkError<DescribeClusterError>,
    },

    #[snafu(display(
        "Unable to describe node group '{}' of cluster '{}': {}",
        node_group,
        cluster,
        source
    ))]
    DescribeNodegroup {
        cluster: String,
        node_group: String,
        source: SdkError<DescribeNodegroupError>,
    },

    #[snafu(display("Unable to list add-ons of cluster '{}': {}", cluster, source))]
    ListAddons {
        cluster: String,
        source: SdkError<ListAddonsError>,
    },

    #[snafu(display("Unable to list clusters in '{}': {}", region, source))]
    ListClusters {
        region: String,
        source: SdkError<ListClustersError>,
    },

    #[snafu(display("Unable to list node groups of cluster '{}': {}", cluster, source))]
    ListNodegroups {
        cluster: String,
        source: SdkError<ListNodegroupsError>,
    },

    #[snafu(display("{} was missing from {}", what, from))]
    MissingField { what: String, from: String },

    #[snafu(display("No EKS client is configured for region '{}'", region))]
    NoClient { region: String },
}

impl Error {
    /// Whether the named cluster, node group or add-on does not exist (anymore).
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::DescribeAddon {
                source: SdkError::ServiceError(service_error),
                ..
            } => matches!(
                &service_error.err().kind,
                DescribeAddonErrorKind::ResourceNotFoundException(_)
            ),
            Error::DescribeCluster {
                source: SdkError::ServiceError(service_error),
                ..
            } => matches!(
                &service_error.err().kind,
                DescribeClusterErrorKind::ResourceNotFoundException(_)
            ),
            Error::DescribeNodegroup {
                source: SdkError::ServiceError(service_error),
                ..
            } => matches!(
                &service_error.err().kind,
                DescribeNodegroupErrorKind::ResourceNotFoundException(_)
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterDescription {
    pub name: String,
    pub region: String,
    pub version: String,
    pub status: String,
    pub vpc_id: String,
    pub platform_version: String,
    pub endpoint: Option<String>,
    pub certificate_authority_data: Option<String>,
}

impl ClusterDescription {
    /// The endpoint and certificate authority needed to reach the cluster API server. Clusters
    /// that are still being created have neither.
    pub fn connection(&self) -> Result<ClusterConnection> {
        let from = format!("cluster '{}'", self.name);
        Ok(ClusterConnection {
            name: self.name.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone().context(MissingFieldSnafu {
                what: "endpoint",
                from: &from,
            })?,
            certificate_authority_data: self.certificate_authority_data.clone().context(
                MissingFieldSnafu {
                    what: "certificate authority data",
                    from: &from,
                },
            )?,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NodeGroupDescription {
    pub name: String,
    pub instance_types: Vec<String>,
    pub ami_type: String,
    pub version: String,
    pub release_version: String,
    pub status: String,
    pub desired_size: Option<i32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddonDescription {
    pub name: String,
    pub version: String,
    pub status: String,
    pub service_account_role_arn: Option<String>,
}

/// Read-only access to the EKS control plane of each region.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Cluster names in listing order.
    async fn list_clusters(&self, region: &str) -> Result<Vec<String>>;

    async fn describe_cluster(&self, region: &str, cluster: &str) -> Result<ClusterDescription>;

    async fn list_node_groups(&self, region: &str, cluster: &str) -> Result<Vec<String>>;

    async fn describe_node_group(
        &self,
        region: &str,
        cluster: &str,
        node_group: &str,
    ) -> Result<NodeGroupDescription>;

    async fn list_addons(&self, region: &str, cluster: &str) -> Result<Vec<String>>;

    async fn describe_addon(
        &self,
        region: &str,
        cluster: &str,
        addon: &str,
    ) -> Result<AddonDescription>;
}

/// [`ControlPlane`] backed by one `aws-sdk-eks` client per region.
#[derive(Debug)]
pub struct EksControlPlane {
    clients: HashMap<String, aws_sdk_eks::Client>,
}

impl EksControlPlane {
    /// Create a client for each config, keyed by the config's region. Configs without a region
    /// are ignored.
    pub fn new(configs: &[SdkConfig]) -> Self {
        let clients = configs
            .iter()
            .filter_map(|config| {
                config
                    .region()
                    .map(|region| (region.to_string(), aws_sdk_eks::Client::new(config)))
            })
            .collect();
        Self { clients }
    }

    fn client(&self, region: &str) -> Result<&aws_sdk_eks::Client> {
        self.clients.get(region).context(NoClientSnafu { region })
    }
}

#[async_trait]
impl ControlPlane for EksControlPlane {
    async fn list_clusters(&self, region: &str) -> Result<Vec<String>> {
        let client = self.client(region)?;
        let mut clusters = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = client
                .list_clusters()
                .set_next_token(next_token.clone())
                .send()
                .await
                .context(ListClustersSnafu { region })?;
            clusters.extend(output.clusters().unwrap_or_default().iter().cloned());
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        debug!("Found {} cluster(s) in '{}'", clusters.len(), region);
        Ok(clusters)
    }

    async fn describe_cluster(&self, region: &str, cluster: &str) -> Result<ClusterDescription> {
        let output = self
            .client(region)?
            .describe_cluster()
            .name(cluster)
            .send()
            .await
            .context(DescribeClusterSnafu { cluster })?;
        let described = output.cluster().context(MissingFieldSnafu {
            what: "cluster",
            from: "DescribeCluster response",
        })?;
        trace!("Described cluster '{}': {:?}", cluster, described.status());
        Ok(cluster_description(region, cluster, described))
    }

    async fn list_node_groups(&self, region: &str, cluster: &str) -> Result<Vec<String>> {
        let client = self.client(region)?;
        let mut node_groups = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = client
                .list_nodegroups()
                .cluster_name(cluster)
                .set_next_token(next_token.clone())
                .send()
                .await
                .context(ListNodegroupsSnafu { cluster })?;
            node_groups.extend(output.nodegroups().unwrap_or_default().iter().cloned());
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(node_groups)
    }

    async fn describe_node_group(
        &self,
        region: &str,
        cluster: &str,
        node_group: &str,
    ) -> Result<NodeGroupDescription> {
        let output = self
            .client(region)?
            .describe_nodegroup()
            .cluster_name(cluster)
            .nodegroup_name(node_group)
            .send()
            .await
            .context(DescribeNodegroupSnafu {
                cluster,
                node_group,
            })?;
        let described = output.nodegroup().context(MissingFieldSnafu {
            what: "nodegroup",
            from: "DescribeNodegroup response",
        })?;
        Ok(node_group_description(node_group, described))
    }

    async fn list_addons(&self, region: &str, cluster: &str) -> Result<Vec<String>> {
        let client = self.client(region)?;
        let mut addons = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = client
                .list_addons()
                .cluster_name(cluster)
                .set_next_token(next_token.clone())
                .send()
                .await
                .context(ListAddonsSnafu { cluster })?;
            addons.extend(output.addons().unwrap_or_default().iter().cloned());
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(addons)
    }

    async fn describe_addon(
        &self,
        region: &str,
        cluster: &str,
        addon: &str,
    ) -> Result<AddonDescription> {
        let output = self
            .client(region)?
            .describe_addon()
            .cluster_name(cluster)
            .addon_name(addon)
            .send()
            .await
            .context(DescribeAddonSnafu { cluster, addon })?;
        let described = output.addon().context(MissingFieldSnafu {
            what: "addon",
            from: "DescribeAddon response",
        })?;
        Ok(addon_description(addon, described))
    }
}

fn cluster_description(region: &str, name: &str, cluster: &Cluster) -> ClusterDescription {
    ClusterDescription {
        name: name.to_string(),
        region: region.to_string(),
        version: cluster.version().unwrap_or_default().to_string(),
        status: cluster
            .status()
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        vpc_id: cluster
            .resources_vpc_config()
            .and_then(|vpc_config| vpc_config.vpc_id())
            .unwrap_or_default()
            .to_string(),
        platform_version: cluster.platform_version().unwrap_or_default().to_string(),
        endpoint: cluster.endpoint().map(String::from),
        certificate_authority_data: cluster
            .certificate_authority()
            .and_then(|certificate| certificate.data())
            .map(String::from),
    }
}

fn node_group_description(name: &str, node_group: &Nodegroup) -> NodeGroupDescription {
    NodeGroupDescription {
        name: name.to_string(),
        instance_types: node_group.instance_types().unwrap_or_default().to_vec(),
        ami_type: node_group
            .ami_type()
            .map(|ami_type| ami_type.as_str().to_string())
            .unwrap_or_default(),
        version: node_group.version().unwrap_or_default().to_string(),
        release_version: node_group.release_version().unwrap_or_default().to_string(),
        status: node_group
            .status()
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        desired_size: node_group
            .scaling_config()
            .and_then(|scaling| scaling.desired_size()),
    }
}

fn addon_description(name: &str, addon: &Addon) -> AddonDescription {
    AddonDescription {
        name: name.to_string(),
        version: addon.addon_version().unwrap_or_default().to_string(),
        status: addon
            .status()
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        service_account_role_arn: addon.service_account_role_arn().map(String::from),
    }
}
