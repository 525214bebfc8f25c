use eks_inventory::control_plane::{
    AddonDescription, ClusterDescription, ControlPlane, Error, NodeGroupDescription, Result,
};
use std::collections::{BTreeMap, BTreeSet};

/// A cluster as the control plane reports it.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockCluster {
    pub(crate) description: ClusterDescription,
    pub(crate) node_groups: Vec<NodeGroupDescription>,
    pub(crate) addons: Vec<AddonDescription>,
}

/// A [`ControlPlane`] that serves clusters from memory so that the aggregator can be tested
/// without AWS.
#[derive(Debug, Default)]
pub(crate) struct MockControlPlane {
    regions: BTreeMap<String, Vec<MockCluster>>,
    failing_regions: BTreeSet<String>,
}

impl MockControlPlane {
    pub(crate) fn with_region(mut self, region: &str, clusters: Vec<MockCluster>) -> Self {
        self.regions.insert(region.to_string(), clusters);
        self
    }

    /// Listing clusters in `region` fails.
    pub(crate) fn with_failing_region(mut self, region: &str) -> Self {
        self.failing_regions.insert(region.to_string());
        self
    }

    fn cluster(&self, region: &str, cluster: &str) -> Result<&MockCluster> {
        self.regions
            .get(region)
            .and_then(|clusters| {
                clusters
                    .iter()
                    .find(|mock| mock.description.name == cluster)
            })
            .ok_or_else(|| Error::MissingField {
                what: format!("cluster '{}'", cluster),
                from: format!("region '{}'", region),
            })
    }
}

#[async_trait::async_trait]
impl ControlPlane for MockControlPlane {
    async fn list_clusters(&self, region: &str) -> Result<Vec<String>> {
        if self.failing_regions.contains(region) {
            return Err(Error::NoClient {
                region: region.to_string(),
            });
        }
        Ok(self
            .regions
            .get(region)
            .map(|clusters| {
                clusters
                    .iter()
                    .map(|mock| mock.description.name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_cluster(&self, region: &str, cluster: &str) -> Result<ClusterDescription> {
        Ok(self.cluster(region, cluster)?.description.clone())
    }

    async fn list_node_groups(&self, region: &str, cluster: &str) -> Result<Vec<String>> {
        Ok(self
            .cluster(region, cluster)?
            .node_groups
            .iter()
            .map(|node_group| node_group.name.clone())
            .collect())
    }

    async fn describe_node_group(
        &self,
        region: &str,
        cluster: &str,
        node_group: &str,
    ) -> Result<NodeGroupDescription> {
        self.cluster(region, cluster)?
            .node_groups
            .iter()
            .find(|description| description.name == node_group)
            .cloned()
            .ok_or_else(|| Error::MissingField {
                what: format!("node group '{}'", node_group),
                from: format!("cluster '{}'", cluster),
            })
    }

    async fn list_addons(&self, region: &str, cluster: &str) -> Result<Vec<String>> {
        Ok(self
            .cluster(region, cluster)?
            .addons
            .iter()
            .map(|addon| addon.name.clone())
            .collect())
    }

    async fn describe_addon(
        &self,
        region: &str,
        cluster: &str,
        addon: &str,
    ) -> Result<AddonDescription> {
        self.cluster(region, cluster)?
            .addons
            .iter()
            .find(|description| description.name == addon)
            .cloned()
            .ok_or_else(|| Error::MissingField {
                what: format!("add-on '{}'", addon),
                from: format!("cluster '{}'", cluster),
            })
    }
}
