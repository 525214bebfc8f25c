use crate::cluster_api::{resolve_workload, ClusterConnector, WorkloadApi, WorkloadLookup};
use crate::config::InventorySettings;
use crate::control_plane::{AddonDescription, ControlPlane, NodeGroupDescription};
use crate::error::{self, Result};
use crate::model::{
    AddonRecord, ClusterFailure, ClusterInventory, FailureKind, InventoryReport, NodeGroupRecord,
};
use aws_credential_types::provider::SharedCredentialsProvider;
use eks_auth::{BearerToken, ClientConfiguration, CredentialSigner};
use futures::{stream, StreamExt};
use log::{debug, info, warn};
use snafu::ResultExt;

/// Runs one inventory pass over every configured region.
pub struct Aggregator<P, C> {
    control_plane: P,
    connector: C,
    credentials: SharedCredentialsProvider,
    settings: InventorySettings,
}

impl<P, C> Aggregator<P, C>
where
    P: ControlPlane,
    C: ClusterConnector,
{
    pub fn new(
        control_plane: P,
        connector: C,
        credentials: SharedCredentialsProvider,
        settings: InventorySettings,
    ) -> Self {
        Self {
            control_plane,
            connector,
            credentials,
            settings,
        }
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Inventory every cluster. Regions are reported in the configured order and clusters in
    /// listing order. A failing cluster or region is recorded in the report and skipped.
    pub async fn run(&self) -> InventoryReport {
        let mut report = InventoryReport::default();
        for region in &self.settings.regions {
            let names = match self.control_plane.list_clusters(region).await {
                Ok(names) => names,
                Err(e) => {
                    warn!("Unable to list clusters in '{}': {}", region, e);
                    report.failures.push(ClusterFailure {
                        region: region.clone(),
                        cluster: None,
                        kind: FailureKind::UpstreamService,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if names.is_empty() {
                info!("No clusters found in '{}'", region);
                continue;
            }
            info!("Found {} cluster(s) in '{}'", names.len(), region);

            let signer = match CredentialSigner::new(self.credentials.clone(), region.as_str()) {
                Ok(signer) => signer,
                Err(e) => {
                    warn!("Unable to sign requests for '{}': {}", region, e);
                    report.failures.push(ClusterFailure {
                        region: region.clone(),
                        cluster: None,
                        kind: FailureKind::Credential,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let results: Vec<(String, Result<ClusterInventory>)> = stream::iter(names)
                .map(|name| self.inventory_entry(&signer, region, name))
                .buffered(self.settings.concurrency)
                .collect()
                .await;

            for (name, result) in results {
                match result {
                    Ok(inventory) => report.clusters.push(inventory),
                    Err(e) => {
                        let kind = e.failure_kind().unwrap_or(FailureKind::UpstreamService);
                        warn!("Skipping cluster '{}' in '{}': {}", name, region, e);
                        report.failures.push(ClusterFailure {
                            region: region.clone(),
                            cluster: Some(name),
                            kind,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        report
    }

    async fn inventory_entry(
        &self,
        signer: &CredentialSigner,
        region: &str,
        name: String,
    ) -> (String, Result<ClusterInventory>) {
        let result = self.inventory_cluster(signer, region, &name).await;
        (name, result)
    }

    /// Collect everything about one cluster. Any error makes the whole cluster fail; missing
    /// node groups, add-ons and deployments are skipped.
    pub async fn inventory_cluster(
        &self,
        signer: &CredentialSigner,
        region: &str,
        name: &str,
    ) -> Result<ClusterInventory> {
        info!("Inventorying cluster '{}' in '{}'", name, region);
        let description = self
            .control_plane
            .describe_cluster(region, name)
            .await
            .context(error::ControlPlaneSnafu { cluster: name })?;

        let node_groups = self
            .node_groups(region, name)
            .await?
            .into_iter()
            .map(|node_group| NodeGroupRecord::new(node_group, &self.settings.gpu))
            .collect();
        let addons = self.addons(region, name).await?;

        // The token is minted for this cluster only and lives as long as this configuration.
        let connection = description
            .connection()
            .context(error::ControlPlaneSnafu { cluster: name })?;
        let signed = signer
            .sign(name)
            .await
            .context(error::CredentialSnafu { cluster: name })?;
        let configuration = ClientConfiguration::assemble(connection, BearerToken::encode(&signed))
            .context(error::CredentialSnafu { cluster: name })?;
        let api = self
            .connector
            .connect(&configuration)
            .await
            .context(error::ClusterApiSnafu { cluster: name })?;

        let namespace = self.settings.namespace.as_str();
        let namespace_pods = api
            .list_pods(namespace, None)
            .await
            .context(error::ClusterApiSnafu { cluster: name })?;
        debug!(
            "Found {} pod(s) in '{}' of cluster '{}'",
            namespace_pods.len(),
            namespace,
            name
        );

        let mut records = Vec::new();
        for addon in addons {
            let workload = self.settings.addon_workload(&addon.name).to_string();
            let lookup = resolve_workload(&api, namespace, &workload)
                .await
                .context(error::ClusterApiSnafu { cluster: name })?;
            let pods = match lookup {
                WorkloadLookup::Found { pods, .. } => pods,
                WorkloadLookup::Absent => {
                    info!(
                        "Add-on '{}' of cluster '{}' has no deployment '{}' in '{}'",
                        addon.name, name, workload, namespace
                    );
                    Vec::new()
                }
            };
            records.push(AddonRecord::managed(addon, pods));
        }

        let mut absent_workloads = Vec::new();
        for workload in &self.settings.workloads {
            let lookup = resolve_workload(&api, namespace, workload)
                .await
                .context(error::ClusterApiSnafu { cluster: name })?;
            match lookup {
                WorkloadLookup::Found { deployment, pods } => {
                    records.push(AddonRecord::workload(deployment, pods))
                }
                WorkloadLookup::Absent => {
                    info!(
                        "Deployment '{}' was not found in '{}' of cluster '{}'",
                        workload, namespace, name
                    );
                    absent_workloads.push(workload.clone());
                }
            }
        }

        Ok(ClusterInventory {
            name: description.name,
            region: region.to_string(),
            version: description.version,
            status: description.status,
            vpc_id: description.vpc_id,
            platform_version: description.platform_version,
            node_groups,
            addons: records,
            namespace_pods,
            absent_workloads,
        })
    }

    async fn node_groups(&self, region: &str, cluster: &str) -> Result<Vec<NodeGroupDescription>> {
        let names = self
            .control_plane
            .list_node_groups(region, cluster)
            .await
            .context(error::ControlPlaneSnafu { cluster })?;
        let mut node_groups = Vec::with_capacity(names.len());
        for node_group in names {
            match self
                .control_plane
                .describe_node_group(region, cluster, &node_group)
                .await
            {
                Ok(description) => node_groups.push(description),
                Err(e) if e.is_not_found() => {
                    debug!("Node group '{}' of '{}' is gone", node_group, cluster)
                }
                Err(e) => return Err(e).context(error::ControlPlaneSnafu { cluster }),
            }
        }
        Ok(node_groups)
    }

    async fn addons(&self, region: &str, cluster: &str) -> Result<Vec<AddonDescription>> {
        let names = self
            .control_plane
            .list_addons(region, cluster)
            .await
            .context(error::ControlPlaneSnafu { cluster })?;
        let mut addons = Vec::with_capacity(names.len());
        for addon in names {
            match self
                .control_plane
                .describe_addon(region, cluster, &addon)
                .await
            {
                Ok(description) => addons.push(description),
                Err(e) if e.is_not_found() => debug!("Add-on '{}' of '{}' is gone", addon, cluster),
                Err(e) => return Err(e).context(error::ControlPlaneSnafu { cluster }),
            }
        }
        Ok(addons)
    }
}
