use eks_auth::ClientConfiguration;
use eks_inventory::cluster_api::{
    ClusterConnector, DeploymentInfo, Error, Result, WorkloadApi,
};
use kube::error::ErrorResponse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Clone, Debug, Default)]
pub(crate) struct MockPod {
    pub(crate) name: String,
    pub(crate) labels: BTreeMap<String, String>,
}

impl MockPod {
    pub(crate) fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// The namespace contents of one cluster.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockWorkloads {
    pub(crate) deployments: Vec<DeploymentInfo>,
    pub(crate) pods: Vec<MockPod>,
    /// Deployments whose lookup is refused by the API server.
    pub(crate) forbidden_deployments: Vec<String>,
}

/// What the connector was handed for one cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ConnectionRecord {
    pub(crate) cluster: String,
    pub(crate) endpoint: String,
    pub(crate) token_cluster: String,
    pub(crate) token: String,
}

/// A [`ClusterConnector`] that serves workloads from memory, keyed by cluster name, and records
/// every configuration it receives.
#[derive(Debug, Default)]
pub(crate) struct MockConnector {
    clusters: HashMap<String, MockWorkloads>,
    connections: Mutex<Vec<ConnectionRecord>>,
}

impl MockConnector {
    pub(crate) fn with_cluster(mut self, cluster: &str, workloads: MockWorkloads) -> Self {
        self.clusters.insert(cluster.to_string(), workloads);
        self
    }

    pub(crate) fn connections(&self) -> Vec<ConnectionRecord> {
        self.connections.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClusterConnector for MockConnector {
    type Api = MockWorkloadApi;

    async fn connect(&self, configuration: &ClientConfiguration) -> Result<Self::Api> {
        self.connections.lock().unwrap().push(ConnectionRecord {
            cluster: configuration.cluster_name().to_string(),
            endpoint: configuration.connection().endpoint.clone(),
            token_cluster: configuration.token().cluster_name().to_string(),
            token: configuration.token().as_str().to_string(),
        });
        // Clusters without workloads behave like an API server that does not answer.
        match self.clusters.get(configuration.cluster_name()) {
            Some(workloads) => Ok(MockWorkloadApi {
                workloads: workloads.clone(),
            }),
            None => Err(Error::Client {
                cluster: configuration.cluster_name().to_string(),
                source: kube::Error::Api(ErrorResponse {
                    status: "Failure".to_string(),
                    message: "service unavailable".to_string(),
                    reason: "ServiceUnavailable".to_string(),
                    code: 503,
                }),
            }),
        }
    }
}

pub(crate) struct MockWorkloadApi {
    workloads: MockWorkloads,
}

fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|requirement| !requirement.is_empty())
        .all(|requirement| match requirement.split_once('=') {
            Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
            None => false,
        })
}

#[async_trait::async_trait]
impl WorkloadApi for MockWorkloadApi {
    async fn list_pods(
        &self,
        _namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<String>> {
        Ok(self
            .workloads
            .pods
            .iter()
            .filter(|pod| {
                label_selector
                    .map(|selector| matches_selector(&pod.labels, selector))
                    .unwrap_or(true)
            })
            .map(|pod| pod.name.clone())
            .collect())
    }

    async fn deployment(&self, namespace: &str, name: &str) -> Result<DeploymentInfo> {
        if self.workloads.forbidden_deployments.iter().any(|d| d == name) {
            return Err(Error::KubeApiCall {
                operation: format!("get deployment '{}'", name),
                namespace: namespace.to_string(),
                source: kube::Error::Api(ErrorResponse {
                    status: "Failure".to_string(),
                    message: format!("deployments.apps \"{}\" is forbidden", name),
                    reason: "Forbidden".to_string(),
                    code: 403,
                }),
            });
        }
        self.workloads
            .deployments
            .iter()
            .find(|deployment| deployment.name == name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "Deployment".to_string(),
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }
}
