use async_trait::async_trait;
use eks_auth::ClientConfiguration;
use http::StatusCode;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, KubeconfigError};
use kube::{Api, Config};
use log::{debug, trace};
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::future::Future;
use std::time::Duration;
use tokio::time::error::Elapsed;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unable to create Kubernetes client for cluster '{}': {}", cluster, source))]
    Client { cluster: String, source: kube::Error },

    #[snafu(display("Unable to {} in namespace '{}': {}", operation, namespace, source))]
    KubeApiCall {
        operation: String,
        namespace: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to build kubeconfig for cluster '{}': {}", cluster, source))]
    Kubeconfig {
        cluster: String,
        source: eks_auth::Error,
    },

    #[snafu(display("Unable to load kubeconfig for cluster '{}': {}", cluster, source))]
    LoadConfig {
        cluster: String,
        source: KubeconfigError,
    },

    #[snafu(display("{} '{}' was not found in namespace '{}'", kind, name, namespace))]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[snafu(display("Timed out after {:?} trying to {}: {}", timeout, operation, source))]
    Timeout {
        operation: String,
        timeout: Duration,
        source: Elapsed,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The HTTP status of a failed Kubernetes API call.
pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            kube::Error::Api(error_response) => StatusCode::from_u16(error_response.code).ok(),
            _ => None,
        }
    }
}

/// The parts of a deployment needed to find its pods.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeploymentInfo {
    pub name: String,
    pub match_labels: BTreeMap<String, String>,
    /// The type of the first status condition, e.g. `Available`.
    pub status: String,
    pub service_account: String,
}

impl From<Deployment> for DeploymentInfo {
    fn from(deployment: Deployment) -> Self {
        let name = deployment.metadata.name.unwrap_or_default();
        let status = deployment
            .status
            .and_then(|status| status.conditions)
            .and_then(|conditions| conditions.into_iter().next())
            .map(|condition| condition.type_)
            .unwrap_or_default();
        let (match_labels, service_account) = match deployment.spec {
            Some(spec) => (
                spec.selector.match_labels.unwrap_or_default(),
                spec.template
                    .spec
                    .and_then(|pod_spec| pod_spec.service_account_name)
                    .unwrap_or_default(),
            ),
            None => (BTreeMap::new(), String::new()),
        };
        Self {
            name,
            match_labels,
            status,
            service_account,
        }
    }
}

/// Read-only queries against one cluster's API server.
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    /// Names of the pods in `namespace`, in the order the API server returned them.
    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>)
        -> Result<Vec<String>>;

    /// Read a deployment. A deployment that does not exist is an [`Error::NotFound`].
    async fn deployment(&self, namespace: &str, name: &str) -> Result<DeploymentInfo>;
}

/// Turns an in-memory client configuration into a [`WorkloadApi`] for that cluster.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    type Api: WorkloadApi;

    async fn connect(&self, configuration: &ClientConfiguration) -> Result<Self::Api>;
}

/// Join `key=value` pairs with commas.
pub fn label_selector(match_labels: &BTreeMap<String, String>) -> String {
    match_labels
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WorkloadLookup {
    Found {
        deployment: DeploymentInfo,
        pods: Vec<String>,
    },
    Absent,
}

/// Read the deployment `name` and list the pods its selector matches. A missing deployment is
/// [`WorkloadLookup::Absent`]; every other error is returned.
pub async fn resolve_workload<A>(api: &A, namespace: &str, name: &str) -> Result<WorkloadLookup>
where
    A: WorkloadApi + ?Sized,
{
    let deployment = match api.deployment(namespace, name).await {
        Ok(deployment) => deployment,
        Err(e) if e.is_not_found() => {
            debug!("Deployment '{}' not found in '{}'", name, namespace);
            return Ok(WorkloadLookup::Absent);
        }
        Err(e) => return Err(e),
    };
    // An empty selector would match every pod in the namespace.
    let pods = if deployment.match_labels.is_empty() {
        Vec::new()
    } else {
        let selector = label_selector(&deployment.match_labels);
        trace!("Listing pods of '{}' with selector '{}'", name, selector);
        api.list_pods(namespace, Some(&selector)).await?
    };
    Ok(WorkloadLookup::Found { deployment, pods })
}

/// [`ClusterConnector`] that builds a `kube::Client` from the ephemeral kubeconfig.
#[derive(Clone, Debug)]
pub struct KubeConnector {
    timeout: Duration,
}

impl KubeConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    type Api = KubeWorkloadApi;

    async fn connect(&self, configuration: &ClientConfiguration) -> Result<Self::Api> {
        let cluster = configuration.cluster_name();
        let kubeconfig = configuration
            .to_kubeconfig()
            .context(KubeconfigSnafu { cluster })?;
        let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(LoadConfigSnafu { cluster })?;
        config.connect_timeout = Some(self.timeout);
        config.read_timeout = Some(self.timeout);
        let client = kube::Client::try_from(config).context(ClientSnafu { cluster })?;
        debug!("Created Kubernetes client for cluster '{}'", cluster);
        Ok(KubeWorkloadApi {
            client,
            timeout: self.timeout,
        })
    }
}

pub struct KubeWorkloadApi {
    client: kube::Client,
    timeout: Duration,
}

impl KubeWorkloadApi {
    async fn call<T, F>(&self, operation: String, namespace: &str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>> + Send,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .context(TimeoutSnafu {
                operation: &operation,
                timeout: self.timeout,
            })?
            .context(KubeApiCallSnafu {
                operation,
                namespace,
            })
    }
}

#[async_trait]
impl WorkloadApi for KubeWorkloadApi {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<String>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = match label_selector {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        };
        let list = self
            .call("list pods".to_string(), namespace, pods.list(&params))
            .await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|pod| pod.metadata.name)
            .collect())
    }

    async fn deployment(&self, namespace: &str, name: &str) -> Result<DeploymentInfo> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let result = self
            .call(
                format!("get deployment '{}'", name),
                namespace,
                deployments.get(name),
            )
            .await;
        match result {
            Ok(deployment) => Ok(deployment.into()),
            Err(e) if e.is_status_code(StatusCode::NOT_FOUND) => NotFoundSnafu {
                kind: "Deployment",
                name,
                namespace,
            }
            .fail(),
            Err(e) => Err(e),
        }
    }
}
