use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_GPU_PREFIXES, DEFAULT_NAMESPACE};
use crate::error::{self, Result};
use snafu::ensure;
use std::collections::BTreeMap;

/// Decides whether a node group carries GPUs from the family part of its instance types
/// (`g4dn` in `g4dn.xlarge`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GpuClassifier {
    prefixes: Vec<String>,
}

impl Default for GpuClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_GPU_PREFIXES.iter().copied())
    }
}

impl GpuClassifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|prefix| prefix.as_ref().trim().to_lowercase())
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_gpu_instance_type(&self, instance_type: &str) -> bool {
        let family = instance_type
            .split('.')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        self.prefixes
            .iter()
            .any(|prefix| family.starts_with(prefix.as_str()))
    }

    /// A node group is a GPU node group if any of its instance types is.
    pub fn is_gpu<S>(&self, instance_types: &[S]) -> bool
    where
        S: AsRef<str>,
    {
        instance_types
            .iter()
            .any(|instance_type| self.is_gpu_instance_type(instance_type.as_ref()))
    }
}

/// What to inventory and how.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InventorySettings {
    /// Regions in the order they are reported.
    pub regions: Vec<String>,
    /// The namespace workloads are looked up in.
    pub namespace: String,
    /// Deployments that are not managed add-ons but should be reported.
    pub workloads: Vec<String>,
    /// Deployment name for managed add-ons whose deployment is not named after the add-on.
    pub addon_workloads: BTreeMap<String, String>,
    pub gpu: GpuClassifier,
    /// How many clusters of one region are inventoried at the same time.
    pub concurrency: usize,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            workloads: Vec::new(),
            addon_workloads: BTreeMap::new(),
            gpu: GpuClassifier::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl InventorySettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.regions.is_empty(),
            error::ConfigSnafu {
                what: "at least one region is required",
            }
        );
        ensure!(
            self.regions.iter().all(|region| !region.trim().is_empty()),
            error::ConfigSnafu {
                what: "region names cannot be empty",
            }
        );
        ensure!(
            !self.namespace.trim().is_empty(),
            error::ConfigSnafu {
                what: "a namespace is required",
            }
        );
        ensure!(
            self.concurrency > 0,
            error::ConfigSnafu {
                what: "concurrency must be at least 1",
            }
        );
        ensure!(
            !self.gpu.prefixes().is_empty(),
            error::ConfigSnafu {
                what: "at least one GPU instance family prefix is required",
            }
        );
        Ok(())
    }

    /// The deployment that runs `addon`.
    pub fn addon_workload<'a>(&'a self, addon: &'a str) -> &'a str {
        self.addon_workloads
            .get(addon)
            .map(String::as_str)
            .unwrap_or(addon)
    }
}

/// Trim the names given on the command line, e.g. `us-east-1, us-west-2`. Names that are empty
/// after trimming are kept so that validation rejects them.
pub fn trim_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .collect()
}

/// Parse an `addon=deployment` pair.
pub fn parse_addon_workload(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((addon, deployment)) if !addon.trim().is_empty() && !deployment.trim().is_empty() => {
            Ok((addon.trim().to_string(), deployment.trim().to_string()))
        }
        _ => Err(format!(
            "'{}' is not of the form 'addon=deployment'",
            value
        )),
    }
}
