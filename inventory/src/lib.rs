/*!

`eks-inventory` collects a point-in-time inventory of EKS clusters across regions: cluster
metadata, node groups, managed add-ons and selected in-cluster workloads.

Cluster metadata comes from the EKS control plane ([`control_plane`]). In-cluster data comes from
each cluster's API server ([`cluster_api`]), reached with a short-lived token minted by `eks-auth`
for that cluster only. The [`aggregate`] module ties these together and [`report`] and
[`publish`] render and store the result.

!*/

pub mod aggregate;
pub mod aws;
pub mod cluster_api;
pub mod config;
pub mod constants;
pub mod control_plane;
pub mod error;
pub mod model;
pub mod publish;
pub mod report;

use constants::DEFAULT_LEVEL_FILTER;
use env_logger::Builder;
pub use error::{Error, Result};
use log::LevelFilter;
use std::env;

/// Extract the value of `RUST_LOG` if it exists, otherwise log this application at `log_level`
/// (or `DEFAULT_LEVEL_FILTER`) and everything else at `Error`.
pub fn init_logger(bin_crate: &str, log_level: Option<LevelFilter>) {
    match env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            let log_level = log_level.unwrap_or(DEFAULT_LEVEL_FILTER);
            Builder::new()
                .filter_level(LevelFilter::Error)
                .filter(Some(bin_crate), log_level)
                .filter(Some("eks_auth"), log_level)
                .filter(Some("eks_inventory"), log_level)
                .init();
        }
    }
}
