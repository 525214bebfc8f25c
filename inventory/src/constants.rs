use log::LevelFilter;
use std::time::Duration;

pub const DEFAULT_LEVEL_FILTER: LevelFilter = LevelFilter::Info;
pub const DEFAULT_NAMESPACE: &str = "kube-system";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Instance families whose names start with these letters carry GPUs (`g4dn`, `g5`, `p3`, `p4d`).
pub const DEFAULT_GPU_PREFIXES: &[&str] = &["g", "p"];
pub const ASSUME_ROLE_SESSION_NAME: &str = "eks-inventory";
pub const ASSUME_ROLE_SESSION_DURATION: Duration = Duration::from_secs(3600);
