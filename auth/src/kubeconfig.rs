use crate::error::{self, Result};
use crate::token::BearerToken;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use kube::config::Kubeconfig;
use serde_json::json;
use snafu::{ensure, ResultExt};

const CONTEXT_NAME: &str = "eks-inventory";
const USER_NAME: &str = "eks-inventory";

/// How to reach one cluster's API server, as reported by the control plane.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterConnection {
    pub name: String,
    pub region: String,
    /// The API server URL, e.g. `https://ABCDEF.gr7.us-west-2.eks.amazonaws.com`.
    pub endpoint: String,
    /// Base64 encoded PEM bundle of the cluster certificate authority.
    pub certificate_authority_data: String,
}

/// A single-cluster client configuration that only lives in memory. It is built from exactly one
/// [`ClusterConnection`] and a token minted for that same cluster.
#[derive(Clone, Debug)]
pub struct ClientConfiguration {
    connection: ClusterConnection,
    token: BearerToken,
}

impl ClientConfiguration {
    pub fn assemble(connection: ClusterConnection, token: BearerToken) -> Result<Self> {
        Self::assemble_at(connection, token, Utc::now())
    }

    /// Validate and combine `connection` and `token`, treating `now` as the current time.
    pub fn assemble_at(
        connection: ClusterConnection,
        token: BearerToken,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        ensure!(
            token.cluster_name() == connection.name,
            error::ClusterMismatchSnafu {
                cluster: &connection.name,
                token_cluster: token.cluster_name(),
            }
        );
        ensure!(
            !token.is_expired_at(now),
            error::TokenExpiredSnafu {
                cluster: &connection.name,
                expired_at: token.expires_at().to_rfc3339(),
            }
        );
        let endpoint_is_https = url::Url::parse(&connection.endpoint)
            .map(|url| url.scheme() == "https" && url.host_str().is_some())
            .unwrap_or_default();
        ensure!(
            endpoint_is_https,
            error::EndpointSnafu {
                endpoint: &connection.endpoint,
            }
        );
        let certificate = STANDARD
            .decode(connection.certificate_authority_data.trim())
            .context(error::CertificateAuthoritySnafu {
                cluster: &connection.name,
            })?;
        ensure!(
            !certificate.is_empty(),
            error::EmptyCertificateAuthoritySnafu {
                cluster: &connection.name,
            }
        );
        Ok(Self { connection, token })
    }

    pub fn cluster_name(&self) -> &str {
        &self.connection.name
    }

    pub fn connection(&self) -> &ClusterConnection {
        &self.connection
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Render a kubeconfig with one cluster, one context and one user.
    pub fn to_kubeconfig(&self) -> Result<Kubeconfig> {
        let cluster = &self.connection.name;
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Config",
            "preferences": {},
            "clusters": [{
                "name": cluster,
                "cluster": {
                    "server": self.connection.endpoint,
                    "certificate-authority-data": self.connection.certificate_authority_data.trim(),
                },
            }],
            "contexts": [{
                "name": CONTEXT_NAME,
                "context": { "cluster": cluster, "user": USER_NAME },
            }],
            "current-context": CONTEXT_NAME,
            "users": [{
                "name": USER_NAME,
                "user": { "token": self.token.as_str() },
            }],
        }))
        .context(error::KubeconfigSnafu { cluster })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signer::presign;
    use aws_credential_types::Credentials;

    const CA_DATA: &str = "LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0tCk1JSUMvakNDQWVhZ0F3SUJBZ0lCQURBTkJna3Foa2lHOXcwQkFRc0ZBREFWTVJNd0VRWURWUVFERXdwcmRXSmwKLS0tLS1FTkQgQ0VSVElGSUNBVEUtLS0tLQo=";

    fn token(cluster: &str) -> BearerToken {
        let credentials = Credentials::new("AKIDEXAMPLE", "secret", None, None, "test");
        BearerToken::encode(&presign(&credentials, "us-west-2", cluster, Utc::now()).unwrap())
    }

    fn connection(name: &str) -> ClusterConnection {
        ClusterConnection {
            name: name.to_string(),
            region: "us-west-2".to_string(),
            endpoint: "https://ABCDEF0123.gr7.us-west-2.eks.amazonaws.com".to_string(),
            certificate_authority_data: CA_DATA.to_string(),
        }
    }

    #[test]
    fn kubeconfig_has_one_cluster_context_and_user() {
        let token = token("prod");
        let config = ClientConfiguration::assemble(connection("prod"), token.clone()).unwrap();
        let kubeconfig = config.to_kubeconfig().unwrap();
        assert_eq!(kubeconfig.clusters.len(), 1);
        assert_eq!(kubeconfig.contexts.len(), 1);
        assert_eq!(kubeconfig.auth_infos.len(), 1);
        assert_eq!(kubeconfig.clusters[0].name, "prod");
        assert_eq!(kubeconfig.current_context.as_deref(), Some(CONTEXT_NAME));

        let value = serde_json::to_value(&kubeconfig).unwrap();
        assert_eq!(value["users"][0]["user"]["token"], token.as_str());
        assert_eq!(
            value["clusters"][0]["cluster"]["server"],
            "https://ABCDEF0123.gr7.us-west-2.eks.amazonaws.com"
        );
        assert_eq!(value["contexts"][0]["context"]["cluster"], "prod");
    }

    #[test]
    fn token_for_another_cluster_is_rejected() {
        assert!(matches!(
            ClientConfiguration::assemble(connection("prod"), token("staging")),
            Err(crate::Error::ClusterMismatch { .. })
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = token("prod");
        let later = token.expires_at() + chrono::Duration::seconds(1);
        assert!(matches!(
            ClientConfiguration::assemble_at(connection("prod"), token, later),
            Err(crate::Error::TokenExpired { .. })
        ));
    }

    #[test]
    fn connection_metadata_is_validated() {
        let mut plain_http = connection("prod");
        plain_http.endpoint = "http://10.0.0.1".to_string();
        assert!(matches!(
            ClientConfiguration::assemble(plain_http, token("prod")),
            Err(crate::Error::Endpoint { .. })
        ));

        let mut bad_ca = connection("prod");
        bad_ca.certificate_authority_data = "not base64!".to_string();
        assert!(matches!(
            ClientConfiguration::assemble(bad_ca, token("prod")),
            Err(crate::Error::CertificateAuthority { .. })
        ));

        let mut empty_ca = connection("prod");
        empty_ca.certificate_authority_data = String::new();
        assert!(matches!(
            ClientConfiguration::assemble(empty_ca, token("prod")),
            Err(crate::Error::EmptyCertificateAuthority { .. })
        ));
    }

    #[test]
    fn debug_output_does_not_leak_token() {
        let token = token("prod");
        let config = ClientConfiguration::assemble(connection("prod"), token.clone()).unwrap();
        assert!(!format!("{:?}", config).contains(token.as_str()));
    }
}
