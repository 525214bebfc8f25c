/*!

`eks-auth` derives short-lived bearer tokens for EKS cluster API servers from IAM credentials and
assembles in-memory client configurations from them.

The token is a presigned `sts:GetCallerIdentity` request: the [`CredentialSigner`] signs the
request with AWS Signature Version 4 (binding it to one cluster through the `x-k8s-aws-id`
header), the [`BearerToken`] encodes the presigned URL, and a [`ClientConfiguration`] pairs the
token with the cluster's endpoint and certificate authority. Nothing here touches the network or
the filesystem.

!*/

pub mod error;
pub mod kubeconfig;
pub mod signer;
mod sigv4;
pub mod token;

pub use error::{Error, Result};
pub use kubeconfig::{ClientConfiguration, ClusterConnection};
pub use signer::{presign, CredentialSigner, SignedRequest, CLUSTER_ID_HEADER, TOKEN_EXPIRATION};
pub use token::{decode, BearerToken, TOKEN_PREFIX};
