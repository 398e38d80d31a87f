//! The `NodeConfig` document read by the bootstrap agent on images that bootstrap natively
//! (AL2023).

use crate::format::{format_labels, format_taints};
use crate::model::{ClusterRuntimeStatus, InlineDocument, NodeBootstrapSpec};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub const API_VERSION: &str = "node.eks.aws/v1alpha1";
pub const KIND: &str = "NodeConfig";

const CLUSTER_DNS_KEY: &str = "clusterDNS";
const MAX_PODS_KEY: &str = "maxPods";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub api_version: String,
    pub kind: String,
    pub spec: NodeConfigSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfigSpec {
    pub cluster: ClusterDetails,
    pub kubelet: KubeletOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetails {
    pub api_server_endpoint: String,
    /// Base64-encoded.
    pub certificate_authority: String,
    pub cidr: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubeletOptions {
    pub config: KubeletConfig,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeletConfig {
    #[serde(rename = "clusterDNS", default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_dns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pods: Option<u32>,
    /// Any further kubelet configuration, merged in at the same level.
    #[serde(flatten)]
    pub extra: InlineDocument,
}

impl NodeConfig {
    /// Builds the document for a node group.  `kubelet_extra` is merged into the kubelet
    /// configuration; where it sets the cluster DNS or max pods, the node group's own values win.
    pub fn build(
        spec: &NodeBootstrapSpec,
        status: &ClusterRuntimeStatus,
        cluster_dns: Option<&str>,
        mut kubelet_extra: InlineDocument,
    ) -> Self {
        let max_pods = spec.max_pods();
        if cluster_dns.is_some() && kubelet_extra.remove(CLUSTER_DNS_KEY).is_some() {
            debug!("Replacing {} from kubelet configuration", CLUSTER_DNS_KEY);
        }
        if max_pods.is_some() && kubelet_extra.remove(MAX_PODS_KEY).is_some() {
            debug!("Replacing {} from kubelet configuration", MAX_PODS_KEY);
        }

        let mut flags = vec![format!("--node-labels={}", format_labels(&spec.labels))];
        if !spec.taints.is_empty() {
            flags.push(format!(
                "--register-with-taints={}",
                format_taints(&spec.taints)
            ));
        }

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            spec: NodeConfigSpec {
                cluster: ClusterDetails {
                    api_server_endpoint: status.endpoint.clone(),
                    certificate_authority: status.b64_certificate_authority(),
                    cidr: status.service_cidr().unwrap_or_default().to_string(),
                    name: status.name.clone(),
                },
                kubelet: KubeletOptions {
                    config: KubeletConfig {
                        cluster_dns: cluster_dns.into_iter().map(str::to_string).collect(),
                        max_pods,
                        extra: kubelet_extra,
                    },
                    flags,
                },
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context(error::SerializeSnafu)
    }
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum Error {
        #[snafu(display("Unable to serialize node configuration: {}", source))]
        Serialize { source: serde_yaml::Error },
    }
}

pub use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
