//! The inputs to user-data generation: what a node group asks for, and what the cluster it joins
//! currently looks like.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A free-form nested document, as given by the user for settings or kubelet configuration.
pub type InlineDocument = serde_json::Map<String, serde_json::Value>;

/// The image lineage a node runs.  Parsed from the same strings used in cluster configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsFamily {
    AmazonLinux2,
    AmazonLinux2023,
    Ubuntu1804,
    Ubuntu2004,
    Ubuntu2204,
    Bottlerocket,
    WindowsServer2019CoreContainer,
    WindowsServer2019FullContainer,
    WindowsServer2022CoreContainer,
    WindowsServer2022FullContainer,
}

derive_fromstr_from_deserialize!(OsFamily);
derive_display_from_serialize!(OsFamily);

impl OsFamily {
    pub fn is_windows(&self) -> bool {
        matches!(
            self,
            OsFamily::WindowsServer2019CoreContainer
                | OsFamily::WindowsServer2019FullContainer
                | OsFamily::WindowsServer2022CoreContainer
                | OsFamily::WindowsServer2022FullContainer
        )
    }

    pub fn is_ubuntu(&self) -> bool {
        matches!(
            self,
            OsFamily::Ubuntu1804 | OsFamily::Ubuntu2004 | OsFamily::Ubuntu2204
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeGroupKind {
    /// Nodes run in compute-scaling resources owned by the user.
    #[default]
    SelfManaged,
    /// Node lifecycle is operated by the control-plane provider.
    Managed,
}

/// The image a node group launches from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Ami {
    /// Resolve the image for the OS family automatically.
    #[default]
    Auto,
    /// A specific, user-chosen image.
    Custom(String),
}

impl Ami {
    pub fn is_custom(&self) -> bool {
        matches!(self, Ami::Custom(_))
    }
}

impl From<String> for Ami {
    fn from(ami: String) -> Self {
        match ami.as_str() {
            "" | "auto" | "auto-ssm" => Ami::Auto,
            _ => Ami::Custom(ami),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Taint {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub effect: String,
}

impl Taint {
    pub fn new<K, V, E>(key: K, value: V, effect: E) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        E: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
            effect: effect.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BottlerocketOptions {
    /// Raw settings, rooted below the top-level `settings` table.
    #[serde(default)]
    pub settings: Option<InlineDocument>,
    /// Unset, or explicitly on or off.
    #[serde(default)]
    pub enable_admin_container: Option<bool>,
}

/// The capacity of the instance type nodes run on, when known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct InstanceResources {
    pub cpus: u64,
    pub memory_mib: u64,
}

/// Everything about a node group that shapes its user-data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NodeBootstrapSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: NodeGroupKind,
    pub ami_family: OsFamily,
    #[serde(default)]
    pub ami: Ami,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub taints: Vec<Taint>,
    /// Zero means unset.
    #[serde(default)]
    pub max_pods_per_node: u32,
    #[serde(default)]
    pub cluster_dns: Option<String>,
    #[serde(default)]
    pub pre_bootstrap_commands: Vec<String>,
    /// Replaces the generated bootstrap step entirely.
    #[serde(default)]
    pub override_bootstrap_command: Option<String>,
    #[serde(default)]
    pub kubelet_extra_config: Option<InlineDocument>,
    #[serde(default)]
    pub efa_enabled: bool,
    #[serde(default)]
    pub ssm_enabled: bool,
    #[serde(default)]
    pub container_runtime: Option<String>,
    /// Looked up in the table of known instance types unless `instance_resources` is given.
    #[serde(default)]
    pub instance_types: Vec<String>,
    #[serde(default)]
    pub instance_resources: Option<InstanceResources>,
    #[serde(default)]
    pub bottlerocket: BottlerocketOptions,
}

impl NodeBootstrapSpec {
    /// A self-managed node group of the given family with nothing else set.
    pub fn new(ami_family: OsFamily) -> Self {
        Self {
            name: String::new(),
            kind: NodeGroupKind::default(),
            ami_family,
            ami: Ami::default(),
            labels: BTreeMap::new(),
            taints: Vec::new(),
            max_pods_per_node: 0,
            cluster_dns: None,
            pre_bootstrap_commands: Vec::new(),
            override_bootstrap_command: None,
            kubelet_extra_config: None,
            efa_enabled: false,
            ssm_enabled: false,
            container_runtime: None,
            instance_types: Vec::new(),
            instance_resources: None,
            bottlerocket: BottlerocketOptions::default(),
        }
    }

    pub fn is_managed(&self) -> bool {
        self.kind == NodeGroupKind::Managed
    }

    pub fn max_pods(&self) -> Option<u32> {
        Some(self.max_pods_per_node).filter(|&n| n > 0)
    }

    /// The capacity to size kubelet reservations by: the explicit resources, or else the smallest
    /// of the node group's known instance types.
    pub fn resources(&self) -> Option<InstanceResources> {
        self.instance_resources
            .or_else(|| crate::instance_types::smallest(&self.instance_types))
    }

    /// The override command, if one was given and isn't blank.
    pub fn override_command(&self) -> Option<&str> {
        self.override_bootstrap_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }
}

/// Facts about the live cluster that nodes need in order to join it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ClusterRuntimeStatus {
    pub name: String,
    #[serde(default)]
    pub region: String,
    pub endpoint: String,
    /// Raw certificate bytes; the input file carries them base64-encoded.
    #[serde(rename = "certificate-authority", deserialize_with = "from_base64")]
    pub certificate_authority_data: Vec<u8>,
    #[serde(default)]
    pub service_ipv4_cidr: Option<String>,
    #[serde(default)]
    pub service_ipv6_cidr: Option<String>,
}

impl ClusterRuntimeStatus {
    pub fn b64_certificate_authority(&self) -> String {
        BASE64.encode(&self.certificate_authority_data)
    }

    /// The service CIDR nodes should use: IPv4 when the cluster has one, IPv6 otherwise.
    pub fn service_cidr(&self) -> Option<&str> {
        self.service_ipv4_cidr
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| self.service_ipv6_cidr.as_deref().filter(|c| !c.is_empty()))
    }
}

fn from_base64<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    BASE64
        .decode(encoded.trim())
        .map_err(serde::de::Error::custom)
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
