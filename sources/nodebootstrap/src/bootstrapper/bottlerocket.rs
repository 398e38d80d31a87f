//! Bottlerocket nodes, configured entirely through the settings daemon's TOML user-data.

use super::{error, Result, UserData};
use crate::format::taints_by_key;
use crate::model::{ClusterRuntimeStatus, NodeBootstrapSpec};
use crate::settings::SettingsTree;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use snafu::{ensure, ResultExt};

const SETTINGS: &str = "settings";
const KUBERNETES: &str = "kubernetes";
const ADMIN_CONTAINER_ENABLED: [&str; 3] = ["host-containers", "admin", "enabled"];

/// Set from the cluster on every node; managed node groups get them from the provider.
const CLUSTER_BOOTSTRAP_KEYS: &[&str] = &[
    "cluster-certificate",
    "api-server",
    "cluster-name",
    "cluster-dns-ip",
];
const LABELS_KEY: &str = "node-labels";
const TAINTS_KEY: &str = "node-taints";
const MAX_PODS_KEY: &str = "max-pods";

/// Seeds a tree with the node group's own settings under the `settings` root.
fn seed(spec: &NodeBootstrapSpec) -> SettingsTree {
    let mut root = SettingsTree::new();
    match &spec.bottlerocket.settings {
        Some(settings) => root.set_path(&[SETTINGS], Value::Object(settings.clone())),
        None => {
            root.table_mut(&[SETTINGS]);
        }
    }
    root
}

/// Renders and encodes the settings; an empty document is never valid user-data.
fn encode(root: &SettingsTree) -> Result<String> {
    let rendered = root.render().context(error::SettingsSnafu)?;
    ensure!(!rendered.trim().is_empty(), error::EmptySettingsSnafu);
    trace!("Settings user-data:\n{}", rendered);
    Ok(BASE64.encode(rendered))
}

#[derive(Debug)]
pub struct BottlerocketBootstrapper<'a> {
    spec: &'a NodeBootstrapSpec,
    status: &'a ClusterRuntimeStatus,
    cluster_dns: Option<String>,
}

impl<'a> BottlerocketBootstrapper<'a> {
    pub fn new(
        spec: &'a NodeBootstrapSpec,
        status: &'a ClusterRuntimeStatus,
        cluster_dns: Option<String>,
    ) -> Self {
        Self {
            spec,
            status,
            cluster_dns,
        }
    }

    /// The full settings document, including its `settings` root.
    pub fn settings(&self) -> SettingsTree {
        let spec = self.spec;
        let mut root = seed(spec);
        let settings = root.table_mut(&[SETTINGS]);

        if !spec.labels.is_empty() {
            settings.set_path(&[KUBERNETES, LABELS_KEY], json!(spec.labels));
        }
        if !spec.taints.is_empty() {
            settings.set_path(&[KUBERNETES, TAINTS_KEY], json!(taints_by_key(&spec.taints)));
        }
        if let Some(max_pods) = spec.max_pods() {
            settings.set_path(&[KUBERNETES, MAX_PODS_KEY], json!(max_pods));
        }
        if let Some(dns) = &self.cluster_dns {
            settings.set_path(&[KUBERNETES, "cluster-dns-ip"], json!(dns));
        }

        settings.protect_dotted_keys();

        settings.set_path(
            &[KUBERNETES, "cluster-certificate"],
            json!(self.status.b64_certificate_authority()),
        );
        settings.set_path(&[KUBERNETES, "api-server"], json!(self.status.endpoint));
        settings.set_path(&[KUBERNETES, "cluster-name"], json!(self.status.name));

        // An explicit setting wins over the node group's flag.
        if !settings.has_path(&ADMIN_CONTAINER_ENABLED) {
            match spec.bottlerocket.enable_admin_container {
                Some(enabled) => settings.set_path(&ADMIN_CONTAINER_ENABLED, json!(enabled)),
                None => settings.set_path_commented(&ADMIN_CONTAINER_ENABLED, json!(false)),
            }
        }

        root
    }
}

impl UserData for BottlerocketBootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        encode(&self.settings())
    }
}

/// Managed Bottlerocket nodes.  The provider injects cluster bootstrap settings, labels, and
/// taints itself, so node groups may not set them here.
#[derive(Debug)]
pub struct ManagedBottlerocketBootstrapper<'a> {
    spec: &'a NodeBootstrapSpec,
}

impl<'a> ManagedBottlerocketBootstrapper<'a> {
    pub fn new(spec: &'a NodeBootstrapSpec) -> Self {
        Self { spec }
    }

    /// The full settings document, including its `settings` root.
    pub fn settings(&self) -> Result<SettingsTree> {
        let spec = self.spec;
        let mut root = seed(spec);
        let settings = root.table_mut(&[SETTINGS]);

        for key in CLUSTER_BOOTSTRAP_KEYS.iter().copied() {
            ensure!(
                !settings.has_path(&[KUBERNETES, key]),
                error::ClusterBootstrapSettingSnafu { key }
            );
        }
        for key in [LABELS_KEY, TAINTS_KEY] {
            ensure!(
                !settings.has_path(&[KUBERNETES, key]),
                error::LabelsAndTaintsInSettingsSnafu { key }
            );
        }

        if let Some(enabled) = spec.bottlerocket.enable_admin_container {
            ensure!(
                !settings.has_path(&ADMIN_CONTAINER_ENABLED),
                error::AdminContainerConflictSnafu
            );
            settings.set_path(&ADMIN_CONTAINER_ENABLED, json!(enabled));
        }

        if let Some(max_pods) = spec.max_pods() {
            settings.set_path(&[KUBERNETES, MAX_PODS_KEY], json!(max_pods));
        }

        settings.table_mut(&[KUBERNETES]);
        settings.protect_dotted_keys();

        Ok(root)
    }
}

impl UserData for ManagedBottlerocketBootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        encode(&self.settings()?)
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
