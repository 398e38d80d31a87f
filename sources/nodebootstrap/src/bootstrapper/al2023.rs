//! AL2023 nodes, which bootstrap natively from a `NodeConfig` document carried in multipart
//! user-data alongside any scripts.

use super::{as_shell_script, error, kubelet_extra_config, Result, UserData};
use crate::assets;
use crate::mime::MimeEnvelope;
use crate::model::{ClusterRuntimeStatus, InlineDocument, NodeBootstrapSpec};
use crate::nodeconfig::NodeConfig;
use snafu::ResultExt;

#[derive(Debug)]
pub struct Al2023Bootstrapper<'a> {
    spec: &'a NodeBootstrapSpec,
    status: &'a ClusterRuntimeStatus,
    cluster_dns: Option<String>,
    mime_boundary: Option<String>,
}

impl<'a> Al2023Bootstrapper<'a> {
    /// Handles both managed and self-managed node groups, going by the node group's kind.
    pub fn new(
        spec: &'a NodeBootstrapSpec,
        status: &'a ClusterRuntimeStatus,
        cluster_dns: Option<String>,
    ) -> Self {
        Self {
            spec,
            status,
            cluster_dns,
            mime_boundary: None,
        }
    }

    pub fn with_mime_boundary(mut self, boundary: Option<String>) -> Self {
        self.mime_boundary = boundary;
        self
    }

    pub fn is_managed(&self) -> bool {
        self.spec.is_managed()
    }

    /// Whether user-data carries the node configuration.  Managed native images are configured
    /// by the provider, and an override command replaces the generated configuration.
    fn wants_node_config(&self) -> bool {
        let spec = self.spec;
        spec.override_command().is_none() && (spec.is_managed() == spec.ami.is_custom())
    }

    pub fn node_config(&self) -> Result<NodeConfig> {
        // Managed node groups get their kubelet configuration from the provider.
        let kubelet_extra = if self.is_managed() {
            InlineDocument::new()
        } else {
            kubelet_extra_config(self.spec)?
        };
        Ok(NodeConfig::build(
            self.spec,
            self.status,
            self.cluster_dns.as_deref(),
            kubelet_extra,
        ))
    }

    pub fn envelope(&self) -> Result<MimeEnvelope> {
        let spec = self.spec;
        let mut envelope = MimeEnvelope::new().with_boundary(self.mime_boundary.clone());

        envelope.add_script(assets::get(assets::AL2023_XTABLES_LOCK).context(error::AssetSnafu)?);
        for command in &spec.pre_bootstrap_commands {
            envelope.add_script(as_shell_script(command));
        }
        if let Some(command) = spec.override_command() {
            envelope.add_script(as_shell_script(command));
        }

        if spec.is_managed() && spec.efa_enabled {
            envelope.add_boot_hook(
                assets::get(assets::EFA_MANAGED_BOOTHOOK).context(error::AssetSnafu)?,
            );
        }

        if self.wants_node_config() {
            let document = self
                .node_config()?
                .to_yaml()
                .context(error::NodeConfigSnafu)?;
            envelope.set_node_config(document);
        }

        Ok(envelope)
    }
}

impl UserData for Al2023Bootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        Ok(self.envelope()?.encode())
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
