//! Managed AL2 and Ubuntu nodes.  The provider bootstraps nodes on its own images, so user-data
//! only carries what the node group adds on top; custom images also get the bootstrap call.

use super::{as_shell_script, error, Result, UserData};
use crate::assets;
use crate::format::{format_labels, format_taints};
use crate::mime::MimeEnvelope;
use crate::model::{ClusterRuntimeStatus, NodeBootstrapSpec};
use shell_words::quote;
use snafu::ResultExt;

const BOOTSTRAP_SCRIPT: &str = "/etc/eks/bootstrap.sh";

#[derive(Debug)]
pub struct ManagedLinuxBootstrapper<'a> {
    spec: &'a NodeBootstrapSpec,
    status: &'a ClusterRuntimeStatus,
    cluster_dns: Option<String>,
    mime_boundary: Option<String>,
}

impl<'a> ManagedLinuxBootstrapper<'a> {
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

    pub fn envelope(&self) -> Result<MimeEnvelope> {
        let spec = self.spec;
        let mut envelope = MimeEnvelope::new().with_boundary(self.mime_boundary.clone());

        if spec.efa_enabled {
            envelope.add_boot_hook(
                assets::get(assets::EFA_MANAGED_BOOTHOOK).context(error::AssetSnafu)?,
            );
        }

        for command in &spec.pre_bootstrap_commands {
            envelope.add_script(as_shell_script(command));
        }

        if let Some(command) = spec.override_command() {
            envelope.add_script(as_shell_script(command));
        } else if spec.ami.is_custom() {
            envelope.add_script(self.bootstrap_script());
        }

        Ok(envelope)
    }

    /// Calls the image's bootstrap script, for custom images the provider doesn't bootstrap.
    fn bootstrap_script(&self) -> String {
        let spec = self.spec;
        let mut kubelet_args = vec![format!("--node-labels={}", format_labels(&spec.labels))];
        if !spec.taints.is_empty() {
            kubelet_args.push(format!(
                "--register-with-taints={}",
                format_taints(&spec.taints)
            ));
        }

        let mut args = vec![
            quote(&self.status.name).into_owned(),
            "--apiserver-endpoint".to_string(),
            quote(&self.status.endpoint).into_owned(),
            "--b64-cluster-ca".to_string(),
            quote(&self.status.b64_certificate_authority()).into_owned(),
        ];
        if let Some(max_pods) = spec.max_pods() {
            kubelet_args.push(format!("--max-pods={}", max_pods));
            args.push("--use-max-pods false".to_string());
        }
        if let Some(dns) = &self.cluster_dns {
            args.push(format!("--dns-cluster-ip {}", quote(dns)));
        }
        args.push(format!(
            "--kubelet-extra-args {}",
            quote(&kubelet_args.join(" "))
        ));

        format!(
            "#!/bin/bash\nset -ex\n{} {}\n",
            BOOTSTRAP_SCRIPT,
            args.join(" ")
        )
    }
}

impl UserData for ManagedLinuxBootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        Ok(self.envelope()?.encode())
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
