//! Windows nodes, managed and self-managed.

use super::{Result, UserData};
use crate::format::{format_labels, format_taints};
use crate::model::{ClusterRuntimeStatus, NodeBootstrapSpec};
use crate::windows::PowerShellScript;

#[derive(Debug)]
pub struct WindowsBootstrapper<'a> {
    spec: &'a NodeBootstrapSpec,
    status: &'a ClusterRuntimeStatus,
    cluster_dns: Option<String>,
}

impl<'a> WindowsBootstrapper<'a> {
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

    pub fn is_managed(&self) -> bool {
        self.spec.is_managed()
    }

    pub fn script(&self) -> PowerShellScript {
        let spec = self.spec;
        let status = self.status;
        let mut script = PowerShellScript::new();
        script.add_pre_bootstrap_commands(&spec.pre_bootstrap_commands);

        script.add_argument("EKSClusterName", &status.name);
        script.add_argument("APIServerEndpoint", &status.endpoint);
        script.add_argument("Base64ClusterCA", status.b64_certificate_authority());
        script.add_argument("ServiceCIDR", status.service_cidr().unwrap_or_default());
        // Managed nodes get these from the provider.
        if !self.is_managed() {
            script.add_argument("DNSClusterIP", self.cluster_dns.as_deref().unwrap_or_default());
            script.add_argument(
                "ContainerRuntime",
                spec.container_runtime.as_deref().unwrap_or_default(),
            );
        }

        script.add_kubelet_flag("node-labels", format_labels(&spec.labels));
        script.add_kubelet_flag("register-with-taints", format_taints(&spec.taints));
        if let Some(max_pods) = spec.max_pods() {
            script.add_kubelet_flag("max-pods", max_pods.to_string());
        }

        if let Some(command) = spec.override_command() {
            script.set_override_command(command);
        }

        script
    }
}

impl UserData for WindowsBootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        Ok(self.script().encode())
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
