//! Self-managed AL2 and Ubuntu nodes, bootstrapped by cloud-init.

use super::{error, kubelet_extra_config, Result, UserData};
use crate::assets;
use crate::format::{format_labels, format_taints, join_key_values};
use crate::model::{ClusterRuntimeStatus, NodeBootstrapSpec, OsFamily};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cloudconfig::{CloudConfig, File};
use snafu::ResultExt;

const CONFIG_DIR: &str = "/etc/eksctl/";
const KUBELET_EXTRA_CONFIG_FILE: &str = "kubelet-extra.json";
const KUBELET_ENV_FILE: &str = "kubelet.env";

#[derive(Debug)]
pub struct LinuxBootstrapper<'a> {
    spec: &'a NodeBootstrapSpec,
    status: &'a ClusterRuntimeStatus,
    cluster_dns: Option<String>,
}

impl<'a> LinuxBootstrapper<'a> {
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

    /// Builds the cloud-config document: pre-bootstrap commands, then either the override command
    /// or the files and scripts that bootstrap the node.
    pub fn cloud_config(&self) -> Result<CloudConfig> {
        let spec = self.spec;
        let mut config = CloudConfig::new();

        for command in &spec.pre_bootstrap_commands {
            config.add_shell_command(command.as_str());
        }

        if let Some(command) = spec.override_command() {
            debug!("Node group '{}' overrides the bootstrap command", spec.name);
            config.add_shell_command(command);
            return Ok(config);
        }

        if spec.ssm_enabled {
            debug!("SSM agent ships with the image; nothing to install");
        }

        let kubelet_extra = kubelet_extra_config(spec)?;
        let kubelet_extra =
            serde_json::to_string(&kubelet_extra).context(error::KubeletConfigSnafu)?;
        config.add_file(File::new(
            format!("{}{}", CONFIG_DIR, KUBELET_EXTRA_CONFIG_FILE),
            kubelet_extra,
        ));
        config.add_file(File::new(
            format!("{}{}", CONFIG_DIR, KUBELET_ENV_FILE),
            self.bootstrap_env(),
        ));

        let ubuntu = spec.ami_family.is_ubuntu();
        if spec.efa_enabled {
            let efa = if ubuntu {
                assets::EFA_UBUNTU
            } else {
                assets::EFA_AL2
            };
            config.run_script(efa, assets::get(efa).context(error::AssetSnafu)?);
        }

        let boot_script = if ubuntu {
            assets::BOOTSTRAP_UBUNTU
        } else {
            assets::BOOTSTRAP_AL2
        };
        // The boot script also sources the helper from the scripts directory.
        for script in [assets::BOOTSTRAP_HELPER, boot_script] {
            config.run_script(script, assets::get(script).context(error::AssetSnafu)?);
        }

        Ok(config)
    }

    /// The environment the boot scripts read, one `KEY=value` per line.
    fn bootstrap_env(&self) -> String {
        let spec = self.spec;
        let mut variables = vec![
            ("CLUSTER_NAME", self.status.name.clone()),
            ("API_SERVER_URL", self.status.endpoint.clone()),
            ("B64_CLUSTER_CA", self.status.b64_certificate_authority()),
            ("NODE_LABELS", format_labels(&spec.labels)),
            ("NODE_TAINTS", format_taints(&spec.taints)),
        ];
        if let Some(max_pods) = spec.max_pods() {
            variables.push(("MAX_PODS", max_pods.to_string()));
        }
        if let Some(dns) = &self.cluster_dns {
            variables.push(("CLUSTER_DNS", dns.clone()));
        }
        if spec.ami_family == OsFamily::AmazonLinux2 {
            variables.push((
                "CONTAINER_RUNTIME",
                spec.container_runtime.clone().unwrap_or_default(),
            ));
        }
        join_key_values(variables, "\n")
    }
}

impl UserData for LinuxBootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        self.cloud_config()?
            .encode()
            .context(error::CloudConfigSnafu)
    }
}

/// Self-managed AL2 and Ubuntu nodes on a custom image, which bootstrap themselves with the
/// override command.
#[derive(Debug)]
pub struct CustomAmiBootstrapper<'a> {
    standard: LinuxBootstrapper<'a>,
}

impl<'a> CustomAmiBootstrapper<'a> {
    pub fn new(
        spec: &'a NodeBootstrapSpec,
        status: &'a ClusterRuntimeStatus,
        cluster_dns: Option<String>,
    ) -> Self {
        Self {
            standard: LinuxBootstrapper::new(spec, status, cluster_dns),
        }
    }
}

impl UserData for CustomAmiBootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        let spec = self.standard.spec;
        match spec.override_command() {
            Some(command) => Ok(BASE64.encode(command)),
            None => {
                warn!(
                    "Custom AMI for node group '{}' has no override bootstrap command; using the standard {} bootstrap",
                    spec.name, spec.ami_family
                );
                self.standard.user_data()
            }
        }
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[cfg(test)]
mod test {
    use super::*;
    use crate::bootstrapper::test::{document, status};
    use crate::model::{Ami, Taint};
    use cloudconfig::Command;
    use maplit::btreemap;
    use serde_json::json;

    fn decode(user_data: &str) -> CloudConfig {
        CloudConfig::decode(user_data).unwrap()
    }

    fn user_data(spec: &NodeBootstrapSpec, status: &ClusterRuntimeStatus) -> CloudConfig {
        let dns = crate::bootstrapper::resolve_cluster_dns(spec, status).unwrap();
        decode(&LinuxBootstrapper::new(spec, status, dns).user_data().unwrap())
    }

    fn env_lines(config: &CloudConfig) -> Vec<String> {
        assert_eq!(config.files[1].path, "/etc/eksctl/kubelet.env");
        let mut lines: Vec<_> = config.files[1]
            .content
            .split('\n')
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }

    #[test]
    fn al2_layout() {
        let spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2);
        let config = user_data(&spec, &status());

        let paths: Vec<_> = config.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/etc/eksctl/kubelet-extra.json",
                "/etc/eksctl/kubelet.env",
                "/var/lib/cloud/scripts/eksctl/bootstrap.helper.sh",
                "/var/lib/cloud/scripts/eksctl/bootstrap.al2.sh",
            ]
        );
        assert_eq!(config.files[0].content, "{}");
        assert_eq!(config.files[0].permissions, "0644");
        assert_eq!(config.files[1].permissions, "0644");
        assert_eq!(config.files[2].permissions, "0755");
        assert_eq!(config.files[3].permissions, "0755");
        assert_eq!(
            config.commands,
            vec![
                Command::Argv(vec![
                    "/var/lib/cloud/scripts/eksctl/bootstrap.helper.sh".to_string()
                ]),
                Command::Argv(vec![
                    "/var/lib/cloud/scripts/eksctl/bootstrap.al2.sh".to_string()
                ]),
            ]
        );
    }

    #[test]
    fn al2_env() {
        let status = ClusterRuntimeStatus {
            name: "userdata-test".to_string(),
            ..Default::default()
        };
        let spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2);
        assert_eq!(
            env_lines(&user_data(&spec, &status)),
            vec![
                "API_SERVER_URL=",
                "B64_CLUSTER_CA=",
                "CLUSTER_NAME=userdata-test",
                "CONTAINER_RUNTIME=",
                "NODE_LABELS=",
                "NODE_TAINTS=",
            ]
        );
    }

    #[test]
    fn ubuntu_env_and_scripts() {
        let mut spec = NodeBootstrapSpec::new(OsFamily::Ubuntu2004);
        spec.max_pods_per_node = 123;
        spec.labels = btreemap! {"foo".to_string() => "bar".to_string()};
        spec.taints = vec![Taint::new("foo", "", "NoSchedule")];
        spec.cluster_dns = Some("1.2.3.4".to_string());
        let config = user_data(&spec, &status());

        assert_eq!(
            env_lines(&config),
            vec![
                "API_SERVER_URL=https://test.xxx.us-west-2.eks.amazonaws.com",
                "B64_CLUSTER_CA=dGVzdCBDQQ==",
                "CLUSTER_DNS=1.2.3.4",
                "CLUSTER_NAME=unit-test",
                "MAX_PODS=123",
                "NODE_LABELS=foo=bar",
                "NODE_TAINTS=foo=:NoSchedule",
            ]
        );
        assert_eq!(
            config.files[3].path,
            "/var/lib/cloud/scripts/eksctl/bootstrap.ubuntu.sh"
        );
    }

    #[test]
    fn efa_runs_before_boot_script() {
        let mut spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2);
        spec.efa_enabled = true;
        spec.pre_bootstrap_commands = vec!["echo 'rubarb'".to_string()];
        let config = user_data(&spec, &status());

        assert_eq!(config.files[2].path, "/var/lib/cloud/scripts/eksctl/efa.al2.sh");
        assert_eq!(config.files[2].permissions, "0755");
        assert_eq!(config.commands.len(), 4);
        assert_eq!(
            config.commands[0],
            Command::Argv(vec![
                "/bin/bash".to_string(),
                "-c".to_string(),
                "echo 'rubarb'".to_string()
            ])
        );
        assert_eq!(
            config.commands[1],
            Command::Argv(vec!["/var/lib/cloud/scripts/eksctl/efa.al2.sh".to_string()])
        );
        assert_eq!(
            config.commands[2],
            Command::Argv(vec![
                "/var/lib/cloud/scripts/eksctl/bootstrap.helper.sh".to_string()
            ])
        );
    }

    #[test]
    fn kubelet_extra_config_file() {
        let mut spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2);
        spec.kubelet_extra_config = Some(document(json!({"foo": "bar"})));
        let config = user_data(&spec, &status());
        assert_eq!(config.files[0].path, "/etc/eksctl/kubelet-extra.json");
        assert_eq!(config.files[0].content, r#"{"foo":"bar"}"#);

        spec.kubelet_extra_config = Some(document(json!({"featureGates": {"X": true}})));
        let dns = Some("10.100.0.10".to_string());
        let status = status();
        assert!(LinuxBootstrapper::new(&spec, &status, dns).user_data().is_err());
    }

    #[test]
    fn override_replaces_bootstrap() {
        let mut spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2);
        spec.pre_bootstrap_commands = vec!["echo first".to_string()];
        spec.override_bootstrap_command = Some("echo 'crashoverride'".to_string());
        let config = user_data(&spec, &status());

        assert!(config.files.is_empty());
        assert_eq!(config.commands.len(), 2);
        assert_eq!(
            config.commands[1],
            Command::Argv(vec![
                "/bin/bash".to_string(),
                "-c".to_string(),
                "echo 'crashoverride'".to_string()
            ])
        );
    }

    #[test]
    fn custom_ami_uses_raw_override() {
        let status = status();
        let mut spec = NodeBootstrapSpec::new(OsFamily::AmazonLinux2);
        spec.ami = Ami::Custom("ami-123".to_string());
        spec.override_bootstrap_command = Some("/etc/eks/bootstrap.sh unit-test".to_string());
        let user_data = CustomAmiBootstrapper::new(&spec, &status, None)
            .user_data()
            .unwrap();
        assert_eq!(
            BASE64.decode(user_data).unwrap(),
            b"/etc/eks/bootstrap.sh unit-test"
        );
    }

    #[test]
    fn custom_ami_without_override_falls_back() {
        let status = status();
        let mut spec = NodeBootstrapSpec::new(OsFamily::Ubuntu2204);
        spec.ami = Ami::Custom("ami-123".to_string());
        let user_data = CustomAmiBootstrapper::new(&spec, &status, None)
            .user_data()
            .unwrap();
        let config = decode(&user_data);
        assert_eq!(config.files.len(), 4);
    }
}
