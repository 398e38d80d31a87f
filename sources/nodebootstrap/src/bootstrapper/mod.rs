//! The bootstrapper module owns the `UserData` trait and the per-OS-family bootstrappers that
//! implement it.
//!
//! Each combination of OS family and node group kind has its own bootstrapper, and `select`
//! picks the one responsible for a node group.  `Bootstrapper` wraps whichever was selected so
//! callers can hold any of them.

use crate::model::{
    ClusterRuntimeStatus, InlineDocument, NodeBootstrapSpec, NodeGroupKind, OsFamily,
};
use crate::reserved::KubeReserved;
use snafu::{ensure, ResultExt};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

mod al2023;
mod bottlerocket;
mod linux;
mod managed_linux;
mod windows;

pub use al2023::Al2023Bootstrapper;
pub use bottlerocket::{BottlerocketBootstrapper, ManagedBottlerocketBootstrapper};
pub use linux::{CustomAmiBootstrapper, LinuxBootstrapper};
pub use managed_linux::ManagedLinuxBootstrapper;
pub use windows::WindowsBootstrapper;

/// Kubelet configuration keys that node groups may not override.
pub const FORBIDDEN_KUBELET_KEYS: &[&str] = &[
    "kind",
    "apiVersion",
    "address",
    "clusterDomain",
    "authentication",
    "authorization",
    "serverTLSBootstrap",
    "featureGates",
];

const KUBE_RESERVED_KEY: &str = "kubeReserved";

/// Support for new OS families can be added by implementing this trait.
pub trait UserData {
    /// Returns the user-data to attach to instances, ready to be used verbatim.  An empty string
    /// means the node group needs no user-data.
    fn user_data(&self) -> Result<String>;
}

/// Which bootstrapper handles a node group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Self-managed AL2 and Ubuntu, via cloud-init.
    Linux,
    /// Self-managed AL2 and Ubuntu on a custom image.
    CustomAmiLinux,
    /// Managed AL2 and Ubuntu.
    ManagedLinux,
    Bottlerocket,
    ManagedBottlerocket,
    Al2023,
    ManagedAl2023,
    Windows,
    ManagedWindows,
}

/// Picks the bootstrapper for an OS family, node group kind, and whether the image is custom.
pub fn select(family: OsFamily, kind: NodeGroupKind, custom_ami: bool) -> Variant {
    let managed = kind == NodeGroupKind::Managed;
    match family {
        f if f.is_windows() && managed => Variant::ManagedWindows,
        f if f.is_windows() => Variant::Windows,
        OsFamily::Bottlerocket if managed => Variant::ManagedBottlerocket,
        OsFamily::Bottlerocket => Variant::Bottlerocket,
        OsFamily::AmazonLinux2023 if managed => Variant::ManagedAl2023,
        OsFamily::AmazonLinux2023 => Variant::Al2023,
        _ if managed => Variant::ManagedLinux,
        _ if custom_ami => Variant::CustomAmiLinux,
        _ => Variant::Linux,
    }
}

/// Like `select`, for an OS family given by name.  Fails if the name isn't a known family.
pub fn select_by_name(family: &str, kind: NodeGroupKind, custom_ami: bool) -> Result<Variant> {
    let family = OsFamily::from_str(family).context(error::UnknownOsFamilySnafu { family })?;
    Ok(select(family, kind, custom_ami))
}

/// The bootstrapper selected for a node group.
#[derive(Debug)]
pub enum Bootstrapper<'a> {
    Linux(LinuxBootstrapper<'a>),
    CustomAmiLinux(CustomAmiBootstrapper<'a>),
    ManagedLinux(ManagedLinuxBootstrapper<'a>),
    Bottlerocket(BottlerocketBootstrapper<'a>),
    ManagedBottlerocket(ManagedBottlerocketBootstrapper<'a>),
    Al2023(Al2023Bootstrapper<'a>),
    Windows(WindowsBootstrapper<'a>),
}

impl<'a> Bootstrapper<'a> {
    /// Selects and builds the bootstrapper for a node group joining the given cluster.
    pub fn new(spec: &'a NodeBootstrapSpec, status: &'a ClusterRuntimeStatus) -> Result<Self> {
        let variant = select(spec.ami_family, spec.kind, spec.ami.is_custom());
        let cluster_dns = resolve_cluster_dns(spec, status)?;
        debug!(
            "Using {:?} bootstrapper for node group '{}' ({}), cluster DNS {:?}",
            variant, spec.name, spec.ami_family, cluster_dns
        );

        Ok(match variant {
            Variant::Linux => {
                Bootstrapper::Linux(LinuxBootstrapper::new(spec, status, cluster_dns))
            }
            Variant::CustomAmiLinux => Bootstrapper::CustomAmiLinux(CustomAmiBootstrapper::new(
                spec,
                status,
                cluster_dns,
            )),
            Variant::ManagedLinux => Bootstrapper::ManagedLinux(ManagedLinuxBootstrapper::new(
                spec,
                status,
                cluster_dns,
            )),
            Variant::Bottlerocket => Bootstrapper::Bottlerocket(BottlerocketBootstrapper::new(
                spec,
                status,
                cluster_dns,
            )),
            Variant::ManagedBottlerocket => {
                Bootstrapper::ManagedBottlerocket(ManagedBottlerocketBootstrapper::new(spec))
            }
            Variant::Al2023 | Variant::ManagedAl2023 => {
                Bootstrapper::Al2023(Al2023Bootstrapper::new(spec, status, cluster_dns))
            }
            Variant::Windows | Variant::ManagedWindows => {
                Bootstrapper::Windows(WindowsBootstrapper::new(spec, status, cluster_dns))
            }
        })
    }

    /// Uses a fixed MIME boundary for bootstrappers that produce multipart user-data, so output
    /// is reproducible.  Others ignore it.
    pub fn with_mime_boundary(self, boundary: Option<String>) -> Self {
        match self {
            Bootstrapper::ManagedLinux(b) => {
                Bootstrapper::ManagedLinux(b.with_mime_boundary(boundary))
            }
            Bootstrapper::Al2023(b) => Bootstrapper::Al2023(b.with_mime_boundary(boundary)),
            other => other,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Bootstrapper::Linux(_) => Variant::Linux,
            Bootstrapper::CustomAmiLinux(_) => Variant::CustomAmiLinux,
            Bootstrapper::ManagedLinux(_) => Variant::ManagedLinux,
            Bootstrapper::Bottlerocket(_) => Variant::Bottlerocket,
            Bootstrapper::ManagedBottlerocket(_) => Variant::ManagedBottlerocket,
            Bootstrapper::Al2023(b) if b.is_managed() => Variant::ManagedAl2023,
            Bootstrapper::Al2023(_) => Variant::Al2023,
            Bootstrapper::Windows(b) if b.is_managed() => Variant::ManagedWindows,
            Bootstrapper::Windows(_) => Variant::Windows,
        }
    }
}

impl UserData for Bootstrapper<'_> {
    fn user_data(&self) -> Result<String> {
        let user_data = match self {
            Bootstrapper::Linux(b) => b.user_data(),
            Bootstrapper::CustomAmiLinux(b) => b.user_data(),
            Bootstrapper::ManagedLinux(b) => b.user_data(),
            Bootstrapper::Bottlerocket(b) => b.user_data(),
            Bootstrapper::ManagedBottlerocket(b) => b.user_data(),
            Bootstrapper::Al2023(b) => b.user_data(),
            Bootstrapper::Windows(b) => b.user_data(),
        }?;
        info!(
            "Generated {} bytes of {:?} user-data",
            user_data.len(),
            self.variant()
        );
        Ok(user_data)
    }
}

/// The cluster DNS address nodes should use: the node group's override if it has one, otherwise
/// the tenth address of the service CIDR (`a` for IPv6), otherwise none.
pub fn resolve_cluster_dns(
    spec: &NodeBootstrapSpec,
    status: &ClusterRuntimeStatus,
) -> Result<Option<String>> {
    if let Some(dns) = spec.cluster_dns.as_deref().filter(|d| !d.is_empty()) {
        return Ok(Some(dns.to_string()));
    }

    if let Some(cidr) = status.service_ipv4_cidr.as_deref().filter(|c| !c.is_empty()) {
        let network = ipnet::Ipv4Net::from_str(cidr).context(error::ServiceCidrSnafu { cidr })?;
        let mut octets = network.addr().octets();
        octets[3] = 10;
        return Ok(Some(Ipv4Addr::from(octets).to_string()));
    }

    if let Some(cidr) = status.service_ipv6_cidr.as_deref().filter(|c| !c.is_empty()) {
        let network = ipnet::Ipv6Net::from_str(cidr).context(error::ServiceCidrSnafu { cidr })?;
        let mut segments = network.addr().segments();
        segments[7] = 0xa;
        return Ok(Some(Ipv6Addr::from(segments).to_string()));
    }

    Ok(None)
}

/// The node group's extra kubelet configuration, checked for keys it may not set, with default
/// reservations added when the instance size is known and the node group didn't set its own.
pub(crate) fn kubelet_extra_config(spec: &NodeBootstrapSpec) -> Result<InlineDocument> {
    let mut config = spec.kubelet_extra_config.clone().unwrap_or_default();
    for key in FORBIDDEN_KUBELET_KEYS {
        ensure!(
            !config.contains_key(*key),
            error::ForbiddenKubeletKeySnafu { key: *key }
        );
    }
    for (key, value) in &config {
        if value.is_null() {
            warn!("Kubelet configuration '{}' is null and will be ignored by kubelet", key);
        }
    }

    if !config.contains_key(KUBE_RESERVED_KEY) {
        if let Some(resources) = &spec.resources() {
            let reserved = serde_json::to_value(KubeReserved::from(resources))
                .context(error::KubeletConfigSnafu)?;
            debug!("Reserving {} for kubelet", reserved);
            config.insert(KUBE_RESERVED_KEY.to_string(), reserved);
        }
    }

    Ok(config)
}

/// Makes a command usable as a MIME shell-script part.
pub(crate) fn as_shell_script(command: &str) -> String {
    if command.starts_with("#!") {
        command.to_string()
    } else {
        format!("#!/bin/bash\n{}", command)
    }
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum Error {
        #[snafu(display(
            "cannot set both bottlerocket.enableAdminContainer and settings.host-containers.admin.enabled"
        ))]
        AdminContainerConflict,

        #[snafu(display("Unable to load embedded script: {}", source))]
        Asset { source: crate::assets::Error },

        #[snafu(display("Unable to encode cloud-config user-data: {}", source))]
        CloudConfig { source: cloudconfig::Error },

        #[snafu(display(
            "cannot set settings.kubernetes.{}; EKS automatically injects cluster bootstrapping fields into user-data",
            key
        ))]
        ClusterBootstrapSetting { key: String },

        #[snafu(display("generated unexpected empty TOML user-data"))]
        EmptySettings,

        #[snafu(display(
            "cannot override \"{}\" in kubelet config, as it's critical to eksctl functionality",
            key
        ))]
        ForbiddenKubeletKey { key: String },

        #[snafu(display("Unable to serialize kubelet configuration: {}", source))]
        KubeletConfig { source: serde_json::Error },

        #[snafu(display(
            "cannot set settings.kubernetes.{}; labels and taints should be set on the managedNodeGroup object",
            key
        ))]
        LabelsAndTaintsInSettings { key: String },

        #[snafu(display("Unable to build node configuration: {}", source))]
        NodeConfig { source: crate::nodeconfig::Error },

        #[snafu(display("Unable to render settings: {}", source))]
        Settings { source: crate::settings::Error },

        #[snafu(display("Unable to parse service CIDR '{}': {}", cidr, source))]
        ServiceCidr {
            cidr: String,
            source: ipnet::AddrParseError,
        },

        #[snafu(display("unrecognized AMI family '{}' for creating bootstrapper: {}", family, source))]
        UnknownOsFamily {
            family: String,
            source: serde_plain::Error,
        },
    }
}

pub use error::Error;
pub type Result<T> = std::result::Result<T, error::Error>;

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
