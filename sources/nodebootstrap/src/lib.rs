/*!
# Introduction

nodebootstrap generates the boot-time user-data that lets a freshly launched instance join a
Kubernetes cluster as a node.

A node group is described by a [`NodeBootstrapSpec`]; the cluster it joins by a
[`ClusterRuntimeStatus`].  From the node group's OS family, whether it's managed, and whether it
launches from a custom image, [`select`] picks a bootstrapper, and the bootstrapper renders
user-data in the format that OS family's init system reads:

* AL2 and Ubuntu: a gzipped `#cloud-config` document, or a multipart MIME message for managed
  node groups.
* AL2023: a multipart MIME message carrying scripts and a `NodeConfig` document.
* Bottlerocket: a TOML settings document.
* Windows: a PowerShell script.

Every format is returned base64-encoded, ready to be used verbatim as instance user-data.
Generation is a pure function of its inputs; the only other thing it reads is the set of
scripts compiled into the crate.

```
use nodebootstrap::{user_data, ClusterRuntimeStatus, NodeBootstrapSpec, OsFamily};

let status = ClusterRuntimeStatus {
    name: "example".to_string(),
    endpoint: "https://example.com".to_string(),
    certificate_authority_data: b"CA".to_vec(),
    service_ipv4_cidr: Some("10.100.0.0/16".to_string()),
    ..Default::default()
};
let spec = NodeBootstrapSpec::new(OsFamily::Bottlerocket);
assert!(!user_data(&spec, &status).unwrap().is_empty());
```
*/

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_plain;

pub mod assets;
pub mod bootstrapper;
pub mod format;
pub mod instance_types;
pub mod mime;
pub mod model;
pub mod nodeconfig;
pub mod reserved;
pub mod settings;
pub mod windows;

pub use bootstrapper::{select, select_by_name, Bootstrapper, Error, UserData, Variant};
pub use model::{
    Ami, BottlerocketOptions, ClusterRuntimeStatus, InlineDocument, InstanceResources,
    NodeBootstrapSpec, NodeGroupKind, OsFamily, Taint,
};

/// Generates user-data for a node group joining the given cluster.
pub fn user_data(
    spec: &NodeBootstrapSpec,
    status: &ClusterRuntimeStatus,
) -> bootstrapper::Result<String> {
    Bootstrapper::new(spec, status)?.user_data()
}
