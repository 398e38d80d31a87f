//! Capacity of known EC2 instance types, used to size default kubelet reservations when a node
//! group names its instance types but not its resources.

use crate::model::InstanceResources;

/// `(instance type, vCPUs, memory in MiB)`, sorted by instance type.
const INSTANCE_TYPES: &[(&str, u64, u64)] = &[
    ("a1.2xlarge", 8, 16384),
    ("a1.4xlarge", 16, 32768),
    ("a1.large", 2, 4096),
    ("a1.medium", 1, 2048),
    ("a1.metal", 16, 32768),
    ("a1.xlarge", 4, 8192),
    ("c1.medium", 2, 1740),
    ("c1.xlarge", 8, 7168),
    ("c3.2xlarge", 8, 15360),
    ("c3.4xlarge", 16, 30720),
    ("c3.8xlarge", 32, 61440),
    ("c3.large", 2, 3840),
    ("c3.xlarge", 4, 7680),
    ("c4.2xlarge", 8, 15360),
    ("c4.4xlarge", 16, 30720),
    ("c4.8xlarge", 36, 61440),
    ("c4.large", 2, 3840),
    ("c4.xlarge", 4, 7680),
    ("c5.12xlarge", 48, 98304),
    ("c5.18xlarge", 72, 147456),
    ("c5.24xlarge", 96, 196608),
    ("c5.2xlarge", 8, 16384),
    ("c5.4xlarge", 16, 32768),
    ("c5.9xlarge", 36, 73728),
    ("c5.large", 2, 4096),
    ("c5.metal", 96, 196608),
    ("c5.xlarge", 4, 8192),
    ("c5d.12xlarge", 48, 98304),
    ("c5d.18xlarge", 72, 147456),
    ("c5d.24xlarge", 96, 196608),
    ("c5d.2xlarge", 8, 16384),
    ("c5d.4xlarge", 16, 32768),
    ("c5d.9xlarge", 36, 73728),
    ("c5d.large", 2, 4096),
    ("c5d.metal", 96, 196608),
    ("c5d.xlarge", 4, 8192),
    ("c5n.18xlarge", 72, 196608),
    ("c5n.2xlarge", 8, 21504),
    ("c5n.4xlarge", 16, 43008),
    ("c5n.9xlarge", 36, 98304),
    ("c5n.large", 2, 5376),
    ("c5n.metal", 72, 196608),
    ("c5n.xlarge", 4, 10752),
    ("cc2.8xlarge", 32, 61952),
    ("d2.2xlarge", 8, 62464),
    ("d2.4xlarge", 16, 124928),
    ("d2.8xlarge", 36, 249856),
    ("d2.xlarge", 4, 31232),
    ("f1.16xlarge", 64, 999424),
    ("f1.2xlarge", 8, 124928),
    ("f1.4xlarge", 16, 249856),
    ("g2.2xlarge", 8, 15360),
    ("g2.8xlarge", 32, 61440),
    ("g3.16xlarge", 64, 499712),
    ("g3.4xlarge", 16, 124928),
    ("g3.8xlarge", 32, 249856),
    ("g3s.xlarge", 4, 31232),
    ("g4dn.12xlarge", 48, 196608),
    ("g4dn.16xlarge", 64, 262144),
    ("g4dn.2xlarge", 8, 32768),
    ("g4dn.4xlarge", 16, 65536),
    ("g4dn.8xlarge", 32, 131072),
    ("g4dn.metal", 96, 393216),
    ("g4dn.xlarge", 4, 16384),
    ("h1.16xlarge", 64, 262144),
    ("h1.2xlarge", 8, 32768),
    ("h1.4xlarge", 16, 65536),
    ("h1.8xlarge", 32, 131072),
    ("i2.2xlarge", 8, 62464),
    ("i2.4xlarge", 16, 124928),
    ("i2.8xlarge", 32, 249856),
    ("i2.xlarge", 4, 31232),
    ("i3.16xlarge", 64, 499712),
    ("i3.2xlarge", 8, 62464),
    ("i3.4xlarge", 16, 124928),
    ("i3.8xlarge", 32, 249856),
    ("i3.large", 2, 15616),
    ("i3.metal", 72, 524288),
    ("i3.xlarge", 4, 31232),
    ("i3en.12xlarge", 48, 393216),
    ("i3en.24xlarge", 96, 786432),
    ("i3en.2xlarge", 8, 65536),
    ("i3en.3xlarge", 12, 98304),
    ("i3en.6xlarge", 24, 196608),
    ("i3en.large", 2, 16384),
    ("i3en.metal", 96, 786432),
    ("i3en.xlarge", 4, 32768),
    ("inf1.24xlarge", 96, 196608),
    ("inf1.2xlarge", 8, 16384),
    ("inf1.6xlarge", 24, 49152),
    ("inf1.xlarge", 4, 8192),
    ("m1.large", 2, 7680),
    ("m1.medium", 1, 3788),
    ("m1.small", 1, 1740),
    ("m1.xlarge", 4, 15360),
    ("m2.2xlarge", 4, 35020),
    ("m2.4xlarge", 8, 70041),
    ("m2.xlarge", 2, 17510),
    ("m3.2xlarge", 8, 30720),
    ("m3.large", 2, 7680),
    ("m3.medium", 1, 3840),
    ("m3.xlarge", 4, 15360),
    ("m4.10xlarge", 40, 163840),
    ("m4.16xlarge", 64, 262144),
    ("m4.2xlarge", 8, 32768),
    ("m4.4xlarge", 16, 65536),
    ("m4.large", 2, 8192),
    ("m4.xlarge", 4, 16384),
    ("m5.12xlarge", 48, 196608),
    ("m5.16xlarge", 64, 262144),
    ("m5.24xlarge", 96, 393216),
    ("m5.2xlarge", 8, 32768),
    ("m5.4xlarge", 16, 65536),
    ("m5.8xlarge", 32, 131072),
    ("m5.large", 2, 8192),
    ("m5.metal", 96, 393216),
    ("m5.xlarge", 4, 16384),
    ("m5a.12xlarge", 48, 196608),
    ("m5a.16xlarge", 64, 262144),
    ("m5a.24xlarge", 96, 393216),
    ("m5a.2xlarge", 8, 32768),
    ("m5a.4xlarge", 16, 65536),
    ("m5a.8xlarge", 32, 131072),
    ("m5a.large", 2, 8192),
    ("m5a.xlarge", 4, 16384),
    ("m5ad.12xlarge", 48, 196608),
    ("m5ad.16xlarge", 64, 262144),
    ("m5ad.24xlarge", 96, 393216),
    ("m5ad.2xlarge", 8, 32768),
    ("m5ad.4xlarge", 16, 65536),
    ("m5ad.8xlarge", 32, 131072),
    ("m5ad.large", 2, 8192),
    ("m5ad.xlarge", 4, 16384),
    ("m5d.12xlarge", 48, 196608),
    ("m5d.16xlarge", 64, 262144),
    ("m5d.24xlarge", 96, 393216),
    ("m5d.2xlarge", 8, 32768),
    ("m5d.4xlarge", 16, 65536),
    ("m5d.8xlarge", 32, 131072),
    ("m5d.large", 2, 8192),
    ("m5d.metal", 96, 393216),
    ("m5d.xlarge", 4, 16384),
    ("m5dn.12xlarge", 48, 196608),
    ("m5dn.16xlarge", 64, 262144),
    ("m5dn.24xlarge", 96, 393216),
    ("m5dn.2xlarge", 8, 32768),
    ("m5dn.4xlarge", 16, 65536),
    ("m5dn.8xlarge", 32, 131072),
    ("m5dn.large", 2, 8192),
    ("m5dn.xlarge", 4, 16384),
    ("m5n.12xlarge", 48, 196608),
    ("m5n.16xlarge", 64, 262144),
    ("m5n.24xlarge", 96, 393216),
    ("m5n.2xlarge", 8, 32768),
    ("m5n.4xlarge", 16, 65536),
    ("m5n.8xlarge", 32, 131072),
    ("m5n.large", 2, 8192),
    ("m5n.xlarge", 4, 16384),
    ("p2.16xlarge", 64, 749568),
    ("p2.8xlarge", 32, 499712),
    ("p2.xlarge", 4, 62464),
    ("p3.16xlarge", 64, 499712),
    ("p3.2xlarge", 8, 62464),
    ("p3.8xlarge", 32, 249856),
    ("p3dn.24xlarge", 96, 786432),
    ("r3.2xlarge", 8, 62464),
    ("r3.4xlarge", 16, 124928),
    ("r3.8xlarge", 32, 249856),
    ("r3.large", 2, 15360),
    ("r3.xlarge", 4, 31232),
    ("r4.16xlarge", 64, 499712),
    ("r4.2xlarge", 8, 62464),
    ("r4.4xlarge", 16, 124928),
    ("r4.8xlarge", 32, 249856),
    ("r4.large", 2, 15616),
    ("r4.xlarge", 4, 31232),
    ("r5.12xlarge", 48, 393216),
    ("r5.16xlarge", 64, 524288),
    ("r5.24xlarge", 96, 786432),
    ("r5.2xlarge", 8, 65536),
    ("r5.4xlarge", 16, 131072),
    ("r5.8xlarge", 32, 262144),
    ("r5.large", 2, 16384),
    ("r5.metal", 96, 786432),
    ("r5.xlarge", 4, 32768),
    ("r5a.12xlarge", 48, 393216),
    ("r5a.16xlarge", 64, 524288),
    ("r5a.24xlarge", 96, 786432),
    ("r5a.2xlarge", 8, 65536),
    ("r5a.4xlarge", 16, 131072),
    ("r5a.8xlarge", 32, 262144),
    ("r5a.large", 2, 16384),
    ("r5a.xlarge", 4, 32768),
    ("r5ad.12xlarge", 48, 393216),
    ("r5ad.16xlarge", 64, 524288),
    ("r5ad.24xlarge", 96, 786432),
    ("r5ad.2xlarge", 8, 65536),
    ("r5ad.4xlarge", 16, 131072),
    ("r5ad.8xlarge", 32, 262144),
    ("r5ad.large", 2, 16384),
    ("r5ad.xlarge", 4, 32768),
    ("r5d.12xlarge", 48, 393216),
    ("r5d.16xlarge", 64, 524288),
    ("r5d.24xlarge", 96, 786432),
    ("r5d.2xlarge", 8, 65536),
    ("r5d.4xlarge", 16, 131072),
    ("r5d.8xlarge", 32, 262144),
    ("r5d.large", 2, 16384),
    ("r5d.metal", 96, 786432),
    ("r5d.xlarge", 4, 32768),
    ("r5dn.12xlarge", 48, 393216),
    ("r5dn.16xlarge", 64, 524288),
    ("r5dn.24xlarge", 96, 786432),
    ("r5dn.2xlarge", 8, 65536),
    ("r5dn.4xlarge", 16, 131072),
    ("r5dn.8xlarge", 32, 262144),
    ("r5dn.large", 2, 16384),
    ("r5dn.xlarge", 4, 32768),
    ("r5n.12xlarge", 48, 393216),
    ("r5n.16xlarge", 64, 524288),
    ("r5n.24xlarge", 96, 786432),
    ("r5n.2xlarge", 8, 65536),
    ("r5n.4xlarge", 16, 131072),
    ("r5n.8xlarge", 32, 262144),
    ("r5n.large", 2, 16384),
    ("r5n.xlarge", 4, 32768),
    ("t1.micro", 1, 627),
    ("t2.2xlarge", 8, 32768),
    ("t2.large", 2, 8192),
    ("t2.medium", 2, 4096),
    ("t2.micro", 1, 1024),
    ("t2.nano", 1, 512),
    ("t2.small", 1, 2048),
    ("t2.xlarge", 4, 16384),
    ("t3.2xlarge", 8, 32768),
    ("t3.large", 2, 8192),
    ("t3.medium", 2, 4096),
    ("t3.micro", 2, 1024),
    ("t3.nano", 2, 512),
    ("t3.small", 2, 2048),
    ("t3.xlarge", 4, 16384),
    ("t3a.2xlarge", 8, 32768),
    ("t3a.large", 2, 8192),
    ("t3a.medium", 2, 4096),
    ("t3a.micro", 2, 1024),
    ("t3a.nano", 2, 512),
    ("t3a.small", 2, 2048),
    ("t3a.xlarge", 4, 16384),
    ("x1.16xlarge", 64, 999424),
    ("x1.32xlarge", 128, 1998848),
    ("x1e.16xlarge", 64, 1998848),
    ("x1e.2xlarge", 8, 249856),
    ("x1e.32xlarge", 128, 3997696),
    ("x1e.4xlarge", 16, 499712),
    ("x1e.8xlarge", 32, 999424),
    ("x1e.xlarge", 4, 124928),
    ("z1d.12xlarge", 48, 393216),
    ("z1d.2xlarge", 8, 65536),
    ("z1d.3xlarge", 12, 98304),
    ("z1d.6xlarge", 24, 196608),
    ("z1d.large", 2, 16384),
    ("z1d.metal", 48, 393216),
    ("z1d.xlarge", 4, 32768),
];

/// The capacity of one instance type, if it's known.
pub fn lookup(instance_type: &str) -> Option<InstanceResources> {
    INSTANCE_TYPES
        .binary_search_by_key(&instance_type, |&(name, _, _)| name)
        .ok()
        .map(|index| {
            let (_, cpus, memory_mib) = INSTANCE_TYPES[index];
            InstanceResources { cpus, memory_mib }
        })
}

/// The capacity every node is guaranteed to have when a node group mixes instance types: the
/// smallest CPU count and the smallest memory among the known types.  Unknown types are skipped;
/// returns None if none are known.
pub fn smallest<S: AsRef<str>>(instance_types: &[S]) -> Option<InstanceResources> {
    instance_types
        .iter()
        .filter_map(|instance_type| {
            let resources = lookup(instance_type.as_ref());
            if resources.is_none() {
                debug!("No capacity data for instance type '{}'", instance_type.as_ref());
            }
            resources
        })
        .reduce(|smallest, resources| InstanceResources {
            cpus: smallest.cpus.min(resources.cpus),
            memory_mib: smallest.memory_mib.min(resources.memory_mib),
        })
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
