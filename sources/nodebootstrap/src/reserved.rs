//! Default kubelet resource reservations, computed from instance capacity.
//!
//! Each resource uses a progressive table: a bracket's rate applies only to the part of the
//! capacity that falls inside it, like income tax brackets.  Rates are in basis points so the
//! arithmetic stays in integers.

use crate::model::InstanceResources;
use serde::Serialize;

struct Bracket {
    /// Inclusive upper end of the bracket.
    upper: u64,
    basis_points: u64,
}

const MEMORY_BRACKETS: &[Bracket] = &[
    Bracket { upper: 4096, basis_points: 2500 },
    Bracket { upper: 8192, basis_points: 2000 },
    Bracket { upper: 16384, basis_points: 1000 },
    Bracket { upper: 131072, basis_points: 600 },
    Bracket { upper: u64::MAX, basis_points: 200 },
];

/// Reserved memory never drops below this many MiB.
const MEMORY_FLOOR_MIB: u64 = 255;

/// In millicores.
const CPU_BRACKETS: &[Bracket] = &[
    Bracket { upper: 1000, basis_points: 600 },
    Bracket { upper: 2000, basis_points: 100 },
    Bracket { upper: 4000, basis_points: 50 },
    Bracket { upper: u64::MAX, basis_points: 25 },
];

const STORAGE_RESERVED: &str = "1Gi";

fn progressive(value: u64, brackets: &[Bracket]) -> u64 {
    let mut lower = 0;
    let mut total = 0;
    for bracket in brackets {
        if value <= lower {
            break;
        }
        let portion = value.min(bracket.upper) - lower;
        total = portion
            .saturating_mul(bracket.basis_points)
            .saturating_add(total);
        lower = bracket.upper;
    }
    total / 10_000
}

/// Memory to reserve for an instance with the given MiB of memory, e.g. `"1024Mi"`.
pub fn memory_to_reserve(memory_mib: u64) -> String {
    let reserved = progressive(memory_mib, MEMORY_BRACKETS).max(MEMORY_FLOOR_MIB);
    format!("{}Mi", reserved)
}

/// CPU to reserve for an instance with the given number of cores, e.g. `"60m"`.
pub fn cpu_to_reserve(cpus: u64) -> String {
    format!("{}m", progressive(cpus.saturating_mul(1000), CPU_BRACKETS))
}

pub fn storage_to_reserve() -> String {
    STORAGE_RESERVED.to_string()
}

/// The `kubeReserved` section of kubelet configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KubeReserved {
    pub cpu: String,
    pub memory: String,
    #[serde(rename = "ephemeral-storage")]
    pub ephemeral_storage: String,
}

impl From<&InstanceResources> for KubeReserved {
    fn from(resources: &InstanceResources) -> Self {
        Self {
            cpu: cpu_to_reserve(resources.cpus),
            memory: memory_to_reserve(resources.memory_mib),
            ephemeral_storage: storage_to_reserve(),
        }
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory() {
        assert_eq!(memory_to_reserve(0), "255Mi");
        assert_eq!(memory_to_reserve(1024), "256Mi");
        assert_eq!(memory_to_reserve(4096), "1024Mi");
        // 1024 + 819.2
        assert_eq!(memory_to_reserve(8192), "1843Mi");
        // 1024 + 819.2 + 819.2 + 6881.28 + 40.96
        assert_eq!(memory_to_reserve(133120), "9584Mi");
    }

    #[test]
    fn cpu() {
        assert_eq!(cpu_to_reserve(0), "0m");
        assert_eq!(cpu_to_reserve(1), "60m");
        assert_eq!(cpu_to_reserve(2), "70m");
        assert_eq!(cpu_to_reserve(4), "80m");
        assert_eq!(cpu_to_reserve(8), "90m");
        assert_eq!(cpu_to_reserve(72), "250m");
    }

    #[test]
    fn storage() {
        assert_eq!(storage_to_reserve(), "1Gi");
    }

    #[test]
    fn kube_reserved() {
        let reserved = KubeReserved::from(&InstanceResources {
            cpus: 2,
            memory_mib: 4096,
        });
        assert_eq!(
            serde_json::to_value(reserved).unwrap(),
            serde_json::json!({"cpu": "70m", "memory": "1024Mi", "ephemeral-storage": "1Gi"})
        );
    }
}
