//! The scripts that ship inside the binary and get embedded into user-data by name.

use lazy_static::lazy_static;
use snafu::OptionExt;
use std::collections::HashMap;

pub const BOOTSTRAP_HELPER: &str = "bootstrap.helper.sh";
pub const BOOTSTRAP_AL2: &str = "bootstrap.al2.sh";
pub const BOOTSTRAP_UBUNTU: &str = "bootstrap.ubuntu.sh";
pub const EFA_AL2: &str = "efa.al2.sh";
pub const EFA_UBUNTU: &str = "efa.ubuntu.sh";
pub const EFA_MANAGED_BOOTHOOK: &str = "efa.managed.boothook";
pub const AL2023_XTABLES_LOCK: &str = "al2023-xtables.lock.sh";

lazy_static! {
    static ref ASSETS: HashMap<&'static str, &'static str> = [
        (BOOTSTRAP_HELPER, include_str!("../assets/bootstrap.helper.sh")),
        (BOOTSTRAP_AL2, include_str!("../assets/bootstrap.al2.sh")),
        (BOOTSTRAP_UBUNTU, include_str!("../assets/bootstrap.ubuntu.sh")),
        (EFA_AL2, include_str!("../assets/efa.al2.sh")),
        (EFA_UBUNTU, include_str!("../assets/efa.ubuntu.sh")),
        (EFA_MANAGED_BOOTHOOK, include_str!("../assets/efa.managed.boothook")),
        (AL2023_XTABLES_LOCK, include_str!("../assets/al2023-xtables.lock.sh")),
    ]
    .into_iter()
    .collect();
}

/// Returns the contents of the named asset.
pub fn get(name: &str) -> Result<&'static str> {
    ASSETS
        .get(name)
        .copied()
        .context(error::UnknownAssetSnafu { name })
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum Error {
        #[snafu(display("No embedded asset named '{}'", name))]
        UnknownAsset { name: String },
    }
}

pub use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scripts_have_shebang() {
        for name in [
            BOOTSTRAP_HELPER,
            BOOTSTRAP_AL2,
            BOOTSTRAP_UBUNTU,
            EFA_AL2,
            EFA_UBUNTU,
            AL2023_XTABLES_LOCK,
        ] {
            assert!(get(name).unwrap().starts_with("#!/bin/bash\n"), "{}", name);
        }
    }

    #[test]
    fn boothook_is_not_a_script() {
        assert!(!get(EFA_MANAGED_BOOTHOOK).unwrap().starts_with("#!"));
    }

    #[test]
    fn unknown_asset() {
        let err = get("install-ssm.al2.sh").unwrap_err();
        assert!(err.to_string().contains("install-ssm.al2.sh"));
    }
}
