//! CPU and OS tag handling.

/// Machine tag marking source-only implementations.
pub const SOURCE_MACHINE: &str = "src";

/// Auxiliary machine-group names. Implementations from different groups
/// cannot be mixed in one selection set.
pub const MACHINE_GROUP_DEFAULT: &str = "mDef";
pub const MACHINE_GROUP_64: &str = "m64";

const MACHINES_64: &[&str] = &["x86_64", "aarch64", "ppc64", "ppc64le", "s390x", "riscv64"];

/// Machine group for a concrete machine tag. Source implementations and
/// wildcard tags belong to no group.
pub fn machine_group(machine: &str) -> Option<&'static str> {
    if machine == SOURCE_MACHINE || machine == "*" {
        return None;
    }
    if MACHINES_64.contains(&machine) {
        Some(MACHINE_GROUP_64)
    } else {
        Some(MACHINE_GROUP_DEFAULT)
    }
}

/// Machine tags runnable on `machine`, best first.
pub fn machine_ranks(machine: &str) -> Vec<String> {
    let ranks: &[&str] = match machine {
        "x86_64" => &["x86_64", "i686", "i586", "i486", "i386"],
        "i686" => &["i686", "i586", "i486", "i386"],
        "i586" => &["i586", "i486", "i386"],
        "i486" => &["i486", "i386"],
        "aarch64" => &["aarch64", "armv7l", "armv6l"],
        "armv7l" => &["armv7l", "armv6l"],
        "ppc64" => &["ppc64", "ppc"],
        other => return vec![other.to_string()],
    };
    ranks.iter().map(|m| m.to_string()).collect()
}

/// OS tags runnable on `os`, best first.
pub fn os_ranks(os: &str) -> Vec<String> {
    let ranks: &[&str] = match os {
        "Linux" => &["Linux", "POSIX"],
        "Darwin" => &["Darwin", "MacOSX", "POSIX"],
        "FreeBSD" => &["FreeBSD", "POSIX"],
        "Windows" => &["Windows"],
        other => return vec![other.to_string(), "POSIX".to_string()],
    };
    ranks.iter().map(|o| o.to_string()).collect()
}
