//! Package set resolution.
//!
//! Decides what goes into the rootfs and what is only carried on the media.
//! Installer images boot a fixed minimal system and ship the requested
//! packages as a repository; every other image type installs the requested
//! packages directly.

use serde::Serialize;

use crate::build_type::BuildType;
use crate::input::PackageList;

/// Root filesystem of an installer image. Independent of the request.
pub const BASE_SYSTEM_PACKAGES: &[&str] = &[
    // === BASE LAYOUT ===
    "filesystem",
    "basesystem",
    "setup",
    "rootfiles",

    // === SHELL AND CORE TOOLS ===
    "bash",
    "coreutils",
    "sed",
    "grep",
    "findutils",
    "file",
    "bc",
    "less",
    "vim-minimal",
    "hostname",
    "passwd",
    "sudo",

    // === LIBRARIES ===
    "glibc",
    "ncurses",
    "ncurses-libs",
    "readline",
    "openssl",
    "libtool",
    "pkgconf",
    "gdbm",
    "expat",
    "zlib",
    "nspr",
    "elfutils-libelf",

    // === COMPRESSION ===
    "bzip2",
    "gzip",
    "xz",
    "tar",
    "cpio",

    // === INIT AND SYSTEM SERVICES ===
    "systemd",
    "initscripts",
    "dbus",
    "cronie",
    "audit",
    "rsyslog",
    "irqbalance",
    "tuned",
    "rng-tools",
    "sssd",
    "authselect",
    "kbd",
    "procps-ng",
    "util-linux",

    // === KERNEL AND BOOT ===
    "kernel",
    "kernel-tools",
    "linux-firmware",
    "grubby",
    "kexec-tools",
    "dracut-config-rescue",
    "dracut-config-generic",
    "dracut-network",

    // === STORAGE ===
    "e2fsprogs",
    "xfsprogs",
    "lvm2",
    "parted",
    "iprutils",
    "lsscsi",
    "sg3_utils",
    "rdma-core",

    // === NETWORK ===
    "iproute",
    "net-tools",
    "bridge-utils",
    "NetworkManager",
    "NetworkManager-config-server",
    "firewalld",
    "openssh",
    "openssh-server",
    "openssh-clients",

    // === SECURITY ===
    "policycoreutils",
    "selinux-policy-targeted",
    "selinux-policy-mls",
    "security-tool",

    // === HARDWARE ===
    "sysfsutils",
    "lshw",
];

/// Output of [`resolve`]: a pure function of build type and request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagePlan {
    /// Installed into the rootfs.
    pub install: Vec<String>,
    /// Downloaded into the on-media repository, not installed.
    pub extra: Vec<String>,
    /// Boot straight to a root shell.
    pub auto_login: bool,
}

/// Compute the effective package sets for `build_type`.
pub fn resolve(build_type: BuildType, requested: &PackageList) -> PackagePlan {
    match build_type {
        BuildType::InstallerIso => PackagePlan {
            install: BASE_SYSTEM_PACKAGES.iter().map(|p| p.to_string()).collect(),
            extra: requested.as_slice().to_vec(),
            auto_login: true,
        },
        BuildType::Vhd | BuildType::LivecdIso => PackagePlan {
            install: requested.as_slice().to_vec(),
            extra: Vec::new(),
            auto_login: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::Path;

    fn list(names: &[&str]) -> PackageList {
        PackageList::new(
            names.iter().map(|s| s.to_string()).collect(),
            Path::new("packages.json"),
        )
        .unwrap()
    }

    #[test]
    fn test_live_and_vhd_install_requested_set() {
        let requested = list(&["bash", "coreutils", "bash"]);
        for build_type in [BuildType::Vhd, BuildType::LivecdIso] {
            let plan = resolve(build_type, &requested);
            assert_eq!(plan.install, requested.as_slice());
            assert!(plan.extra.is_empty());
            assert!(!plan.auto_login);
        }
    }

    #[test]
    fn test_installer_uses_base_set_regardless_of_request() {
        let a = resolve(BuildType::InstallerIso, &list(&["vim"]));
        let b = resolve(BuildType::InstallerIso, &list(&["emacs", "gcc"]));

        assert_eq!(a.install, b.install);
        assert_eq!(a.install.len(), BASE_SYSTEM_PACKAGES.len());
        assert_eq!(a.extra, vec!["vim".to_string()]);
        assert_eq!(b.extra, vec!["emacs".to_string(), "gcc".to_string()]);
        assert!(a.auto_login && b.auto_login);
    }

    #[test]
    fn test_requested_package_not_installed_for_installer() {
        let plan = resolve(BuildType::InstallerIso, &list(&["vim"]));
        assert!(!plan.install.iter().any(|p| p == "vim"));
    }

    #[test]
    fn test_base_set_has_kernel_and_no_duplicates() {
        let unique: HashSet<_> = BASE_SYSTEM_PACKAGES.iter().collect();
        assert_eq!(unique.len(), BASE_SYSTEM_PACKAGES.len());
        for required in ["kernel", "systemd", "lvm2", "NetworkManager", "parted"] {
            assert!(unique.contains(&required), "{required} missing from base set");
        }
    }
}
