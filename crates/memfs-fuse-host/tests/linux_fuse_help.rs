// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

#[cfg(target_os = "linux")]
mod linux_tests {
    use std::path::PathBuf;
    use std::process::Command;

    fn host_binary() -> Option<PathBuf> {
        // crates/memfs-fuse-host -> workspace root
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let workspace_root = crate_dir.parent()?.parent()?.to_path_buf();
        let bin_path = workspace_root.join("target").join("debug").join("memfs-fuse-host");
        if bin_path.exists() {
            Some(bin_path)
        } else {
            eprintln!(
                "Skipping FUSE host CLI test: binary not found at {}",
                bin_path.display()
            );
            None
        }
    }

    #[test]
    fn fuse_host_binary_help_runs() {
        let Some(bin_path) = host_binary() else {
            return;
        };

        // --help must not attempt a mount
        let output = Command::new(&bin_path)
            .arg("--help")
            .output()
            .expect("able to execute memfs-fuse-host");

        assert!(output.status.success(), "--help should succeed");
        let help = String::from_utf8_lossy(&output.stdout);
        assert!(help.contains("--config"));
        assert!(help.contains("--log-level"));
    }

    #[test]
    fn fuse_host_requires_mount_point() {
        let Some(bin_path) = host_binary() else {
            return;
        };

        let status = Command::new(&bin_path)
            .status()
            .expect("able to execute memfs-fuse-host");

        assert!(!status.success(), "missing mount point should be rejected");
    }
}
