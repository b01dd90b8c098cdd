// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! MemFS FUSE Host
//!
//! Mounts a flat, volatile in-memory filesystem through libfuse. Everything
//! written to the mount is lost when it is unmounted.

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod adapter;
#[cfg_attr(not(all(feature = "fuse", target_os = "linux")), allow(dead_code))]
mod inodes;

#[cfg(all(feature = "fuse", target_os = "linux"))]
use adapter::MemFsFuse;
use anyhow::{Context, Result};
use clap::Parser;
use memfs_core::{FsConfig, Owner};
use memfs_logging::CliLoggingArgs;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "memfs-fuse-host", about = "Mount a flat in-memory filesystem")]
struct Args {
    /// Mount point for the filesystem
    mount_point: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Allow other users to access the filesystem
    #[arg(long)]
    allow_other: bool,

    /// Allow root to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Auto unmount on process exit
    #[arg(long)]
    auto_unmount: bool,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

fn load_config(config_path: Option<PathBuf>) -> Result<FsConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config = FsConfig::from_json_bytes(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(FsConfig::default()),
    }
}

/// Identity of the user running the host
fn process_owner() -> Owner {
    // SAFETY: getuid and getgid have no preconditions and cannot fail.
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    Owner { uid, gid }
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.logging.clone().init(env!("CARGO_PKG_NAME"))?;

    info!("Starting MemFS FUSE Host");
    info!("Mount point: {}", args.mount_point.display());

    let mut config = load_config(args.config)?;
    if config.owner.is_none() {
        config.owner = Some(process_owner());
    }
    info!("Configuration loaded: {:?}", config);

    #[cfg(all(feature = "fuse", target_os = "linux"))]
    {
        let filesystem = MemFsFuse::new(&config);
        let store = filesystem.store();

        let mut mount_options = vec![
            fuser::MountOption::FSName("memfs".to_string()),
            fuser::MountOption::Subtype("memfs".to_string()),
        ];

        info!(
            "Cache policy: attr={}ms entry={}ms",
            config.cache.attr_ttl_ms, config.cache.entry_ttl_ms
        );

        if args.allow_other {
            mount_options.push(fuser::MountOption::AllowOther);
        }

        if args.allow_root {
            mount_options.push(fuser::MountOption::AllowRoot);
        }

        if args.auto_unmount {
            mount_options.push(fuser::MountOption::AutoUnmount);
        }

        info!("Mounting filesystem...");
        let session = fuser::spawn_mount2(filesystem, &args.mount_point, &mount_options)
            .with_context(|| format!("mounting {}", args.mount_point.display()))?;
        info!("MemFS FUSE host mounted; blocking until unmount");
        session.join();

        let stats = store.stats();
        info!(
            files = stats.files,
            open_files = stats.open_files,
            bytes = stats.bytes_in_memory,
            "MemFS FUSE host unmounted"
        );
    }

    #[cfg(not(all(feature = "fuse", target_os = "linux")))]
    {
        warn!("FUSE support not compiled in. This binary is for testing only.");
        let store = memfs_core::FileStore::new(&config);
        store.init();
        info!(limits = ?store.limits(), "MemFS core initialized");
        info!("To enable FUSE support, compile with: cargo build --features fuse");
    }

    Ok(())
}
