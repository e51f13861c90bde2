// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::Path;

use anyhow::{Context, Result, bail};
use irods_client::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    client::registry::SessionRegistry,
    control_block::status::TransferStatus,
    fs::{collection::Collection, object::DataObject, path::IrodsPath, stat::StatCache},
    transfer::orchestrator,
};
use tracing::info;

struct StdoutListener;

impl irods_client::control_block::transfer::TransferListener for StdoutListener {
    fn on_status(&self, status: TransferStatus) {
        info!(
            op = ?status.operation,
            state = ?status.state,
            path = %status.path.display(),
            bytes = status.bytes_transferred,
            bytes_total = status.bytes_total,
            files = status.files_transferred,
            files_total = status.files_total,
            "transfer status"
        );
    }
}

/// Small demo CLI: `irods_shell <config.yaml> <ls|put|get|stat> <args...>`.
///
/// Exercises the library surface for manual smoke testing; it is not part
/// of the public API described by spec.md §1's Out-of-scope list (see
/// SPEC_FULL.md §0).
#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger("demos/config_logger.yaml")?;

    let mut args = std::env::args().skip(1);
    let config_arg = args.next().unwrap_or_else(|| "demos/account.yaml".to_string());
    let command = args.next().unwrap_or_else(|| "ls".to_string());

    let cfg = resolve_config_path(&config_arg)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let registry = SessionRegistry::new();
    let conn = registry.acquire(&cfg).await.context("failed to connect/authenticate")?;
    info!(host = %cfg.account.host, "connected and authenticated");

    let cache = StatCache::new();
    let home = format!("/{}/home/{}", cfg.account.zone, cfg.account.effective_user());

    match command.as_str() {
        "ls" => {
            let target = args.next().unwrap_or_else(|| home.clone());
            let path = IrodsPath::new(&target, &home);
            let coll = Collection::new(conn.clone(), path);
            let entries = coll.list_children(&cache).await?;
            for entry in entries {
                println!("{}\t{}", if entry.is_collection { "C" } else { "d" }, entry.path);
            }
        },
        "put" => {
            let local = args.next().context("put requires a local path")?;
            let remote = args.next().unwrap_or_else(|| home.clone());
            let remote_path = IrodsPath::new(&remote, &home);
            orchestrator::put(&conn, Path::new(&local), &remote_path, Some(&StdoutListener), None).await?;
        },
        "get" => {
            let remote = args.next().context("get requires a remote path")?;
            let local = args.next().context("get requires a local path")?;
            let remote_path = IrodsPath::new(&remote, &home);
            orchestrator::get(&conn, &remote_path, Path::new(&local), Some(&StdoutListener), None).await?;
        },
        "stat" => {
            let target = args.next().context("stat requires a path")?;
            let path = IrodsPath::new(&target, &home);
            let object = DataObject::new(conn.clone(), path.clone());
            if object.exists(&cache).await? {
                println!("{} exists, length={}", path, object.length(&cache).await?);
            } else {
                println!("{} does not exist", path);
            }
        },
        other => bail!("unknown command {other:?}; expected ls|put|get|stat"),
    }

    registry.release(&cfg.account).await;
    Ok(())
}
