// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The transfer orchestrator (spec.md §4.6, [MODULE] C7): the five public
//! operations, recursion policy, single-file policy dispatch, and the
//! error/cancellation/tie-break rules around them.

use std::{path::Path, sync::Arc};

use tracing::warn;

use crate::{
    client::connection::ConnectionHandle,
    control_block::{
        status::{OperationType, TransferStatus},
        transfer::{null_listener, TransferControlBlock, TransferListener},
    },
    error::{IrodsError, Result},
    fs::{collection::Collection, object::DataObject, path::IrodsPath, stat::StatCache},
    protocol::{
        header::MsgType,
        messages::{CollInp, DataObjCopyInp, DataObjRepl, EmptyReply, EndTransaction},
    },
    transfer::single,
};

const API_MOVE: i32 = 611;
const API_REPL: i32 = 700;
const API_END_TRANSACTION: i32 = 701;

/// Uploads a local file or directory tree to a remote path.
pub async fn put(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    listener: Option<&dyn TransferListener>,
    control: Option<Arc<TransferControlBlock>>,
) -> Result<()> {
    let cache = StatCache::new();
    let ctl = control.unwrap_or_else(|| Arc::new(TransferControlBlock::from_defaults(&conn.runtime.transfer)));
    let listener = listener.unwrap_or_else(null_listener);

    let metadata = tokio::fs::metadata(local)
        .await
        .map_err(|e| IrodsError::Internal(e.into()))?;

    if metadata.is_dir() {
        put_tree(conn, local, remote, listener, &ctl, &cache).await
    } else {
        // Put file -> existing directory: append source leaf to target.
        let target = resolve_put_target(conn, local, remote, &cache).await?;
        let (files_total, bytes_total) = (1u64, metadata.len());
        ctl.files_total.store(files_total, std::sync::atomic::Ordering::Relaxed);
        listener.on_status(TransferStatus::progress(
            OperationType::Put,
            local.to_path_buf(),
            0,
            bytes_total,
            0,
            files_total,
        ));
        transfer_one_file(conn, local, &target, OperationType::Put, listener, &ctl, &cache).await?;
        listener.on_status(TransferStatus {
            operation: OperationType::Put,
            state: crate::control_block::status::TransferState::OverallCompletion,
            path: local.to_path_buf(),
            bytes_transferred: ctl.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
            bytes_total,
            files_transferred: 1,
            files_total: 1,
            error: None,
        });
        Ok(())
    }
}

/// Downloads a remote data object or collection to a local path.
pub async fn get(
    conn: &Arc<ConnectionHandle>,
    remote: &IrodsPath,
    local: &Path,
    listener: Option<&dyn TransferListener>,
    control: Option<Arc<TransferControlBlock>>,
) -> Result<()> {
    let cache = StatCache::new();
    let ctl = control.unwrap_or_else(|| Arc::new(TransferControlBlock::from_defaults(&conn.runtime.transfer)));
    let listener = listener.unwrap_or_else(null_listener);

    let object = DataObject::new(conn.clone(), remote.clone());
    let is_collection = object.is_dir(&cache).await.unwrap_or(false);

    if is_collection {
        get_tree(conn, remote, local, listener, &ctl, &cache).await
    } else {
        ctl.files_total.store(1, std::sync::atomic::Ordering::Relaxed);
        transfer_one_get(conn, remote, local, listener, &ctl, &cache).await?;
        Ok(())
    }
}

/// Creates a new replica of `remote` on `resource`, leaving the existing
/// replica in place (distinct from [`DataObject::physical_move`], which
/// relocates it).
pub async fn replicate(
    conn: &Arc<ConnectionHandle>,
    remote: &IrodsPath,
    resource: &str,
    _listener: Option<&dyn TransferListener>,
    _control: Option<Arc<TransferControlBlock>>,
) -> Result<()> {
    let req = DataObjRepl { obj_path: remote.absolute(), resource: resource.to_string() };
    conn.call::<_, EmptyReply>(MsgType::ApiReq, API_REPL, &req).await?;
    Ok(())
}

/// Copies `src_remote` to `dst_remote` on `resource` (server default when
/// `None`), optionally replacing an existing target when `force` is set.
pub async fn copy(
    conn: &Arc<ConnectionHandle>,
    src_remote: &IrodsPath,
    resource: Option<&str>,
    dst_remote: &IrodsPath,
    force: bool,
    _listener: Option<&dyn TransferListener>,
    _control: Option<Arc<TransferControlBlock>>,
) -> Result<()> {
    if dst_remote.parent() == src_remote.parent() && dst_remote == src_remote {
        return Err(IrodsError::DuplicateData(format!(
            "copy to own parent: {}",
            src_remote.absolute()
        )));
    }

    let req = DataObjCopyInp {
        src_path: src_remote.absolute(),
        dst_path: dst_remote.absolute(),
        is_rename: false,
        resource: resource.map(str::to_string),
        force,
    };
    conn.call::<_, EmptyReply>(MsgType::ApiReq, API_MOVE, &req).await?;
    Ok(())
}

/// Renames/moves `src` to `dst` within the same zone.
pub async fn mv(conn: &Arc<ConnectionHandle>, src: &IrodsPath, dst: &IrodsPath) -> Result<()> {
    if src == dst {
        // Move to identical target: silently no-op.
        return Ok(());
    }
    if dst.parent() == src.parent() && dst == src {
        return Err(IrodsError::DuplicateData(format!("move to own parent: {}", src.absolute())));
    }

    let req = DataObjCopyInp {
        src_path: src.absolute(),
        dst_path: dst.absolute(),
        is_rename: true,
        resource: None,
        force: false,
    };
    conn.call::<_, EmptyReply>(MsgType::ApiReq, API_MOVE, &req).await?;
    Ok(())
}

/// Put file -> existing directory: append source leaf name to target;
/// put collection -> target must not exist or already be a directory.
async fn resolve_put_target(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    cache: &StatCache,
) -> Result<IrodsPath> {
    let object = DataObject::new(conn.clone(), remote.clone());
    if object.is_dir(cache).await.unwrap_or(false) {
        let leaf = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IrodsError::Protocol("local path has no file name".to_string()))?;
        Ok(remote.join(leaf))
    } else {
        Ok(remote.clone())
    }
}

async fn transfer_one_file(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    operation: OperationType,
    listener: &dyn TransferListener,
    ctl: &Arc<TransferControlBlock>,
    cache: &StatCache,
) -> Result<()> {
    if ctl.is_cancelled() {
        listener.on_status(TransferStatus {
            operation,
            state: crate::control_block::status::TransferState::Cancelled,
            path: local.to_path_buf(),
            bytes_transferred: 0,
            bytes_total: 0,
            files_transferred: 0,
            files_total: 0,
            error: None,
        });
        return Err(IrodsError::Cancelled);
    }

    match single::put(conn, local, remote, cache, ctl).await {
        Ok(()) => {
            ctl.add_files(1);
            listener.on_status(TransferStatus {
                operation,
                state: crate::control_block::status::TransferState::Success,
                path: local.to_path_buf(),
                bytes_transferred: ctl.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
                bytes_total: ctl.bytes_total.load(std::sync::atomic::Ordering::Relaxed),
                files_transferred: ctl.files_transferred.load(std::sync::atomic::Ordering::Relaxed),
                files_total: ctl.files_total.load(std::sync::atomic::Ordering::Relaxed),
                error: None,
            });
            Ok(())
        },
        Err(e) if e.is_recoverable() => {
            warn!(path = %local.display(), error = %e, "retrying after reconnect");
            listener.on_status(TransferStatus {
                operation,
                state: crate::control_block::status::TransferState::Restarting,
                path: local.to_path_buf(),
                bytes_transferred: ctl.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
                bytes_total: ctl.bytes_total.load(std::sync::atomic::Ordering::Relaxed),
                files_transferred: ctl.files_transferred.load(std::sync::atomic::Ordering::Relaxed),
                files_total: ctl.files_total.load(std::sync::atomic::Ordering::Relaxed),
                error: Some(e.to_string()),
            });
            single::put(conn, local, remote, cache, ctl).await.map(|_| {
                ctl.add_files(1);
            })
        },
        Err(e) => {
            ctl.record_error();
            listener.on_status(TransferStatus::failure(operation, local.to_path_buf(), e.to_string()));
            if ctl.should_fail_fast() {
                Err(e)
            } else {
                Ok(())
            }
        },
    }
}

async fn transfer_one_get(
    conn: &Arc<ConnectionHandle>,
    remote: &IrodsPath,
    local: &Path,
    listener: &dyn TransferListener,
    ctl: &Arc<TransferControlBlock>,
    cache: &StatCache,
) -> Result<()> {
    match single::get(conn, remote, local, cache, ctl).await {
        Ok(()) => {
            ctl.add_files(1);
            listener.on_status(TransferStatus {
                operation: OperationType::Get,
                state: crate::control_block::status::TransferState::Success,
                path: local.to_path_buf(),
                bytes_transferred: ctl.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
                bytes_total: ctl.bytes_total.load(std::sync::atomic::Ordering::Relaxed),
                files_transferred: ctl.files_transferred.load(std::sync::atomic::Ordering::Relaxed),
                files_total: ctl.files_total.load(std::sync::atomic::Ordering::Relaxed),
                error: None,
            });
            Ok(())
        },
        Err(e) if e.is_recoverable() => {
            warn!(path = %local.display(), error = %e, "retrying after reconnect");
            listener.on_status(TransferStatus {
                operation: OperationType::Get,
                state: crate::control_block::status::TransferState::Restarting,
                path: local.to_path_buf(),
                bytes_transferred: ctl.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
                bytes_total: ctl.bytes_total.load(std::sync::atomic::Ordering::Relaxed),
                files_transferred: ctl.files_transferred.load(std::sync::atomic::Ordering::Relaxed),
                files_total: ctl.files_total.load(std::sync::atomic::Ordering::Relaxed),
                error: Some(e.to_string()),
            });
            single::get(conn, remote, local, cache, ctl).await.map(|_| {
                ctl.add_files(1);
            })
        },
        Err(e) => {
            ctl.record_error();
            listener.on_status(TransferStatus::failure(OperationType::Get, local.to_path_buf(), e.to_string()));
            if ctl.should_fail_fast() {
                Err(e)
            } else {
                Ok(())
            }
        },
    }
}

/// Pre-walks `local` to count files/bytes, creates the remote parent
/// directory named after the source leaf, then recursively descends.
async fn put_tree(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    listener: &dyn TransferListener,
    ctl: &Arc<TransferControlBlock>,
    cache: &StatCache,
) -> Result<()> {
    let (files_total, bytes_total) = walk_count(local).await?;
    ctl.files_total.store(files_total, std::sync::atomic::Ordering::Relaxed);
    ctl.bytes_total.store(bytes_total, std::sync::atomic::Ordering::Relaxed);

    listener.on_status(TransferStatus {
        operation: OperationType::Put,
        state: crate::control_block::status::TransferState::OverallInitiation,
        path: local.to_path_buf(),
        bytes_transferred: 0,
        bytes_total,
        files_transferred: 0,
        files_total,
        error: None,
    });

    let leaf = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IrodsError::Protocol("local path has no file name".to_string()))?;
    let target_root = remote.join(leaf);
    let target_collection = Collection::new(conn.clone(), target_root.clone());
    target_collection.mkdir(true, cache).await?;

    put_tree_recursive(conn, local, &target_root, listener, ctl, cache).await?;

    listener.on_status(TransferStatus {
        operation: OperationType::Put,
        state: crate::control_block::status::TransferState::OverallCompletion,
        path: local.to_path_buf(),
        bytes_transferred: ctl.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
        bytes_total,
        files_transferred: ctl.files_transferred.load(std::sync::atomic::Ordering::Relaxed),
        files_total,
        error: None,
    });
    Ok(())
}

fn put_tree_recursive<'a>(
    conn: &'a Arc<ConnectionHandle>,
    local: &'a Path,
    remote: &'a IrodsPath,
    listener: &'a dyn TransferListener,
    ctl: &'a Arc<TransferControlBlock>,
    cache: &'a StatCache,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(local)
            .await
            .map_err(|e| IrodsError::Internal(e.into()))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| IrodsError::Internal(e.into()))? {
            let path = entry.path();
            let leaf = entry.file_name();
            let leaf = leaf.to_str().ok_or_else(|| IrodsError::Protocol("non-utf8 file name".to_string()))?;
            let child_remote = remote.join(leaf);

            let file_type = entry.file_type().await.map_err(|e| IrodsError::Internal(e.into()))?;
            if file_type.is_dir() {
                let coll = Collection::new(conn.clone(), child_remote.clone());
                coll.mkdir(true, cache).await?;
                put_tree_recursive(conn, &path, &child_remote, listener, ctl, cache).await?;
            } else {
                transfer_one_file(conn, &path, &child_remote, OperationType::Put, listener, ctl, cache).await?;
                if ctl.is_cancelled() && ctl.should_fail_fast() {
                    return Err(IrodsError::Cancelled);
                }
            }
        }
        Ok(())
    })
}

async fn get_tree(
    conn: &Arc<ConnectionHandle>,
    remote: &IrodsPath,
    local: &Path,
    listener: &dyn TransferListener,
    ctl: &Arc<TransferControlBlock>,
    cache: &StatCache,
) -> Result<()> {
    let target_root = local.join(remote.leaf());
    tokio::fs::create_dir_all(&target_root)
        .await
        .map_err(|e| IrodsError::Internal(e.into()))?;

    let coll = Collection::new(conn.clone(), remote.clone());
    let entries = coll.list_children(cache).await?;

    ctl.files_total.store(entries.len() as u64, std::sync::atomic::Ordering::Relaxed);
    for entry in entries {
        let child_remote = IrodsPath::new(&entry.path, "/");
        let child_local = target_root.join(child_remote.leaf());
        if entry.is_collection {
            Box::pin(get_tree(conn, &child_remote, &target_root, listener, ctl, cache)).await?;
        } else {
            transfer_one_get(conn, &child_remote, &child_local, listener, ctl, cache).await?;
        }
    }
    Ok(())
}

async fn walk_count(local: &Path) -> Result<(u64, u64)> {
    let mut files = 0u64;
    let mut bytes = 0u64;
    let mut stack = vec![local.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| IrodsError::Internal(e.into()))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| IrodsError::Internal(e.into()))? {
            let file_type = entry.file_type().await.map_err(|e| IrodsError::Internal(e.into()))?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else {
                files += 1;
                bytes += entry.metadata().await.map_err(|e| IrodsError::Internal(e.into()))?.len();
            }
        }
    }
    Ok((files, bytes))
}

/// Deletes a remote collection outright; used by callers that want
/// `move`-into-a-fresh-name semantics without leaving the old tree behind.
pub async fn rm_collection(conn: &Arc<ConnectionHandle>, remote: &IrodsPath, force: bool) -> Result<()> {
    let req = CollInp { coll_name: remote.absolute(), recursive: true, force };
    conn.call::<_, EmptyReply>(MsgType::ApiReq, 631, &req).await?;
    let commit = EndTransaction { commit: true };
    conn.call::<_, EmptyReply>(MsgType::ApiReq, API_END_TRANSACTION, &commit).await?;
    Ok(())
}
