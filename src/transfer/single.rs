// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Single-file transfer policy (spec.md §4.6): pick in-band bulk I/O or
//! hand off to the parallel engine, by size against the configured
//! single-buffer threshold.

use std::{path::Path, sync::Arc};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::{
    client::connection::ConnectionHandle,
    control_block::transfer::TransferControlBlock,
    error::{IrodsError, Result},
    fs::{
        object::{DataObject, O_CREAT, O_RDONLY, O_TRUNC, O_WRONLY},
        path::IrodsPath,
        stat::StatCache,
    },
    protocol::{
        header::MsgType,
        messages::{DataObjInp, EmptyReply, PortalOprOut},
    },
    transfer::parallel::{self, Direction},
};

const API_PUT_PARALLEL_HINT: i32 = 640;
const API_GET_PARALLEL_HINT: i32 = 641;
const API_OPR_COMPLETE: i32 = 699;

const IN_BAND_CHUNK: usize = 4 * 1024 * 1024;

/// Uploads `local` to `remote`, choosing in-band or parallel I/O by size.
pub async fn put(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    cache: &StatCache,
    ctl: &Arc<TransferControlBlock>,
) -> Result<()> {
    let metadata = tokio::fs::metadata(local)
        .await
        .map_err(|e| IrodsError::Internal(e.into()))?;
    let total_len = metadata.len();
    ctl.bytes_total.store(total_len, std::sync::atomic::Ordering::Relaxed);

    if total_len <= ctl.single_buffer_threshold {
        put_in_band(conn, local, remote, cache, ctl).await
    } else {
        put_parallel(conn, local, remote, total_len, ctl).await
    }
}

/// Downloads `remote` to `local`, choosing in-band or parallel I/O by size.
pub async fn get(
    conn: &Arc<ConnectionHandle>,
    remote: &IrodsPath,
    local: &Path,
    cache: &StatCache,
    ctl: &Arc<TransferControlBlock>,
) -> Result<()> {
    let mut object = DataObject::new(conn.clone(), remote.clone());
    let total_len = object.length(cache).await? as u64;
    ctl.bytes_total.store(total_len, std::sync::atomic::Ordering::Relaxed);

    if total_len <= ctl.single_buffer_threshold {
        get_in_band(&mut object, local, total_len, cache, ctl).await
    } else {
        get_parallel(conn, remote, local, total_len, ctl).await
    }
}

async fn put_in_band(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    cache: &StatCache,
    ctl: &Arc<TransferControlBlock>,
) -> Result<()> {
    let mut file = tokio::fs::File::open(local)
        .await
        .map_err(|e| IrodsError::Internal(e.into()))?;
    let mut object = DataObject::new(conn.clone(), remote.clone());
    object.open(O_WRONLY | O_CREAT | O_TRUNC, cache).await?;

    let mut buf = vec![0u8; IN_BAND_CHUNK];
    loop {
        let n = file.read(&mut buf).await.map_err(|e| IrodsError::Internal(e.into()))?;
        if n == 0 {
            break;
        }
        object.write(Bytes::copy_from_slice(&buf[..n])).await?;
        ctl.add_bytes(n as u64);
    }
    object.close().await?;
    Ok(())
}

async fn get_in_band(
    object: &mut DataObject,
    local: &Path,
    total_len: u64,
    cache: &StatCache,
    ctl: &Arc<TransferControlBlock>,
) -> Result<()> {
    object.open(O_RDONLY, cache).await?;
    let mut file = tokio::fs::File::create(local)
        .await
        .map_err(|e| IrodsError::Internal(e.into()))?;

    let mut remaining = total_len;
    while remaining > 0 {
        let want = remaining.min(IN_BAND_CHUNK as u64) as i32;
        let chunk = object.read(want).await?;
        if chunk.is_empty() {
            break;
        }
        file.write_all(&chunk).await.map_err(|e| IrodsError::Internal(e.into()))?;
        remaining -= chunk.len() as u64;
        ctl.add_bytes(chunk.len() as u64);
    }
    file.flush().await.map_err(|e| IrodsError::Internal(e.into()))?;
    object.close().await?;
    Ok(())
}

async fn put_parallel(
    conn: &Arc<ConnectionHandle>,
    local: &Path,
    remote: &IrodsPath,
    total_len: u64,
    ctl: &Arc<TransferControlBlock>,
) -> Result<()> {
    let req = DataObjInp {
        obj_path: remote.absolute(),
        create_mode: 0o644,
        open_flags: 0,
        data_size: total_len as i64,
        resource: None,
        force: true,
    };
    let (portal, _status) =
        conn.call::<_, PortalOprOut>(MsgType::ApiReq, API_PUT_PARALLEL_HINT, &req).await?;

    let file = std::fs::File::open(local).map_err(|e| IrodsError::Internal(e.into()))?;
    let cipher = conn.cipher().cloned();
    parallel::run(Direction::Put, &portal.ports, portal.cookie, file, total_len, cipher, ctl.clone())
        .await?;

    finish_operation(conn, portal.cookie).await
}

async fn get_parallel(
    conn: &Arc<ConnectionHandle>,
    remote: &IrodsPath,
    local: &Path,
    total_len: u64,
    ctl: &Arc<TransferControlBlock>,
) -> Result<()> {
    let req = DataObjInp {
        obj_path: remote.absolute(),
        create_mode: 0,
        open_flags: O_RDONLY,
        data_size: total_len as i64,
        resource: None,
        force: false,
    };
    let (portal, _status) =
        conn.call::<_, PortalOprOut>(MsgType::ApiReq, API_GET_PARALLEL_HINT, &req).await?;

    let file = tokio::fs::File::create(local)
        .await
        .map_err(|e| IrodsError::Internal(e.into()))?;
    file.set_len(total_len).await.map_err(|e| IrodsError::Internal(e.into()))?;
    let file = file.into_std().await;

    let cipher = conn.cipher().cloned();
    parallel::run(Direction::Get, &portal.ports, portal.cookie, file, total_len, cipher, ctl.clone())
        .await?;

    finish_operation(conn, portal.cookie).await
}

/// Issues the `OprComplete` handshake that releases the server-side
/// operation. Never skipped: omitting it leaves the server stuck waiting
/// for a parallel transfer that already finished (spec.md §4.6/§4.7).
async fn finish_operation(conn: &Arc<ConnectionHandle>, cookie: i32) -> Result<()> {
    let req = OprCompleteInp { cookie };
    conn.call::<_, EmptyReply>(MsgType::ApiReq, API_OPR_COMPLETE, &req).await?;
    Ok(())
}

struct OprCompleteInp {
    cookie: i32,
}

impl crate::protocol::pack::Encode for OprCompleteInp {
    fn pi_name(&self) -> &'static str {
        "OprComplete_PI"
    }

    fn to_pack(&self) -> crate::protocol::pack::PackValue {
        crate::protocol::pack::PackValue::Struct(vec![(
            "status".to_string(),
            crate::protocol::pack::PackValue::Int(self.cookie as i64),
        )])
    }
}
