// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The N-way parallel transfer engine (spec.md §4.7, [MODULE] C8): one
//! socket per server-handed endpoint, each independently streaming
//! offset-addressed chunks against the open local file.

use std::{os::unix::fs::FileExt, sync::Arc};

use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream, task::JoinSet};
use tracing::{debug, warn};

use crate::{
    control_block::transfer::TransferControlBlock,
    error::{IrodsError, Result},
    protocol::messages::PortalPort,
    security::cipher::ParallelCipher,
};

const FLAG_DATA: u8 = 0;
const FLAG_DONE: u8 = 1;

/// Which direction bytes flow relative to the client on a parallel socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Put,
}

/// Runs the parallel engine against `ports`, splitting `total_len` bytes of
/// `local_file` into contiguous per-worker spans. Any worker failure
/// cancels its peers through `ctl` and the first error is surfaced to the
/// caller once every worker has drained.
pub async fn run(
    direction: Direction,
    ports: &[PortalPort],
    cookie: i32,
    local_file: std::fs::File,
    total_len: u64,
    cipher: Option<ParallelCipher>,
    ctl: Arc<TransferControlBlock>,
) -> Result<()> {
    if ports.is_empty() {
        return Err(IrodsError::Protocol("server returned no parallel endpoints".into()));
    }

    let spans = partition(total_len, ports.len() as u64);
    let mut workers = JoinSet::new();

    for (worker_idx, (port, (offset, len))) in ports.iter().zip(spans.into_iter()).enumerate() {
        let port = port.clone();
        let file = local_file.try_clone().map_err(|e| IrodsError::Internal(e.into()))?;
        let cipher = cipher.clone();
        let ctl = ctl.clone();

        workers.spawn(async move {
            let result = run_one_worker(direction, &port, cookie, file, offset, len, cipher, &ctl).await;
            if let Err(ref e) = result {
                warn!(worker = worker_idx, error = %e, "parallel worker failed");
                ctl.cancel();
            }
            result
        });
    }

    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {},
            Ok(Err(e)) => first_error.get_or_insert(e),
            Err(join_err) => {
                first_error.get_or_insert(IrodsError::Internal(join_err.into()));
            },
        };
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn partition(total_len: u64, n: u64) -> Vec<(u64, u64)> {
    let base = total_len / n;
    let remainder = total_len % n;
    let mut spans = Vec::with_capacity(n as usize);
    let mut offset = 0u64;
    for i in 0..n {
        let len = base + if i < remainder { 1 } else { 0 };
        spans.push((offset, len));
        offset += len;
    }
    spans
}

#[allow(clippy::too_many_arguments)]
async fn run_one_worker(
    direction: Direction,
    endpoint: &PortalPort,
    cookie: i32,
    file: std::fs::File,
    offset: u64,
    len: u64,
    cipher: Option<ParallelCipher>,
    ctl: &TransferControlBlock,
) -> Result<()> {
    let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    stream.set_nodelay(true).ok();

    // Hello: cookie (i32 BE) + direction byte, plain (cookie is not secret
    // plaintext the AES layer needs to hide).
    let mut hello = Vec::with_capacity(5);
    hello.extend_from_slice(&cookie.to_be_bytes());
    hello.push(match direction { Direction::Get => 0, Direction::Put => 1 });
    stream
        .write_all(&hello)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;

    match direction {
        Direction::Get => get_span(&mut stream, &file, offset, len, cipher, ctl).await,
        Direction::Put => put_span(&mut stream, &file, offset, len, cipher, ctl).await,
    }
}

async fn get_span(
    stream: &mut TcpStream,
    file: &std::fs::File,
    span_offset: u64,
    span_len: u64,
    cipher: Option<ParallelCipher>,
    ctl: &TransferControlBlock,
) -> Result<()> {
    let mut received = 0u64;
    loop {
        if ctl.is_cancelled() {
            return Err(IrodsError::Cancelled);
        }
        let flag = read_u8(stream).await?;
        if flag == FLAG_DONE {
            break;
        }
        let chunk_offset = read_u64(stream).await?;
        let payload_len = read_u32(stream).await? as usize;
        let mut payload = vec![0u8; payload_len];
        stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;

        let bytes = match &cipher {
            Some(c) => c.decrypt_frame(&payload)?,
            None => payload,
        };

        file.write_at(&bytes, chunk_offset)
            .map_err(|e| IrodsError::Internal(e.into()))?;
        received += bytes.len() as u64;
        ctl.add_bytes(bytes.len() as u64);

        if received >= span_len {
            break;
        }
    }
    debug!(span_offset, received, "parallel get worker drained");
    Ok(())
}

async fn put_span(
    stream: &mut TcpStream,
    file: &std::fs::File,
    span_offset: u64,
    span_len: u64,
    cipher: Option<ParallelCipher>,
    ctl: &TransferControlBlock,
) -> Result<()> {
    const CHUNK: u64 = 1024 * 1024;
    let mut sent = 0u64;
    while sent < span_len {
        if ctl.is_cancelled() {
            return Err(IrodsError::Cancelled);
        }
        let this_len = CHUNK.min(span_len - sent);
        let mut buf = vec![0u8; this_len as usize];
        file.read_at(&mut buf, span_offset + sent)
            .map_err(|e| IrodsError::Internal(e.into()))?;

        let on_wire = match &cipher {
            Some(c) => c.encrypt_frame(&buf),
            None => buf,
        };

        write_u8(stream, FLAG_DATA).await?;
        write_u64(stream, span_offset + sent).await?;
        write_u32(stream, on_wire.len() as u32).await?;
        stream
            .write_all(&on_wire)
            .await
            .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;

        sent += this_len;
        ctl.add_bytes(this_len);
    }
    write_u8(stream, FLAG_DONE).await?;
    stream.flush().await.map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    debug!(span_offset, sent, "parallel put worker drained");
    Ok(())
}

async fn read_u8(stream: &mut TcpStream) -> Result<u8> {
    let mut b = [0u8; 1];
    stream
        .read_exact(&mut b)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    Ok(b[0])
}

async fn read_u32(stream: &mut TcpStream) -> Result<u32> {
    let mut b = [0u8; 4];
    stream
        .read_exact(&mut b)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    Ok(u32::from_be_bytes(b))
}

async fn read_u64(stream: &mut TcpStream) -> Result<u64> {
    let mut b = [0u8; 8];
    stream
        .read_exact(&mut b)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    Ok(u64::from_be_bytes(b))
}

async fn write_u8(stream: &mut TcpStream, v: u8) -> Result<()> {
    stream
        .write_all(&[v])
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))
}

async fn write_u32(stream: &mut TcpStream, v: u32) -> Result<()> {
    stream
        .write_all(&v.to_be_bytes())
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))
}

async fn write_u64(stream: &mut TcpStream, v: u64) -> Result<()> {
    stream
        .write_all(&v.to_be_bytes())
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_evenly_with_remainder_on_early_workers() {
        let spans = partition(10, 3);
        assert_eq!(spans, vec![(0, 4), (4, 3), (7, 3)]);
        let total: u64 = spans.iter().map(|(_, l)| l).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn single_worker_gets_the_whole_file() {
        let spans = partition(42, 1);
        assert_eq!(spans, vec![(0, 42)]);
    }
}
