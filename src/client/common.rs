// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::{IrodsError, Result};

/// Races a future against both a cancellation token and a deadline, the
/// same shape the connection engine uses for every socket read/write.
pub async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(IrodsError::Cancelled),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(IrodsError::NetworkFailure(format!("{label}: {e}"))),
                Err(_) => Err(IrodsError::NetworkTimeout(label.to_string())),
            }
        }
    }
}

/// Like [`io_with_timeout`], but for futures that already resolve to our
/// own [`Result`] (the codec layer maps its own I/O errors itself).
pub async fn with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(IrodsError::Cancelled),
        res = timeout(io_timeout, fut) => match res {
            Ok(inner) => inner,
            Err(_) => Err(IrodsError::NetworkTimeout(label.to_string())),
        }
    }
}
