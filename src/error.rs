// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The error taxonomy shared by every layer of the client.
//!
//! Each connection-engine failure is fatal for the handle it occurred on
//! (see [`crate::client::connection::ConnectionHandle`]); the transfer
//! orchestrator instead captures per-file errors in the control block and
//! reports them through a [`crate::control_block::transfer::TransferListener`].

use thiserror::Error;

/// Negative status-code namespace reserved by the server for
/// "already exists" (and its family of related collisions).
pub const ALREADY_EXISTS_CODE_BASE: i32 = -809_000;

#[derive(Debug, Error)]
pub enum IrodsError {
    /// Frame corrupt, truncated, or a schema violation (§7 WireFormat).
    #[error("wire format error: {0}")]
    WireFormat(String),

    /// A socket read/write exceeded its configured deadline.
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    /// The socket closed unexpectedly mid-exchange.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Client and server SSL/cipher stances are incompatible.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// Invalid credentials or a bad challenge response.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Path or data object absent on the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// Create-collision; carries the server status code when known.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// ACL or policy reject.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Caller-side logical collision (e.g. copy-to-self).
    #[error("duplicate data: {0}")]
    DuplicateData(String),

    /// Operation not representable on iRODS paths (chmod, free-space, ...).
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Cooperative cancellation observed.
    #[error("cancelled")]
    Cancelled,

    /// Well-formed but semantically invalid server response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Catch-all for server status codes with no dedicated variant above.
    #[error("server returned status {code}: {message}")]
    ServerStatus { code: i32, message: String },

    /// A single "internal/unexpected" variant for true bugs deep in the
    /// file/collection surface (spec.md §9, "Unchecked-exception style").
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IrodsError {
    /// Classifies a server status code into the taxonomy above.
    ///
    /// Unrecognized negative codes fall back to [`IrodsError::ServerStatus`]
    /// so callers always see *some* typed error rather than a raw integer.
    pub fn from_server_status(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == 0 {
            return IrodsError::Protocol(format!(
                "from_server_status called with a success code: {message}"
            ));
        }
        if (ALREADY_EXISTS_CODE_BASE - 999..=ALREADY_EXISTS_CODE_BASE).contains(&code) {
            return IrodsError::AlreadyExists(message);
        }
        match code {
            -157_000..=-156_000 => IrodsError::NotFound(message),
            -818_000..=-817_000 => IrodsError::PermissionDenied(message),
            -926_000..=-925_000 => IrodsError::AuthFailed(message),
            _ => IrodsError::ServerStatus { code, message },
        }
    }

    /// True for the "recoverable" classes the orchestrator retries once
    /// after reconnect (spec.md §4.6 Error and cancellation policy).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IrodsError::NetworkTimeout(_) | IrodsError::NetworkFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IrodsError>;
