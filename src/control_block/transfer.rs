// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The transfer control block (spec.md §4.6/§4.7): shared cancellation and
//! progress counters threaded through a recursive put/get/replicate/copy/
//! move, mirroring the way the teacher threads a `CancellationToken`
//! through a connection's read loop.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use tokio_util::sync::CancellationToken;

use crate::{cfg::enums::ErrorPolicy, control_block::status::TransferStatus};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransferOptions: u8 {
        const FORCE_OVERWRITE   = 0b0001;
        const COMPUTE_CHECKSUM  = 0b0010;
        const VERIFY_CHECKSUM   = 0b0100;
        const ALLOW_REDIRECT    = 0b1000;
    }
}

/// Callback surface for transfer progress; a default no-op listener is used
/// when the caller passes `None`.
pub trait TransferListener: Send + Sync {
    fn on_status(&self, status: TransferStatus);
}

struct NullListener;
impl TransferListener for NullListener {
    fn on_status(&self, _status: TransferStatus) {}
}

/// Shared, cloneable handle to one transfer's counters and cancellation
/// flag. Created with defaults derived from [`crate::cfg::config::
/// TransferDefaults`] when the caller supplies none.
pub struct TransferControlBlock {
    pub bytes_transferred: AtomicU64,
    pub bytes_total: AtomicU64,
    pub files_transferred: AtomicU64,
    pub files_total: AtomicU64,
    pub error_count: AtomicU64,
    pub options: TransferOptions,
    pub error_policy: ErrorPolicy,
    pub parallel_thread_count: u16,
    pub single_buffer_threshold: u64,
    cancel: CancellationToken,
}

impl TransferControlBlock {
    pub fn new(
        options: TransferOptions,
        error_policy: ErrorPolicy,
        parallel_thread_count: u16,
        single_buffer_threshold: u64,
    ) -> Self {
        TransferControlBlock {
            bytes_transferred: AtomicU64::new(0),
            bytes_total: AtomicU64::new(0),
            files_transferred: AtomicU64::new(0),
            files_total: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            options,
            error_policy,
            parallel_thread_count,
            single_buffer_threshold,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_defaults(defaults: &crate::cfg::config::TransferDefaults) -> Self {
        TransferControlBlock::new(
            TransferOptions::empty(),
            defaults.error_policy,
            defaults.parallel_thread_count,
            defaults.single_buffer_threshold,
        )
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn add_bytes(&self, n: u64) -> u64 {
        self.bytes_transferred.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn add_files(&self, n: u64) -> u64 {
        self.files_transferred.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn should_fail_fast(&self) -> bool {
        matches!(self.error_policy, ErrorPolicy::FailFast)
    }
}

impl Default for TransferControlBlock {
    fn default() -> Self {
        TransferControlBlock::new(TransferOptions::empty(), ErrorPolicy::default(), 4, 32 * 1024 * 1024)
    }
}

pub fn null_listener() -> &'static dyn TransferListener {
    &NullListener
}
