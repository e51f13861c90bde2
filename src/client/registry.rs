// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Process-wide connection registry (spec.md §4, [MODULE] C1): one
//! `ConnectionHandle` per `(Account, ThreadId)`, so threads do not
//! accidentally interleave requests on a shared connection (the cadence
//! invariant requires exactly one outstanding request at a time).

use std::{
    sync::Arc,
    thread::ThreadId,
};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::{
    cfg::config::{Account, Config},
    client::connection::ConnectionHandle,
    error::Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    account: Account,
    thread: ThreadId,
}

pub struct SessionRegistry {
    sessions: DashMap<RegistryKey, Arc<ConnectionHandle>>,
    cancel: CancellationToken,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry { sessions: DashMap::new(), cancel: CancellationToken::new() }
    }

    /// Returns the connection bound to `(account, current thread)`,
    /// establishing one if none exists yet.
    pub async fn acquire(&self, cfg: &Config) -> Result<Arc<ConnectionHandle>> {
        let key = RegistryKey { account: cfg.account.clone(), thread: std::thread::current().id() };

        if let Some(existing) = self.sessions.get(&key) {
            return Ok(existing.clone());
        }

        let handle = ConnectionHandle::connect(
            cfg.account.clone(),
            cfg.negotiation.clone(),
            cfg.runtime.clone(),
            self.cancel.child_token(),
        )
        .await?;

        self.sessions.insert(key, handle.clone());
        Ok(handle)
    }

    /// Drops the registry's reference to the connection for `(account,
    /// current thread)` and politely disconnects it.
    pub async fn release(&self, account: &Account) {
        let key = RegistryKey { account: account.clone(), thread: std::thread::current().id() };
        if let Some((_, handle)) = self.sessions.remove(&key) {
            handle.disconnect().await;
        }
    }

    /// Tears down every tracked connection; used on process shutdown.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        let keys: Vec<RegistryKey> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, handle)) = self.sessions.remove(&key) {
                handle.disconnect().await;
            }
        }
    }
}
