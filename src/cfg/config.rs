// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, hash::Hash, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::{AuthScheme, EncryptionAlgorithm, ErrorPolicy, SslPolicy};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Identity and credentials used to authenticate a session.
    pub account: Account,
    /// Wire-level negotiation defaults (SSL stance, encryption parameters).
    pub negotiation: NegotiationConfig,
    /// Socket timeouts, buffer sizes and other implementation parameters
    /// that never travel over the wire.
    pub runtime: RuntimeConfig,
    /// Default transfer policy applied when a caller does not override it.
    #[serde(default)]
    pub transfer: TransferDefaults,
}

/// Identity of an iRODS client session.
///
/// Two accounts are equal (and collide in a [`crate::client::registry::
/// SessionRegistry`]) when `(host, port, zone, user, proxy_user)` match;
/// the password/token and negotiation preferences are not part of
/// identity, since a reconnect may re-authenticate with new credentials
/// for the same logical session.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Account {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "PasswordOrToken")]
    pub password_or_token: String,
    #[serde(rename = "AuthScheme")]
    pub scheme: AuthScheme,
    #[serde(default, rename = "ProxyUser")]
    pub proxy_user: Option<String>,
    #[serde(default, rename = "ProxyZone")]
    pub proxy_zone: Option<String>,
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.zone == other.zone
            && self.user == other.user
            && self.proxy_user == other.proxy_user
    }
}
impl Eq for Account {}

impl Hash for Account {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
        self.zone.hash(state);
        self.user.hash(state);
        self.proxy_user.hash(state);
    }
}

impl Account {
    /// The user asserted for ACL/ownership checks once a proxy is in play;
    /// falls back to `user` when no proxy identity was configured.
    pub fn effective_user(&self) -> &str {
        self.proxy_user.as_deref().unwrap_or(&self.user)
    }

    pub fn effective_zone(&self) -> &str {
        self.proxy_zone.as_deref().unwrap_or(&self.zone)
    }
}

/// Client-side negotiation preferences (spec.md §4.3/§4.4).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NegotiationConfig {
    #[serde(rename = "SslPolicy")]
    pub ssl_policy: SslPolicy,
    #[serde(rename = "EncryptionAlgorithm")]
    pub encryption_algorithm: EncryptionAlgorithm,
    #[serde(rename = "EncryptionKeySize")]
    pub encryption_key_size: u32,
    #[serde(rename = "EncryptionSaltSize")]
    pub encryption_salt_size: u32,
    #[serde(rename = "EncryptionNumHashRounds")]
    pub encryption_num_hash_rounds: u32,
}

/// Implementation/runtime parameters that live outside protocol
/// negotiation: timeouts, buffer sizes, parallel-transfer thresholds.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "ConnectTimeout", with = "serde_secs")]
    pub connect_timeout: Duration,
    #[serde(rename = "PrimarySocketTimeout", with = "serde_secs")]
    pub primary_socket_timeout: Duration,
    #[serde(rename = "ParallelSocketTimeout", with = "serde_secs")]
    pub parallel_socket_timeout: Duration,
    #[serde(rename = "ReadBufferSize")]
    pub read_buffer_size: usize,
    #[serde(rename = "WriteBufferSize")]
    pub write_buffer_size: usize,
    #[serde(rename = "MaxSessions")]
    pub max_sessions: u32,
}

/// Default parallel-transfer tuning, used unless the caller supplies its
/// own `TransferOptions` (spec.md §4.6).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TransferDefaults {
    #[serde(rename = "SingleBufferThreshold")]
    pub single_buffer_threshold: u64,
    #[serde(rename = "ParallelThreadCount")]
    pub parallel_thread_count: u16,
    #[serde(rename = "ErrorPolicy")]
    pub error_policy: ErrorPolicy,
}

impl Default for TransferDefaults {
    fn default() -> Self {
        TransferDefaults {
            single_buffer_threshold: 32 * 1024 * 1024,
            parallel_thread_count: 4,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields (spec.md §3).
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.account.host.is_empty(), "Host must not be empty");
        ensure!(self.account.port != 0, "Port must be non-zero");
        ensure!(!self.account.zone.is_empty(), "Zone must not be empty");
        ensure!(!self.account.user.is_empty(), "User must not be empty");

        if matches!(self.account.scheme, AuthScheme::Anonymous) {
            self.account.password_or_token.clear();
        }

        ensure!(
            self.runtime.connect_timeout > Duration::ZERO,
            "ConnectTimeout must be positive"
        );
        ensure!(
            self.runtime.primary_socket_timeout > Duration::ZERO,
            "PrimarySocketTimeout must be positive"
        );
        ensure!(
            self.runtime.parallel_socket_timeout > Duration::ZERO,
            "ParallelSocketTimeout must be positive"
        );
        ensure!(self.runtime.max_sessions >= 1, "MaxSessions must be >= 1");

        ensure!(
            self.transfer.parallel_thread_count >= 1,
            "ParallelThreadCount must be >= 1"
        );

        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
