// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Pure-logic coverage for the ambient configuration and error-taxonomy
//! layers, outside of any network interaction.

use std::time::Duration;

use irods_client::{
    cfg::{
        config::{Account, Config, NegotiationConfig, RuntimeConfig, TransferDefaults},
        enums::{AuthScheme, EncryptionAlgorithm, ErrorPolicy, SslPolicy},
    },
    control_block::transfer::{TransferControlBlock, TransferOptions},
    error::IrodsError,
};

fn valid_config() -> Config {
    Config {
        account: Account {
            host: "icat.example.org".to_string(),
            port: 1247,
            zone: "tempZone".to_string(),
            user: "rods".to_string(),
            password_or_token: "rods".to_string(),
            scheme: AuthScheme::Native,
            proxy_user: None,
            proxy_zone: None,
        },
        negotiation: NegotiationConfig {
            ssl_policy: SslPolicy::DontCare,
            encryption_algorithm: EncryptionAlgorithm::Aes256Cbc,
            encryption_key_size: 32,
            encryption_salt_size: 8,
            encryption_num_hash_rounds: 16,
        },
        runtime: RuntimeConfig {
            connect_timeout: Duration::from_secs(10),
            primary_socket_timeout: Duration::from_secs(120),
            parallel_socket_timeout: Duration::from_secs(600),
            read_buffer_size: 65536,
            write_buffer_size: 65536,
            max_sessions: 4,
        },
        transfer: TransferDefaults::default(),
    }
}

#[test]
fn validate_and_normalize_accepts_a_well_formed_config() {
    let mut cfg = valid_config();
    assert!(cfg.validate_and_normalize().is_ok());
}

#[test]
fn validate_and_normalize_rejects_empty_host() {
    let mut cfg = valid_config();
    cfg.account.host.clear();
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn validate_and_normalize_rejects_zero_connect_timeout() {
    let mut cfg = valid_config();
    cfg.runtime.connect_timeout = Duration::ZERO;
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn validate_and_normalize_clears_password_for_anonymous_scheme() {
    let mut cfg = valid_config();
    cfg.account.scheme = AuthScheme::Anonymous;
    cfg.account.password_or_token = "leftover-secret".to_string();
    cfg.validate_and_normalize().expect("anonymous config is otherwise valid");
    assert!(cfg.account.password_or_token.is_empty());
}

#[test]
fn account_equality_ignores_credentials_and_negotiation_prefs() {
    let mut a = valid_config().account;
    let mut b = a.clone();
    a.password_or_token = "one".to_string();
    b.password_or_token = "two".to_string();
    assert_eq!(a, b);

    b.port = a.port + 1;
    assert_ne!(a, b);
}

#[test]
fn effective_user_falls_back_to_user_without_a_proxy() {
    let account = valid_config().account;
    assert_eq!(account.effective_user(), "rods");
}

#[test]
fn effective_user_prefers_the_proxy_identity_when_set() {
    let mut account = valid_config().account;
    account.proxy_user = Some("proxyrods".to_string());
    assert_eq!(account.effective_user(), "proxyrods");
}

#[test]
fn from_server_status_classifies_known_ranges() {
    assert!(matches!(IrodsError::from_server_status(-156_500, "x"), IrodsError::NotFound(_)));
    assert!(matches!(IrodsError::from_server_status(-817_500, "x"), IrodsError::PermissionDenied(_)));
    assert!(matches!(IrodsError::from_server_status(-925_500, "x"), IrodsError::AuthFailed(_)));
    assert!(matches!(
        IrodsError::from_server_status(-809_000, "x"),
        IrodsError::AlreadyExists(_)
    ));
    assert!(matches!(
        IrodsError::from_server_status(-1, "unclassified"),
        IrodsError::ServerStatus { code: -1, .. }
    ));
}

#[test]
fn only_network_errors_are_recoverable() {
    assert!(IrodsError::NetworkTimeout("t".to_string()).is_recoverable());
    assert!(IrodsError::NetworkFailure("f".to_string()).is_recoverable());
    assert!(!IrodsError::NotFound("n".to_string()).is_recoverable());
    assert!(!IrodsError::Cancelled.is_recoverable());
}

#[test]
fn transfer_control_block_tracks_counters_and_cancellation() {
    let ctl = TransferControlBlock::new(TransferOptions::FORCE_OVERWRITE, ErrorPolicy::FailFast, 4, 1024);
    assert!(ctl.options.contains(TransferOptions::FORCE_OVERWRITE));
    assert!(ctl.should_fail_fast());
    assert!(!ctl.is_cancelled());

    assert_eq!(ctl.add_bytes(10), 10);
    assert_eq!(ctl.add_bytes(5), 15);
    assert_eq!(ctl.add_files(1), 1);
    assert_eq!(ctl.record_error(), 1);

    ctl.cancel();
    assert!(ctl.is_cancelled());
}

#[test]
fn transfer_control_block_from_defaults_carries_config_values() {
    let defaults = TransferDefaults { single_buffer_threshold: 99, parallel_thread_count: 6, error_policy: ErrorPolicy::ContinueOnError };
    let ctl = TransferControlBlock::from_defaults(&defaults);
    assert_eq!(ctl.single_buffer_threshold, 99);
    assert_eq!(ctl.parallel_thread_count, 6);
    assert!(!ctl.should_fail_fast());
}
