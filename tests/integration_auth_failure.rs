// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! spec.md §8 scenario 6: a rejected native-auth response surfaces
//! `AuthFailed` and the connection is never handed back to the caller
//! (no automatic retry with the same credentials).

mod common;

use common::{AuthStatusReply, ChallengeReply, Reply, VersionReply, spawn_mock_server, test_config};
use irods_client::{client::registry::SessionRegistry, error::IrodsError, protocol::messages::CsNegotiation};

#[tokio::test]
async fn wrong_password_surfaces_auth_failed_without_retry() {
    let replies = vec![
        Reply::ok(CsNegotiation { stance: "CS_NEG_DONT_CARE".to_string() }),
        Reply::ok(VersionReply { cookie: 1 }),
        Reply::ok(ChallengeReply { challenge: "fedcba9876543210".to_string() }),
        Reply::ok(AuthStatusReply { status: 7600 }),
    ];
    let (host, port) = spawn_mock_server(replies).await;
    let mut cfg = test_config(host, port);
    cfg.account.password_or_token = "wrong-password".to_string();

    let registry = SessionRegistry::new();
    let err = registry.acquire(&cfg).await.expect_err("auth should fail");
    assert!(matches!(err, IrodsError::AuthFailed(_)), "expected AuthFailed, got {err:?}");

    // A failed `connect()` never reaches the line that inserts into the
    // registry's session map, so nothing is left behind for a later
    // `acquire` to (incorrectly) reuse.
}
