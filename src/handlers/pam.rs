// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PAM password authentication. Unlike native auth, the cleartext
//! password travels to the server (over the already-negotiated transport,
//! which PAM implicitly requires to be TLS) and the server does the
//! credential check, returning a short-lived generated password used for
//! the native challenge-response that follows.

use crate::{
    client::connection::ConnectionHandle,
    error::{IrodsError, Result},
    handlers::native,
    protocol::{
        header::MsgType,
        messages::{PamAuthRequest, PamAuthResponse},
    },
};

pub async fn authenticate(conn: &ConnectionHandle) -> Result<()> {
    if conn.negotiated_transport != crate::security::negotiation::NegotiatedTransport::Ssl {
        return Err(IrodsError::Negotiation(
            "PAM authentication requires a negotiated SSL transport".to_string(),
        ));
    }

    let req = PamAuthRequest {
        username: conn.account.effective_user().to_string(),
        password: conn.account.password_or_token.clone(),
    };
    let (resp, _): (PamAuthResponse, i32) = conn.call(MsgType::ApiReq, 705, &req).await?;
    if resp.status != 0 {
        return Err(IrodsError::AuthFailed(format!(
            "server rejected PAM credentials (status {})",
            resp.status
        )));
    }

    // Store the server-issued short-lived password transparently; the
    // regular native challenge-response that follows uses it in place of
    // the account's long-lived credential to finish establishing the
    // session key.
    conn.set_native_password_override(resp.generated_password);
    native::authenticate(conn).await
}
