//! Authentication-scheme dispatch (spec.md §4.3).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod anonymous;
pub mod gsi;
pub mod native;
pub mod pam;

use crate::{cfg::enums::AuthScheme, client::connection::ConnectionHandle, error::Result};

pub async fn authenticate(conn: &ConnectionHandle) -> Result<()> {
    match conn.account.scheme {
        AuthScheme::Native => native::authenticate(conn).await,
        AuthScheme::Pam => pam::authenticate(conn).await,
        AuthScheme::Gsi | AuthScheme::Kerberos => gsi::authenticate(conn).await,
        AuthScheme::Anonymous => anonymous::authenticate(conn).await,
    }
}
