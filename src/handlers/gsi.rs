// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! GSI/Kerberos authentication requires a GSSAPI implementation this crate
//! does not vendor; the scheme is accepted by [`crate::cfg::enums::
//! AuthScheme`] so configuration round-trips cleanly, but connecting with
//! it fails fast with a typed error rather than silently downgrading.

use crate::{client::connection::ConnectionHandle, error::{IrodsError, Result}};

pub async fn authenticate(_conn: &ConnectionHandle) -> Result<()> {
    Err(IrodsError::NotSupported("GSI/Kerberos authentication is not implemented"))
}
