// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Anonymous sessions skip challenge-response entirely; the server
//! identifies the connection as anonymous from the `StartupPack.option`
//! field sent during connect (spec.md §4.3).

use crate::{client::connection::ConnectionHandle, error::Result};

pub async fn authenticate(_conn: &ConnectionHandle) -> Result<()> {
    Ok(())
}
