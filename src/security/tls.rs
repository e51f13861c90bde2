// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Upgrades the control channel to TLS once negotiation selects SSL
//! (spec.md §4.3). Mirrors the teacher's split-socket shape: the caller
//! gets back owned read/write halves, now of a `TlsStream` instead of a
//! bare `TcpStream`, so the rest of `ClientConnection` is transport-agnostic.

use std::sync::Arc;

use rustls_pemfile::certs;
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use crate::error::{IrodsError, Result};

/// Builds a `ClientConfig` trusting the platform's web roots plus, when
/// provided, an extra PEM bundle (the iRODS server's self-signed CA is
/// common in the wild and won't be in `webpki-roots`).
pub fn build_client_config(extra_ca_pem: Option<&[u8]>) -> Result<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(pem) = extra_ca_pem {
        let mut reader = std::io::Cursor::new(pem);
        for cert in certs(&mut reader) {
            let cert = cert.map_err(|e| {
                IrodsError::Negotiation(format!("invalid extra CA certificate: {e}"))
            })?;
            roots
                .add(cert)
                .map_err(|e| IrodsError::Negotiation(format!("bad CA certificate: {e}")))?;
        }
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Performs the TLS handshake over an already-connected TCP stream.
pub async fn upgrade(
    stream: TcpStream,
    server_name: &str,
    config: Arc<ClientConfig>,
) -> Result<TlsStream<TcpStream>> {
    let connector = TlsConnector::from(config);
    let name = ServerName::try_from(server_name.to_string())
        .map_err(|e| IrodsError::Negotiation(format!("invalid server name: {e}")))?;

    connector
        .connect(name, stream)
        .await
        .map_err(|e| IrodsError::Negotiation(format!("TLS handshake failed: {e}")))
}
