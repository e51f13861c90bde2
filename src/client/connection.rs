// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The connection engine (spec.md §4, [MODULE] C4): one TCP (or TLS-
//! upgraded) socket, one outstanding request at a time, driven through the
//! `New → Negotiating → Authenticating → Ready → (InUse ↔ Ready) → Closing
//! → Closed` state machine.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cfg::{
        config::{Account, NegotiationConfig, RuntimeConfig},
        enums::AuthScheme,
    },
    client::common::{io_with_timeout, with_timeout},
    error::{IrodsError, Result},
    handlers,
    protocol::{
        codec::{Frame, read_frame, write_frame},
        header::MsgType,
        messages::{CsNegotiation, SslEnd, SslStart, StartupPack, VersionPack},
        pack::{Decode, Encode},
    },
    security::{
        cipher::ParallelCipher,
        negotiation::{NegotiatedTransport, negotiate},
        tls,
    },
};

/// Coarse connection lifecycle (spec.md §4, "cadence invariant": exactly
/// one outstanding request per connection at a time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    New,
    Negotiating,
    Authenticating,
    Ready,
    InUse,
    Closing,
    Closed,
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

pub struct ConnectionHandle {
    reader: Mutex<BoxedReader>,
    writer: Mutex<BoxedWriter>,
    /// Serializes whole request/response cycles so only one request is
    /// ever outstanding on this connection.
    request_lock: Mutex<()>,
    state: Mutex<ConnState>,
    cancel: CancellationToken,
    stop_writes: CancellationToken,

    pub account: Account,
    pub runtime: RuntimeConfig,
    pub negotiation: NegotiationConfig,
    pub negotiated_transport: NegotiatedTransport,
    /// Shared-secret-derived cipher for the parallel data-transfer engine;
    /// populated once authentication establishes the session key.
    cipher: std::sync::OnceLock<ParallelCipher>,
    /// Short-lived password a PAM handshake hands back, transparently
    /// substituted for `account.password_or_token` by the native
    /// challenge-response that follows it.
    native_password_override: std::sync::Mutex<Option<String>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("account", &self.account.host)
            .field("transport", &self.negotiated_transport)
            .finish()
    }
}

impl ConnectionHandle {
    pub async fn connect(
        account: Account,
        negotiation: NegotiationConfig,
        runtime: RuntimeConfig,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>> {
        let stream = io_with_timeout(
            "tcp connect",
            TcpStream::connect((account.host.as_str(), account.port)),
            runtime.connect_timeout,
            &cancel,
        )
        .await?;
        stream
            .set_nodelay(true)
            .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;

        let state = Mutex::new(ConnState::New);
        let mut handle = ConnectionHandle {
            reader: Mutex::new(Box::new(tokio::io::empty())),
            writer: Mutex::new(Box::new(tokio::io::sink())),
            request_lock: Mutex::new(()),
            state,
            cancel: cancel.clone(),
            stop_writes: CancellationToken::new(),
            account: account.clone(),
            runtime: runtime.clone(),
            negotiation: negotiation.clone(),
            negotiated_transport: NegotiatedTransport::Plain,
            cipher: std::sync::OnceLock::new(),
            native_password_override: std::sync::Mutex::new(None),
            closed: AtomicBool::new(false),
        };

        *handle.state.get_mut() = ConnState::Negotiating;

        // Negotiation needs the raw stream before it is boxed (it may be
        // upgraded to TLS in place), so perform it first and only then
        // install the resulting halves.
        let (negotiated, read_half, write_half) =
            run_negotiation(stream, &account, &negotiation, &runtime, &cancel).await?;

        handle.negotiated_transport = negotiated;
        *handle.reader.get_mut() = read_half;
        *handle.writer.get_mut() = write_half;

        let handle = Arc::new(handle);

        {
            let mut st = handle.state.lock().await;
            *st = ConnState::Authenticating;
        }
        handlers::authenticate(&handle).await?;
        {
            let mut st = handle.state.lock().await;
            *st = ConnState::Ready;
        }

        debug!(host = %handle.account.host, transport = ?handle.negotiated_transport, "connection ready");
        Ok(handle)
    }

    pub fn set_cipher(&self, cipher: ParallelCipher) {
        let _ = self.cipher.set(cipher);
    }

    pub fn cipher(&self) -> Option<&ParallelCipher> {
        self.cipher.get()
    }

    /// Records the short-lived password a PAM handshake generated, so the
    /// native challenge-response that follows uses it instead of the
    /// account's long-lived credential.
    pub fn set_native_password_override(&self, password: String) {
        *self.native_password_override.lock().expect("native_password_override poisoned") = Some(password);
    }

    /// The password native auth should challenge-response against: the
    /// PAM-issued short-lived password when one was set, else the
    /// account's configured credential.
    pub fn native_password(&self) -> String {
        self.native_password_override
            .lock()
            .expect("native_password_override poisoned")
            .clone()
            .unwrap_or_else(|| self.account.password_or_token.clone())
    }

    pub fn cancel_now(&self) {
        self.cancel.cancel();
    }

    /// Forbid further writes without tearing down the socket; lets
    /// in-flight reads on the parallel engine drain.
    pub fn quiesce_writes(&self) {
        self.stop_writes.cancel();
    }

    pub async fn state(&self) -> ConnState {
        *self.state.lock().await
    }

    /// Sends one request frame and waits for its reply, holding
    /// `request_lock` for the whole exchange so no second request can be
    /// interleaved on this connection.
    pub async fn call<Req: Encode, Resp: Decode>(
        &self,
        msg_type: MsgType,
        int_info: i32,
        req: &Req,
    ) -> Result<(Resp, i32)> {
        if self.stop_writes.is_cancelled() {
            return Err(IrodsError::Cancelled);
        }
        let _permit = self.request_lock.lock().await;

        {
            let mut st = self.state.lock().await;
            *st = ConnState::InUse;
        }

        let frame = Frame::request(msg_type, int_info, req.encode(), Bytes::new());
        let result = self.exchange(frame).await;

        {
            let mut st = self.state.lock().await;
            *st = if self.closed.load(Ordering::Acquire) {
                ConnState::Closed
            } else {
                ConnState::Ready
            };
        }

        let frame = result?;
        if frame.header.int_info < 0 {
            let message = frame
                .body_str()
                .unwrap_or("<no message>")
                .to_string();
            return Err(IrodsError::from_server_status(frame.header.int_info, message));
        }

        let body = frame.body_str()?;
        let resp = Resp::decode(body)?;
        Ok((resp, frame.header.int_info))
    }

    /// Raw exchange used internally and by the negotiation/auth handshake,
    /// which need to inspect headers the typed [`Self::call`] hides.
    pub async fn exchange(&self, frame: Frame) -> Result<Frame> {
        {
            let mut w = self.writer.lock().await;
            with_timeout(
                "write frame",
                write_frame(&mut *w, &frame),
                self.runtime.primary_socket_timeout,
                &self.cancel,
            )
            .await?;
        }
        let mut r = self.reader.lock().await;
        with_timeout(
            "read frame",
            read_frame(&mut *r),
            self.runtime.primary_socket_timeout,
            &self.cancel,
        )
        .await
    }

    pub async fn disconnect(&self) {
        {
            let mut st = self.state.lock().await;
            *st = ConnState::Closing;
        }
        let mut w = self.writer.lock().await;
        if self.negotiated_transport == NegotiatedTransport::Ssl {
            let end = SslEnd;
            let frame = Frame::request(MsgType::SslHandshake, 0, end.encode(), Bytes::new());
            if let Err(e) = write_frame(&mut *w, &frame).await {
                warn!("error sending SSL_END: {e}");
            }
        }
        let frame = Frame::request(MsgType::Disconnect, 0, String::new(), Bytes::new());
        if let Err(e) = write_frame(&mut *w, &frame).await {
            warn!("error sending RODS_DISCONNECT: {e}");
        }
        self.closed.store(true, Ordering::Release);
        let mut st = self.state.lock().await;
        *st = ConnState::Closed;
    }
}

async fn run_negotiation(
    stream: TcpStream,
    account: &Account,
    negotiation: &NegotiationConfig,
    runtime: &RuntimeConfig,
    cancel: &CancellationToken,
) -> Result<(NegotiatedTransport, BoxedReader, BoxedWriter)> {
    // Exchange SSL stances in the clear.
    let req = CsNegotiation { stance: negotiation.ssl_policy.to_string() };
    let mut stream = stream;

    let frame = Frame::request(MsgType::ApiReq, 0, req.encode(), Bytes::new());
    with_timeout(
        "write negotiation",
        write_frame(&mut stream, &frame),
        runtime.primary_socket_timeout,
        cancel,
    )
    .await?;
    let reply = with_timeout(
        "read negotiation",
        read_frame(&mut stream),
        runtime.primary_socket_timeout,
        cancel,
    )
    .await?;
    let server_stance = CsNegotiation::decode(reply.body_str()?)?;
    let server_policy = parse_server_policy(&server_stance.stance)?;

    let transport = negotiate(negotiation.ssl_policy, server_policy)?;

    let (read_half, write_half): (BoxedReader, BoxedWriter) = match transport {
        NegotiatedTransport::Plain => {
            let (r, w) = stream.into_split();
            (Box::new(r), Box::new(w))
        },
        NegotiatedTransport::Ssl => {
            let start = SslStart { algorithm: negotiation.encryption_algorithm.to_string() };
            let frame = Frame::request(MsgType::SslHandshake, 0, start.encode(), Bytes::new());
            with_timeout(
                "write ssl start",
                write_frame(&mut stream, &frame),
                runtime.primary_socket_timeout,
                cancel,
            )
            .await?;
            with_timeout(
                "read ssl start ack",
                read_frame(&mut stream),
                runtime.primary_socket_timeout,
                cancel,
            )
            .await?;

            let config = tls::build_client_config(None)?;
            let tls_stream = tls::upgrade(stream, &account.host, config).await?;
            let (r, w) = tokio::io::split(tls_stream);
            (Box::new(r), Box::new(w))
        },
    };

    // Startup/version exchange happens after any TLS upgrade, over
    // whichever transport was negotiated.
    let mut handle_stub = StartupExchange { reader: read_half, writer: write_half };
    handle_stub.run(account, runtime, cancel).await?;

    Ok((transport, handle_stub.reader, handle_stub.writer))
}

fn parse_server_policy(stance: &str) -> Result<crate::cfg::enums::SslPolicy> {
    use crate::cfg::enums::SslPolicy::*;
    Ok(match stance {
        "CS_NEG_REQUIRE" => Require,
        "CS_NEG_DONT_CARE" => DontCare,
        "CS_NEG_REFUSE" => Refuse,
        other => {
            return Err(IrodsError::Negotiation(format!("unknown server stance {other}")));
        },
    })
}

struct StartupExchange {
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl StartupExchange {
    async fn run(
        &mut self,
        account: &Account,
        runtime: &RuntimeConfig,
        cancel: &CancellationToken,
    ) -> Result<VersionPack> {
        let startup = StartupPack {
            proxy_user: account.proxy_user.clone().unwrap_or_else(|| account.user.clone()),
            proxy_zone: account.proxy_zone.clone().unwrap_or_else(|| account.zone.clone()),
            client_user: account.user.clone(),
            client_zone: account.zone.clone(),
            rel_version: "rods4.3.3".to_string(),
            api_version: "d".to_string(),
            option: match account.scheme {
                AuthScheme::Anonymous => "anonymous_user".to_string(),
                _ => String::new(),
            },
        };

        let frame = Frame::request(MsgType::Connect, 0, startup.encode(), Bytes::new());
        with_timeout(
            "write startup",
            write_frame(&mut self.writer, &frame),
            runtime.connect_timeout,
            cancel,
        )
        .await?;
        let reply = with_timeout(
            "read version",
            read_frame(&mut self.reader),
            runtime.connect_timeout,
            cancel,
        )
        .await?;

        if reply.header.int_info < 0 {
            return Err(IrodsError::from_server_status(
                reply.header.int_info,
                reply.body_str().unwrap_or("startup rejected").to_string(),
            ));
        }

        let version = VersionPack::decode(reply.body_str()?)?;
        if !SUPPORTED_API_VERSIONS.contains(&version.api_version.as_str()) {
            return Err(IrodsError::Negotiation(format!(
                "server api_version {:?} is not one of the schema versions this client's \
                 pack-instruction registry supports ({SUPPORTED_API_VERSIONS:?})",
                version.api_version
            )));
        }
        Ok(version)
    }
}

/// `apiVersion` strings this client's pack-instruction registry
/// (`crate::protocol::messages`) can decode. `"d"` is the one this crate
/// advertises in its own `StartupPack`; servers are expected to echo it
/// back unchanged since this is a single, fixed wire dialect rather than
/// a negotiated schema family.
const SUPPORTED_API_VERSIONS: &[&str] = &["d"];
