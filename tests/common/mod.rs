// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared scaffolding for the integration tests: a minimal mock iRODS
//! server driven from a fixed reply script, plus a [`Config`] builder
//! pointed at whatever port that mock server bound.

#![allow(dead_code)]

use std::time::Duration;

use bytes::Bytes;
use irods_client::{
    cfg::{
        config::{Account, Config, NegotiationConfig, RuntimeConfig, TransferDefaults},
        enums::{AuthScheme, EncryptionAlgorithm, ErrorPolicy, SslPolicy},
    },
    protocol::{
        codec::{Frame, read_frame, write_frame},
        header::MsgType,
        pack::{Encode, PackValue},
    },
};
use tokio::net::TcpListener;

pub fn test_config(host: String, port: u16) -> Config {
    Config {
        account: Account {
            host,
            port,
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
            connect_timeout: Duration::from_secs(5),
            primary_socket_timeout: Duration::from_secs(5),
            parallel_socket_timeout: Duration::from_secs(5),
            read_buffer_size: 8192,
            write_buffer_size: 8192,
            max_sessions: 4,
        },
        transfer: TransferDefaults { error_policy: ErrorPolicy::ContinueOnError, ..TransferDefaults::default() },
    }
}

/// One scripted reply: the `int_info` the reply frame carries, and its body.
pub struct Reply {
    pub int_info: i32,
    pub body: String,
}

impl Reply {
    pub fn ok(encoded: impl Encode) -> Self {
        Reply { int_info: 0, body: encoded.encode() }
    }

    pub fn status(int_info: i32, encoded: impl Encode) -> Self {
        Reply { int_info, body: encoded.encode() }
    }

    pub fn error(int_info: i32) -> Self {
        Reply { int_info, body: String::new() }
    }
}

/// Binds a listener on an ephemeral loopback port and spawns a task that
/// accepts exactly one connection, replying to each inbound frame with the
/// next scripted [`Reply`] in order. Panics (failing the test) if the
/// client sends more or fewer frames than the script has replies for.
pub async fn spawn_mock_server(replies: Vec<Reply>) -> (String, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind mock listener");
    let addr = listener.local_addr().expect("local_addr");

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        for reply in replies {
            let _request = read_frame(&mut stream).await.expect("read request frame");
            let frame = Frame::request(MsgType::ApiReply, reply.int_info, reply.body, Bytes::new());
            write_frame(&mut stream, &frame).await.expect("write reply frame");
        }
    });

    (addr.ip().to_string(), addr.port())
}

// ---- Reply-only Encode shims for response types the crate only ever
// decodes client-side (VersionPack, AuthChallenge, AuthResult, CollEntries).

pub struct VersionReply {
    pub cookie: i32,
}

impl Encode for VersionReply {
    fn pi_name(&self) -> &'static str {
        "Version_PI"
    }
    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("status".to_string(), PackValue::Int(0)),
            ("relVersion".to_string(), PackValue::Text("rods4.3.3".to_string())),
            ("apiVersion".to_string(), PackValue::Text("d".to_string())),
            ("reconnPort".to_string(), PackValue::Int(0)),
            ("reconnAddr".to_string(), PackValue::Text(String::new())),
            ("cookie".to_string(), PackValue::Int(self.cookie as i64)),
        ])
    }
}

pub struct ChallengeReply {
    pub challenge: String,
}

impl Encode for ChallengeReply {
    fn pi_name(&self) -> &'static str {
        "authRequestOut_PI"
    }
    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![("challenge".to_string(), PackValue::Text(self.challenge.clone()))])
    }
}

pub struct AuthStatusReply {
    pub status: i32,
}

impl Encode for AuthStatusReply {
    fn pi_name(&self) -> &'static str {
        "authResponseOut_PI"
    }
    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![("status".to_string(), PackValue::Int(self.status as i64))])
    }
}

pub struct ListReply {
    /// `(path, is_collection, size)` triples.
    pub entries: Vec<(&'static str, bool, i64)>,
}

impl Encode for ListReply {
    fn pi_name(&self) -> &'static str {
        "CollEntries_PI"
    }
    fn to_pack(&self) -> PackValue {
        let items = self
            .entries
            .iter()
            .map(|(path, is_coll, size)| {
                PackValue::Struct(vec![
                    ("path".to_string(), PackValue::Text((*path).to_string())),
                    (
                        "objType".to_string(),
                        PackValue::Text(if *is_coll { "COLL_OBJ_T" } else { "DATA_OBJ_T" }.to_string()),
                    ),
                    ("dataSize".to_string(), PackValue::Int(*size)),
                    ("modifyTime".to_string(), PackValue::Text("1700000000".to_string())),
                ])
            })
            .collect();
        PackValue::Struct(vec![("entries".to_string(), PackValue::List(items))])
    }
}

pub struct EmptyOkReply;

impl Encode for EmptyOkReply {
    fn pi_name(&self) -> &'static str {
        "EmptyReply_PI"
    }
    fn to_pack(&self) -> PackValue {
        PackValue::Text(String::new())
    }
}
