// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Pack-instruction schema registry (spec.md §4.1): one request/response
//! struct pair per wire operation the client surface needs, each
//! implementing [`crate::protocol::pack::Encode`]/[`Decode`].

use crate::{
    error::Result,
    protocol::pack::{Decode, Encode, PackValue},
};

fn text(s: impl Into<String>) -> PackValue {
    PackValue::Text(s.into())
}
fn int(v: i64) -> PackValue {
    PackValue::Int(v)
}

// ---- Startup / version exchange -----------------------------------------

#[derive(Debug, Clone)]
pub struct StartupPack {
    pub proxy_user: String,
    pub proxy_zone: String,
    pub client_user: String,
    pub client_zone: String,
    pub rel_version: String,
    pub api_version: String,
    pub option: String,
}

impl Encode for StartupPack {
    fn pi_name(&self) -> &'static str {
        "StartupPack_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("irodsProt".to_string(), int(1)),
            ("reconnFlag".to_string(), int(0)),
            ("connectCnt".to_string(), int(0)),
            ("proxyUser".to_string(), text(&self.proxy_user)),
            ("proxyRcatZone".to_string(), text(&self.proxy_zone)),
            ("clientUser".to_string(), text(&self.client_user)),
            ("clientRcatZone".to_string(), text(&self.client_zone)),
            ("relVersion".to_string(), text(&self.rel_version)),
            ("apiVersion".to_string(), text(&self.api_version)),
            ("option".to_string(), text(&self.option)),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct VersionPack {
    pub status: i32,
    pub rel_version: String,
    pub api_version: String,
    pub reconn_port: i32,
    pub reconn_addr: String,
    pub cookie: i32,
}

impl Decode for VersionPack {
    fn from_pack(value: &PackValue) -> Result<Self> {
        Ok(VersionPack {
            status: value.field("status")?.as_int()? as i32,
            rel_version: value.field("relVersion")?.as_text()?.to_string(),
            api_version: value.field("apiVersion")?.as_text()?.to_string(),
            reconn_port: value.field("reconnPort")?.as_int()? as i32,
            reconn_addr: value.field("reconnAddr")?.as_text()?.to_string(),
            cookie: value.field("cookie")?.as_int()? as i32,
        })
    }
}

// ---- Authentication -------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthRequest;

impl Encode for AuthRequest {
    fn pi_name(&self) -> &'static str {
        "authRequestInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![])
    }
}

#[derive(Debug, Clone)]
pub struct AuthChallenge {
    pub challenge: String,
}

impl Decode for AuthChallenge {
    fn from_pack(value: &PackValue) -> Result<Self> {
        Ok(AuthChallenge { challenge: value.field("challenge")?.as_text()?.to_string() })
    }
}

#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub response: String,
    pub username: String,
}

impl Encode for AuthResponse {
    fn pi_name(&self) -> &'static str {
        "authResponseInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("response".to_string(), text(&self.response)),
            ("username".to_string(), text(&self.username)),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct AuthResult {
    pub status: i32,
}

impl Decode for AuthResult {
    fn from_pack(value: &PackValue) -> Result<Self> {
        Ok(AuthResult { status: value.field("status")?.as_int()? as i32 })
    }
}

// ---- PAM authentication -----------------------------------------------------

#[derive(Debug, Clone)]
pub struct PamAuthRequest {
    pub username: String,
    pub password: String,
}

impl Encode for PamAuthRequest {
    fn pi_name(&self) -> &'static str {
        "pamAuthRequestInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("pamUser".to_string(), text(&self.username)),
            ("pamPassword".to_string(), text(&self.password)),
        ])
    }
}

/// The server's answer to a [`PamAuthRequest`]: a pass/fail status plus, on
/// success, a short-lived generated password the client then runs through a
/// regular native challenge-response (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct PamAuthResponse {
    pub status: i32,
    pub generated_password: String,
}

impl Decode for PamAuthResponse {
    fn from_pack(value: &PackValue) -> Result<Self> {
        Ok(PamAuthResponse {
            status: value.field("status")?.as_int()? as i32,
            generated_password: value.field("irodsPamPassword")?.as_text()?.to_string(),
        })
    }
}

// ---- SSL negotiation -------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CsNegotiation {
    pub stance: String,
}

impl Encode for CsNegotiation {
    fn pi_name(&self) -> &'static str {
        "CS_NEG_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("status".to_string(), int(0)),
            ("result".to_string(), text(&self.stance)),
        ])
    }
}

impl Decode for CsNegotiation {
    fn from_pack(value: &PackValue) -> Result<Self> {
        Ok(CsNegotiation { stance: value.field("result")?.as_text()?.to_string() })
    }
}

/// Announces the bulk-cipher algorithm before the control channel's TLS
/// handshake begins, sent in the clear over the not-yet-upgraded socket.
#[derive(Debug, Clone)]
pub struct SslStart {
    pub algorithm: String,
}

impl Encode for SslStart {
    fn pi_name(&self) -> &'static str {
        "SSL_START_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![("algorithm".to_string(), text(&self.algorithm))])
    }
}

/// Sent once, over the already-upgraded TLS stream, just ahead of
/// `RODS_DISCONNECT` so the server can tear down its SSL context cleanly.
#[derive(Debug, Clone)]
pub struct SslEnd;

impl Encode for SslEnd {
    fn pi_name(&self) -> &'static str {
        "SSL_END_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![])
    }
}

/// Commits a preceding catalog mutation (collection create/remove/rename);
/// sent once after the mutating call returns so multi-row catalog changes
/// are not left pending on the server.
#[derive(Debug, Clone)]
pub struct EndTransaction {
    pub commit: bool,
}

impl Encode for EndTransaction {
    fn pi_name(&self) -> &'static str {
        "EndTransactionInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![("arg0".to_string(), int(if self.commit { 1 } else { 0 }))])
    }
}

// ---- Data object open/create/unlink ---------------------------------------

#[derive(Debug, Clone)]
pub struct DataObjInp {
    pub obj_path: String,
    pub create_mode: i32,
    pub open_flags: i32,
    pub data_size: i64,
    pub resource: Option<String>,
    pub force: bool,
}

impl Encode for DataObjInp {
    fn pi_name(&self) -> &'static str {
        "DataObjInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        let mut fields = vec![
            ("objPath".to_string(), text(&self.obj_path)),
            ("createMode".to_string(), int(self.create_mode as i64)),
            ("openFlags".to_string(), int(self.open_flags as i64)),
            ("dataSize".to_string(), int(self.data_size)),
        ];
        if let Some(r) = &self.resource {
            fields.push(("resc_name".to_string(), text(r)));
        }
        if self.force {
            fields.push(("forceFlag".to_string(), int(1)));
        }
        PackValue::Struct(fields)
    }
}

#[derive(Debug, Clone)]
pub struct OpenedDataObjInp {
    pub l1_desc_inx: i32,
    pub len: i32,
    pub whence: i32,
    pub offset: i64,
}

impl Encode for OpenedDataObjInp {
    fn pi_name(&self) -> &'static str {
        "OpenedDataObjInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("l1descInx".to_string(), int(self.l1_desc_inx as i64)),
            ("len".to_string(), int(self.len as i64)),
            ("whence".to_string(), int(self.whence as i64)),
            ("offset".to_string(), int(self.offset)),
        ])
    }
}

// ---- Collection operations -------------------------------------------------

#[derive(Debug, Clone)]
pub struct CollInp {
    pub coll_name: String,
    pub recursive: bool,
    pub force: bool,
}

impl Encode for CollInp {
    fn pi_name(&self) -> &'static str {
        "CollInpNew_PI"
    }

    fn to_pack(&self) -> PackValue {
        let mut fields = vec![("collName".to_string(), text(&self.coll_name))];
        if self.recursive {
            fields.push(("recursiveOprFlag".to_string(), int(1)));
        }
        if self.force {
            fields.push(("forceFlag".to_string(), int(1)));
        }
        PackValue::Struct(fields)
    }
}

#[derive(Debug, Clone)]
pub struct CollEntry {
    pub path: String,
    pub is_collection: bool,
    pub size: i64,
    pub modify_time: String,
}

#[derive(Debug, Clone)]
pub struct CollEntries {
    pub entries: Vec<CollEntry>,
}

impl Decode for CollEntries {
    fn from_pack(value: &PackValue) -> Result<Self> {
        let entries = match value.field("entries") {
            Ok(v) => match v {
                PackValue::List(items) => items
                    .iter()
                    .map(decode_coll_entry)
                    .collect::<Result<Vec<_>>>()?,
                single => vec![decode_coll_entry(single)?],
            },
            Err(_) => Vec::new(),
        };
        Ok(CollEntries { entries })
    }
}

fn decode_coll_entry(v: &PackValue) -> Result<CollEntry> {
    Ok(CollEntry {
        path: v.field("path")?.as_text()?.to_string(),
        is_collection: v.field("objType")?.as_text()? == "COLL_OBJ_T",
        size: v.field("dataSize")?.as_int()?,
        modify_time: v.field("modifyTime")?.as_text()?.to_string(),
    })
}

// ---- Rename / move / copy ---------------------------------------------------

#[derive(Debug, Clone)]
pub struct DataObjCopyInp {
    pub src_path: String,
    pub dst_path: String,
    pub is_rename: bool,
    /// Target resource for a copy; unused for rename/move.
    pub resource: Option<String>,
    /// Overwrite an existing object at `dst_path`.
    pub force: bool,
}

impl Encode for DataObjCopyInp {
    fn pi_name(&self) -> &'static str {
        "DataObjCopyInp_PI"
    }

    fn to_pack(&self) -> PackValue {
        let mut fields = vec![
            ("srcPath".to_string(), text(&self.src_path)),
            ("destPath".to_string(), text(&self.dst_path)),
            ("isRename".to_string(), int(self.is_rename as i64)),
        ];
        if let Some(r) = &self.resource {
            fields.push(("destRescName".to_string(), text(r)));
        }
        if self.force {
            fields.push(("forceFlag".to_string(), int(1)));
        }
        PackValue::Struct(fields)
    }
}

// ---- Replication -------------------------------------------------------------

/// Creates a new replica of a data object on `resource`, distinct from a
/// physical move: the original replica is left in place (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct DataObjRepl {
    pub obj_path: String,
    pub resource: String,
}

impl Encode for DataObjRepl {
    fn pi_name(&self) -> &'static str {
        "DataObjRepl_PI"
    }

    fn to_pack(&self) -> PackValue {
        PackValue::Struct(vec![
            ("objPath".to_string(), text(&self.obj_path)),
            ("destRescName".to_string(), text(&self.resource)),
        ])
    }
}

// ---- Parallel transfer endpoints -------------------------------------------

#[derive(Debug, Clone)]
pub struct PortalOprOut {
    pub num_threads: i32,
    pub cookie: i32,
    pub ports: Vec<PortalPort>,
}

#[derive(Debug, Clone)]
pub struct PortalPort {
    pub host: String,
    pub port: u16,
}

impl Decode for PortalOprOut {
    fn from_pack(value: &PackValue) -> Result<Self> {
        let num_threads = value.field("numThreads")?.as_int()? as i32;
        let cookie = value.field("cookie")?.as_int()? as i32;
        let ports = match value.field("portList") {
            Ok(PackValue::List(items)) => items.iter().map(decode_port).collect::<Result<_>>()?,
            Ok(single) => vec![decode_port(single)?],
            Err(_) => Vec::new(),
        };
        Ok(PortalOprOut { num_threads, cookie, ports })
    }
}

fn decode_port(v: &PackValue) -> Result<PortalPort> {
    Ok(PortalPort {
        host: v.field("hostAddr")?.as_text()?.to_string(),
        port: v.field("port")?.as_int()? as u16,
    })
}

// ---- Generic status reply ---------------------------------------------------

/// The common `int_info` status field doubles as the reply's success/error
/// code; most replies carry no body at all on success.
#[derive(Debug, Clone)]
pub struct EmptyReply;

impl Decode for EmptyReply {
    fn from_pack(_value: &PackValue) -> Result<Self> {
        Ok(EmptyReply)
    }
}
