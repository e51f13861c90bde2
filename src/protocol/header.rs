// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The iRODS message header: four big-endian length fields plus a short
//! type tag, sent ahead of every request/response frame.
//!
//! ```text
//!  u32 header_len (big-endian, sent bare, not part of `MsgHeader` itself)
//!  MsgHeader as XML-ish tag/value (see `crate::protocol::pack`):
//!    type       – e.g. "RODS_API_REQ", "RODS_API_REPLY", "RODS_DISCONNECT"
//!    msg_len    – length of the structured body that follows
//!    error_len  – length of the optional error-info blob
//!    bs_len     – length of the optional raw binary blob
//!    int_info   – request API number, or reply status code
//! ```

use crate::error::{IrodsError, Result};

/// Ceiling on the bare 4-byte length prefix that precedes the header
/// itself; guards against a corrupt peer claiming a multi-gigabyte header.
pub const MAX_HEADER_LEN: u32 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgHeader {
    pub msg_type: MsgType,
    pub msg_len: u32,
    pub error_len: u32,
    pub bs_len: u32,
    pub int_info: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    ApiReq,
    ApiReply,
    Connect,
    Version,
    Disconnect,
    SslHandshake,
}

impl MsgType {
    pub fn as_tag(self) -> &'static str {
        match self {
            MsgType::ApiReq => "RODS_API_REQ",
            MsgType::ApiReply => "RODS_API_REPLY",
            MsgType::Connect => "RODS_CONNECT",
            MsgType::Version => "RODS_VERSION",
            MsgType::Disconnect => "RODS_DISCONNECT",
            MsgType::SslHandshake => "RODS_SSL_HANDSHAKE",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        Ok(match tag {
            "RODS_API_REQ" => MsgType::ApiReq,
            "RODS_API_REPLY" => MsgType::ApiReply,
            "RODS_CONNECT" => MsgType::Connect,
            "RODS_VERSION" => MsgType::Version,
            "RODS_DISCONNECT" => MsgType::Disconnect,
            "RODS_SSL_HANDSHAKE" => MsgType::SslHandshake,
            other => return Err(IrodsError::WireFormat(format!("unknown msgType {other}"))),
        })
    }
}

impl MsgHeader {
    pub fn new(msg_type: MsgType, int_info: i32) -> Self {
        MsgHeader { msg_type, msg_len: 0, error_len: 0, bs_len: 0, int_info }
    }

    /// Encodes the header body as the tag/value text iRODS expects,
    /// e.g. `MsgHeader_PI</type>RODS_API_REQ<...>`. Uses the same flat
    /// key=value-then-null-ish scheme as [`crate::protocol::pack`], but
    /// the header is always exactly these five fields.
    pub fn to_xml(&self) -> String {
        format!(
            "<MsgHeader_PI>\n<type>{}</type>\n<msgLen>{}</msgLen>\n<errorLen>{}</errorLen>\n<bsLen>{}</bsLen>\n<intInfo>{}</intInfo>\n</MsgHeader_PI>\n",
            self.msg_type.as_tag(),
            self.msg_len,
            self.error_len,
            self.bs_len,
            self.int_info,
        )
    }

    pub fn from_xml(s: &str) -> Result<Self> {
        let get = |tag: &str| -> Result<String> {
            let open = format!("<{tag}>");
            let close = format!("</{tag}>");
            let start = s
                .find(&open)
                .ok_or_else(|| IrodsError::WireFormat(format!("missing <{tag}>")))?
                + open.len();
            let end = s[start..]
                .find(&close)
                .ok_or_else(|| IrodsError::WireFormat(format!("missing </{tag}>")))?
                + start;
            Ok(s[start..end].to_string())
        };

        let msg_type = MsgType::from_tag(get("type")?.trim())?;
        let parse_u32 = |tag: &str| -> Result<u32> {
            get(tag)?
                .trim()
                .parse()
                .map_err(|e| IrodsError::WireFormat(format!("{tag}: {e}")))
        };
        let parse_i32 = |tag: &str| -> Result<i32> {
            get(tag)?
                .trim()
                .parse()
                .map_err(|e| IrodsError::WireFormat(format!("{tag}: {e}")))
        };

        Ok(MsgHeader {
            msg_type,
            msg_len: parse_u32("msgLen")?,
            error_len: parse_u32("errorLen")?,
            bs_len: parse_u32("bsLen")?,
            int_info: parse_i32("intInfo")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_xml() {
        let h = MsgHeader {
            msg_type: MsgType::ApiReq,
            msg_len: 42,
            error_len: 0,
            bs_len: 7,
            int_info: 401,
        };
        let xml = h.to_xml();
        let back = MsgHeader::from_xml(&xml).expect("parse");
        assert_eq!(h, back);
    }

    #[test]
    fn rejects_unknown_type() {
        let xml = "<MsgHeader_PI><type>NOT_A_TYPE</type><msgLen>0</msgLen><errorLen>0</errorLen><bsLen>0</bsLen><intInfo>0</intInfo></MsgHeader_PI>";
        assert!(MsgHeader::from_xml(xml).is_err());
    }
}
