// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Frames a full iRODS message: the bare 4-byte header-length prefix, the
//! [`MsgHeader`], the structured pack-instruction body, the optional
//! error-info blob, and the optional raw binary blob.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::{IrodsError, Result},
    protocol::header::{MAX_HEADER_LEN, MsgHeader, MsgType},
};

/// A fully decoded wire frame, prior to interpreting the body against a
/// specific pack-instruction schema.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: MsgHeader,
    pub body: Bytes,
    pub error_info: Bytes,
    pub binary: Bytes,
}

impl Frame {
    pub fn request(msg_type: MsgType, int_info: i32, body: String, binary: Bytes) -> Self {
        let mut header = MsgHeader::new(msg_type, int_info);
        header.msg_len = body.len() as u32;
        header.bs_len = binary.len() as u32;
        Frame { header, body: Bytes::from(body.into_bytes()), error_info: Bytes::new(), binary }
    }

    pub fn body_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|e| IrodsError::WireFormat(format!("body is not utf8: {e}")))
    }
}

/// Writes one full frame to `w`. Frame writes are never interleaved with
/// other frame writes on the same connection (see the single-outstanding-
/// request cadence enforced by [`crate::client::connection::ConnectionHandle`]).
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, frame: &Frame) -> Result<()> {
    let header_xml = frame.header.to_xml();
    let header_len = header_xml.len() as u32;

    w.write_all(&header_len.to_be_bytes())
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    w.write_all(header_xml.as_bytes())
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    if !frame.body.is_empty() {
        w.write_all(&frame.body)
            .await
            .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    }
    if !frame.error_info.is_empty() {
        w.write_all(&frame.error_info)
            .await
            .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    }
    if !frame.binary.is_empty() {
        w.write_all(&frame.binary)
            .await
            .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    }
    w.flush().await.map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    Ok(())
}

/// Reads one full frame from `r`.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Frame> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    let header_len = u32::from_be_bytes(len_buf);
    if header_len == 0 || header_len > MAX_HEADER_LEN {
        return Err(IrodsError::WireFormat(format!(
            "implausible header length {header_len}"
        )));
    }

    let mut header_buf = BytesMut::zeroed(header_len as usize);
    r.read_exact(&mut header_buf)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    let header_str = std::str::from_utf8(&header_buf)
        .map_err(|e| IrodsError::WireFormat(format!("header is not utf8: {e}")))?;
    let header = MsgHeader::from_xml(header_str)?;

    let body = read_exact_bytes(r, header.msg_len as usize).await?;
    let error_info = read_exact_bytes(r, header.error_len as usize).await?;
    let binary = read_exact_bytes(r, header.bs_len as usize).await?;

    Ok(Frame { header, body, error_info, binary })
}

async fn read_exact_bytes<R: AsyncRead + Unpin>(r: &mut R, len: usize) -> Result<Bytes> {
    if len == 0 {
        return Ok(Bytes::new());
    }
    let mut buf = BytesMut::zeroed(len);
    r.read_exact(&mut buf)
        .await
        .map_err(|e| IrodsError::NetworkFailure(e.to_string()))?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_frame_through_an_in_memory_pipe() {
        let frame = Frame::request(
            MsgType::ApiReq,
            401,
            "<DataObjInp_PI><objPath>/z/a</objPath></DataObjInp_PI>".to_string(),
            Bytes::new(),
        );

        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.expect("write");

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.expect("read");

        assert_eq!(decoded.header.int_info, 401);
        assert_eq!(decoded.body_str().unwrap(), frame.body_str().unwrap());
    }
}
