// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Native iRODS challenge-response authentication: an MD5 digest of the
//! server challenge padded/truncated with the account password, the same
//! shape as the teacher's CHAP handler (challenge in, keyed digest out)
//! adapted to iRODS's fixed-length padding instead of CHAP's variable hex.

use md5::{Digest, Md5};

use crate::{
    client::connection::ConnectionHandle,
    error::Result,
    protocol::{
        header::MsgType,
        messages::{AuthChallenge, AuthRequest, AuthResponse, AuthResult},
    },
    security::cipher::ParallelCipher,
};

/// iRODS pads the challenge+password material to this length before
/// hashing; servers reject responses computed without the padding.
const CHALLENGE_PAD_LEN: usize = 64;
const CHALLENGE_LEN: usize = 64;

fn compute_response(challenge: &[u8], password: &str) -> String {
    let mut material = [0u8; CHALLENGE_LEN + CHALLENGE_PAD_LEN];
    let take = challenge.len().min(CHALLENGE_LEN);
    material[..take].copy_from_slice(&challenge[..take]);

    let pw_bytes = password.as_bytes();
    let take_pw = pw_bytes.len().min(CHALLENGE_PAD_LEN);
    material[CHALLENGE_LEN..CHALLENGE_LEN + take_pw].copy_from_slice(&pw_bytes[..take_pw]);

    let mut hasher = Md5::new();
    hasher.update(material);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        write!(&mut out, "{b:02x}").expect("writing to String cannot fail");
    }
    out
}

pub async fn authenticate(conn: &ConnectionHandle) -> Result<()> {
    let (challenge, _): (AuthChallenge, i32) =
        conn.call(MsgType::ApiReq, 703, &AuthRequest).await?;

    let password = conn.native_password();
    let response = compute_response(challenge.challenge.as_bytes(), &password);
    let req = AuthResponse { response: response.clone(), username: conn.account.effective_user().to_string() };

    let (result, _): (AuthResult, i32) = conn.call(MsgType::ApiReq, 704, &req).await?;
    if result.status != 0 {
        return Err(crate::error::IrodsError::AuthFailed(format!(
            "server rejected native auth response (status {})",
            result.status
        )));
    }

    install_cipher(conn, &challenge.challenge, &response);
    Ok(())
}

/// Derives the parallel-transfer bulk cipher from this handshake's shared
/// material (the keyed digest) and session salt (the server challenge,
/// sized to the negotiated salt length), and installs it on the connection.
fn install_cipher(conn: &ConnectionHandle, challenge: &str, response: &str) {
    let salt_len = (conn.negotiation.encryption_salt_size as usize).max(1);
    let mut salt = challenge.as_bytes().to_vec();
    salt.resize(salt_len, 0);
    let cipher = ParallelCipher::derive(response.as_bytes(), &salt, conn.negotiation.encryption_num_hash_rounds);
    conn.set_cipher(cipher);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_stable_for_same_inputs() {
        let a = compute_response(b"challenge-bytes", "hunter2");
        let b = compute_response(b"challenge-bytes", "hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32); // md5 hex digest
    }

    #[test]
    fn different_passwords_produce_different_responses() {
        let a = compute_response(b"challenge-bytes", "hunter2");
        let b = compute_response(b"challenge-bytes", "correct-horse");
        assert_ne!(a, b);
    }
}
