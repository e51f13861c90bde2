// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Client SSL stance advertised during negotiation (spec.md §4.3).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslPolicy {
    #[serde(rename = "Require", alias = "require", alias = "REQUIRE")]
    Require,
    #[serde(rename = "DontCare", alias = "dont_care", alias = "DONT_CARE")]
    DontCare,
    #[serde(rename = "Refuse", alias = "refuse", alias = "REFUSE")]
    Refuse,
}

impl fmt::Display for SslPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SslPolicy::Require => "CS_NEG_REQUIRE",
            SslPolicy::DontCare => "CS_NEG_DONT_CARE",
            SslPolicy::Refuse => "CS_NEG_REFUSE",
        })
    }
}

/// Authentication scheme dispatched by [`crate::cfg::config::Account::scheme`].
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    #[serde(rename = "native", alias = "Native", alias = "NATIVE")]
    Native,
    #[serde(rename = "pam", alias = "PAM")]
    Pam,
    #[serde(rename = "gsi", alias = "GSI")]
    Gsi,
    #[serde(rename = "kerberos", alias = "Kerberos", alias = "KRB")]
    Kerberos,
    #[serde(rename = "anonymous", alias = "Anonymous")]
    Anonymous,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthScheme::Native => "native",
            AuthScheme::Pam => "pam_password",
            AuthScheme::Gsi => "GSI",
            AuthScheme::Kerberos => "KRB",
            AuthScheme::Anonymous => "anonymous",
        })
    }
}

/// AES key-size / PBKDF2 parameters negotiated for the parallel bulk cipher
/// (spec.md §4.4).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    #[serde(rename = "AES-256-CBC", alias = "aes-256-cbc")]
    Aes256Cbc,
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncryptionAlgorithm::Aes256Cbc => "AES-256-CBC",
        })
    }
}

/// Per-transfer conflict/error policy (spec.md §4.6 "Error and cancellation
/// policy").
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Keep going after a per-file error; report it through the listener.
    #[default]
    ContinueOnError,
    /// Abort the whole transfer on the first per-file error.
    FailFast,
}
