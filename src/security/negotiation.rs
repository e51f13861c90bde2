// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The client/server SSL-stance negotiation matrix (spec.md §4.3).
//!
//! Both sides advertise one of `Require` / `DontCare` / `Refuse`; the
//! combined outcome is either "use SSL" or "plaintext", or a hard
//! [`IrodsError::Negotiation`] failure when the stances are incompatible
//! (one side requires, the other refuses).

use crate::{
    cfg::enums::SslPolicy,
    error::{IrodsError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiatedTransport {
    Ssl,
    Plain,
}

pub fn negotiate(client: SslPolicy, server: SslPolicy) -> Result<NegotiatedTransport> {
    use SslPolicy::*;

    match (client, server) {
        (Require, Refuse) | (Refuse, Require) => Err(IrodsError::Negotiation(format!(
            "incompatible SSL stances: client={client}, server={server}"
        ))),
        (Require, _) | (_, Require) => Ok(NegotiatedTransport::Ssl),
        (Refuse, _) | (_, Refuse) => Ok(NegotiatedTransport::Plain),
        (DontCare, DontCare) => Ok(NegotiatedTransport::Plain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_wins_over_dont_care() {
        assert_eq!(
            negotiate(SslPolicy::Require, SslPolicy::DontCare).unwrap(),
            NegotiatedTransport::Ssl
        );
        assert_eq!(
            negotiate(SslPolicy::DontCare, SslPolicy::Require).unwrap(),
            NegotiatedTransport::Ssl
        );
    }

    #[test]
    fn dont_care_both_sides_stays_plain() {
        assert_eq!(
            negotiate(SslPolicy::DontCare, SslPolicy::DontCare).unwrap(),
            NegotiatedTransport::Plain
        );
    }

    #[test]
    fn require_vs_refuse_fails() {
        assert!(negotiate(SslPolicy::Require, SslPolicy::Refuse).is_err());
        assert!(negotiate(SslPolicy::Refuse, SslPolicy::Require).is_err());
    }

    #[test]
    fn refuse_wins_over_dont_care() {
        assert_eq!(
            negotiate(SslPolicy::Refuse, SslPolicy::DontCare).unwrap(),
            NegotiatedTransport::Plain
        );
    }
}
