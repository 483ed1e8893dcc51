//! Startup banner parsing.
//!
//! The command server announces itself once, in plain text, before
//! steady-state framing begins. The banner shape changed across Mercurial
//! releases, so two formats are accepted:
//!
//! 1. `capabilities: <tokens>\nencoding: <token>` ending the banner.
//! 2. `capabilities: <tokens>\nencoding: <token>\n<trailing...>` as emitted
//!    by hg 3.2 and newer, which append further lines.
//!
//! Format 1 is tried first, then format 2. A hypothetical third shape is an
//! extension point here, not something to assume away.

use std::collections::BTreeSet;

use crate::error::{Result, SessionError};

/// Capabilities and text encoding extracted from the startup banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Command names the server advertises as invocable.
    pub capabilities: BTreeSet<String>,
    /// Declared text encoding label, e.g. `UTF-8`.
    pub encoding: String,
}

/// Parse the first stdout chunk into capabilities and encoding.
///
/// Fails with [`SessionError::HandshakeParse`] carrying the raw banner when
/// neither format matches or either field comes out empty.
pub fn parse_banner(banner: &str) -> Result<Handshake> {
    let matched = match_banner(banner, false).or_else(|| match_banner(banner, true));

    let (capabilities, encoding) = matched.ok_or_else(|| SessionError::HandshakeParse {
        banner: banner.to_string(),
    })?;

    let capabilities: BTreeSet<String> = capabilities
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let encoding = encoding.trim_end_matches('\r').to_string();

    if capabilities.is_empty() || encoding.is_empty() {
        return Err(SessionError::HandshakeParse {
            banner: banner.to_string(),
        });
    }

    Ok(Handshake {
        capabilities,
        encoding,
    })
}

/// Match one banner shape. With `allow_trailing` the encoding token may be
/// followed by further lines; without it the token must end the banner.
fn match_banner(banner: &str, allow_trailing: bool) -> Option<(&str, &str)> {
    let rest = banner.strip_prefix("capabilities: ")?;
    let (capabilities, rest) = rest.split_once('\n')?;
    let rest = rest.strip_prefix("encoding: ")?;

    match rest.split_once('\n') {
        None => Some((capabilities, rest)),
        Some((encoding, _trailing)) if allow_trailing => Some((capabilities, encoding)),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_line_banner() {
        let handshake = parse_banner("capabilities: serve unbundle\nencoding: UTF-8").unwrap();

        let expected: BTreeSet<String> =
            ["serve", "unbundle"].iter().map(|s| s.to_string()).collect();
        assert_eq!(handshake.capabilities, expected);
        assert_eq!(handshake.encoding, "UTF-8");
    }

    #[test]
    fn banner_with_trailing_line() {
        let handshake = parse_banner(
            "capabilities: getencoding runcommand\nencoding: UTF-8\npid: 12345",
        )
        .unwrap();

        assert!(handshake.capabilities.contains("runcommand"));
        assert!(handshake.capabilities.contains("getencoding"));
        assert_eq!(handshake.encoding, "UTF-8");
    }

    #[test]
    fn banner_with_several_trailing_lines() {
        let handshake =
            parse_banner("capabilities: runcommand\nencoding: ascii\npid: 1\nextra: x").unwrap();
        assert_eq!(handshake.encoding, "ascii");
    }

    #[test]
    fn garbage_banner_fails_with_raw_text() {
        let err = parse_banner("abort: repository /nope not found!").unwrap_err();
        match err {
            SessionError::HandshakeParse { banner } => {
                assert!(banner.contains("repository /nope not found"));
            }
            other => panic!("expected HandshakeParse, got {other:?}"),
        }
    }

    #[test]
    fn empty_capabilities_rejected() {
        let err = parse_banner("capabilities: \nencoding: UTF-8").unwrap_err();
        assert!(matches!(err, SessionError::HandshakeParse { .. }));
    }

    #[test]
    fn missing_encoding_rejected() {
        let err = parse_banner("capabilities: runcommand\n").unwrap_err();
        assert!(matches!(err, SessionError::HandshakeParse { .. }));
    }

    #[test]
    fn crlf_encoding_token_trimmed() {
        let handshake = parse_banner("capabilities: runcommand\nencoding: UTF-8\r\npid: 9").unwrap();
        assert_eq!(handshake.encoding, "UTF-8");
    }
}
