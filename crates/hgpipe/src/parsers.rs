//! Parsers for common command output shapes.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use hgpipe_frame::{Channel, Message};

use crate::error::{HgError, Result};

/// Concatenate the output-channel bodies of a message list, exactly as the
/// server emitted them (no separators inserted).
pub fn text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.channel == Channel::Output)
        .map(Message::text)
        .collect()
}

/// Deserialize templated JSON output (`-Tjson`) from a message list.
pub fn json<T: DeserializeOwned>(messages: &[Message]) -> Result<T> {
    Ok(serde_json::from_str(&text(messages))?)
}

/// Extract the version number from `hg version` output, e.g.
/// `Mercurial Distributed SCM (version 6.5.1)` yields `6.5.1`.
pub fn version(output: &str) -> Result<String> {
    let marker = "version ";
    let start = output
        .find(marker)
        .ok_or_else(|| HgError::Parse(format!("no version marker in {output:?}")))?
        + marker.len();
    let end = output[start..]
        .find(')')
        .ok_or_else(|| HgError::Parse(format!("unterminated version in {output:?}")))?;

    Ok(output[start..start + end].to_string())
}

/// Parse `hg tags` output into tag name → (revision number, revision hash).
pub fn tags(output: &str) -> Result<BTreeMap<String, (u64, String)>> {
    let mut tags = BTreeMap::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let (name, version) = line
            .rsplit_once(char::is_whitespace)
            .ok_or_else(|| HgError::Parse(format!("malformed tags line {line:?}")))?;
        let (rev, node) = version
            .split_once(':')
            .ok_or_else(|| HgError::Parse(format!("malformed tag revision {version:?}")))?;
        let rev: u64 = rev
            .trim()
            .parse()
            .map_err(|_| HgError::Parse(format!("non-numeric tag revision {version:?}")))?;

        tags.insert(name.trim_end().to_string(), (rev, node.trim().to_string()));
    }

    Ok(tags)
}

/// Parse `hg status` output into file name → status code (`M`, `A`, `R`,
/// `?`, ...).
pub fn status(output: &str) -> Result<BTreeMap<String, char>> {
    let mut states = BTreeMap::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let mut chars = line.chars();
        let state = chars
            .next()
            .ok_or_else(|| HgError::Parse(format!("malformed status line {line:?}")))?;
        let file = chars.as_str().trim();
        if file.is_empty() {
            return Err(HgError::Parse(format!("malformed status line {line:?}")));
        }

        states.insert(file.to_string(), state);
    }

    Ok(states)
}

#[cfg(test)]
mod tests {
    use hgpipe_frame::MessageBody;
    use serde::Deserialize;

    use super::*;

    fn msg(channel: Channel, body: &str) -> Message {
        Message {
            channel,
            length: body.len() as u32,
            body: MessageBody::Text(body.to_string()),
        }
    }

    #[test]
    fn text_concatenates_output_channel_only() {
        let messages = vec![
            msg(Channel::Output, "line one\n"),
            msg(Channel::Debug, "noise"),
            msg(Channel::Output, "line two\n"),
            msg(Channel::Error, "warning: skipped"),
        ];

        assert_eq!(text(&messages), "line one\nline two\n");
    }

    #[test]
    fn json_deserializes_templated_output() {
        #[derive(Deserialize)]
        struct Branch {
            branch: String,
            active: bool,
        }

        let payload = r#"[{"branch": "default", "active": true}]"#;
        let messages = vec![msg(Channel::Output, payload)];

        let branches: Vec<Branch> = json(&messages).unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].branch, "default");
        assert!(branches[0].active);
    }

    #[test]
    fn json_rejects_non_json_output() {
        let messages = vec![msg(Channel::Output, "not json")];
        let err = json::<serde_json::Value>(&messages).unwrap_err();
        assert!(matches!(err, HgError::Json(_)));
    }

    #[test]
    fn version_extraction() {
        let out = "Mercurial Distributed SCM (version 6.5.1)\n(see https://mercurial-scm.org)";
        assert_eq!(version(out).unwrap(), "6.5.1");
    }

    #[test]
    fn version_missing_marker() {
        assert!(matches!(version("who knows"), Err(HgError::Parse(_))));
    }

    #[test]
    fn tags_parsing() {
        let out = "tip                                3:9f8b4c2d1e0a\nv1.0                               1:0a1b2c3d4e5f\n";
        let tags = tags(out).unwrap();

        assert_eq!(tags["tip"], (3, "9f8b4c2d1e0a".to_string()));
        assert_eq!(tags["v1.0"], (1, "0a1b2c3d4e5f".to_string()));
    }

    #[test]
    fn status_parsing() {
        let out = "M modified.rs\nA added.rs\n? untracked.rs\n";
        let states = status(out).unwrap();

        assert_eq!(states["modified.rs"], 'M');
        assert_eq!(states["added.rs"], 'A');
        assert_eq!(states["untracked.rs"], '?');
    }

    #[test]
    fn status_rejects_garbage() {
        assert!(matches!(status("M"), Err(HgError::Parse(_))));
    }
}
