// Media body codec for Agora
// Non-text messages multiplex a resource URL, a bracketed kind label with
// the file name, and a free-text description into the body, one item per
// line. The format is shared with the remote store and must be reproduced
// exactly; keep all knowledge of it behind this module.

use once_cell::sync::Lazy;
use regex::Regex;

/// Transient marker carried by the placeholder body of an upload still in
/// flight. A line containing it is never read back as description.
pub const UPLOADING_MARKER: &str = "(uploading...)";

// `[<label>] <file name>`
static LABEL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]+)\] (.+)$").unwrap());

/// Decoded view of a media body. Every component is optional; the decoder
/// never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPayload {
    pub url: Option<String>,
    pub label: Option<String>,
    pub file_name: Option<String>,
    pub description: Option<String>,
}

fn is_url_line(line: &str) -> bool {
    (line.starts_with("http://") || line.starts_with("https://"))
        && !line.contains(char::is_whitespace)
}

/// Produce a body from the payload: bracket-label line, URL line,
/// description line, in that order, omitting absent components.
pub fn encode(payload: &MediaPayload) -> String {
    let mut lines = Vec::new();
    if let Some(file_name) = &payload.file_name {
        let label = payload.label.as_deref().unwrap_or("file");
        lines.push(format!("[{}] {}", label, file_name));
    }
    if let Some(url) = &payload.url {
        lines.push(url.clone());
    }
    if let Some(description) = &payload.description {
        if !description.is_empty() {
            lines.push(description.clone());
        }
    }
    lines.join("\n")
}

/// Placeholder body for an optimistic file message: no URL yet, just the
/// label line and the in-flight marker.
pub fn encode_uploading(label: &str, file_name: &str) -> String {
    format!("[{}] {}\n{}", label, file_name, UPLOADING_MARKER)
}

pub fn is_uploading(body: &str) -> bool {
    body.contains(UPLOADING_MARKER)
}

/// Scan every line and classify it independently; line order carries no
/// meaning. At most one URL and one bracket label are expected, but bodies
/// with zero or several of either must decode without failing: the first
/// match of each kind wins, later ones are dropped.
pub fn decode(body: &str) -> MediaPayload {
    let mut payload = MediaPayload::default();
    for raw in body.lines() {
        let line = raw.trim();
        if line.is_empty() || line.contains(UPLOADING_MARKER) {
            continue;
        }
        if is_url_line(line) {
            if payload.url.is_none() {
                payload.url = Some(line.to_string());
            }
            continue;
        }
        if let Some(caps) = LABEL_LINE.captures(line) {
            if payload.label.is_none() {
                payload.label = Some(caps[1].to_string());
                payload.file_name = Some(caps[2].to_string());
            }
            continue;
        }
        if payload.description.is_none() {
            payload.description = Some(line.to_string());
        }
    }
    payload
}
