//! Line-level helpers shared by the project parser and serializer:
//! single-line escaping, timestamps and `<!-- k: v; k: v -->` metadata comments.

use chrono::{DateTime, SecondsFormat, Utc};

const META_OPEN: &str = "<!--";
const META_CLOSE: &str = "-->";

/// Escape a free-text value so it fits on one line. Whitespace at either
/// end is written as `\u{..}` so that line trimming cannot drop it.
pub fn escape_line(s: &str) -> String {
    let start = s.len() - s.trim_start().len();
    let end = s.trim_end().len();
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if i < start || i >= end => out.push_str(&format!("\\u{{{:x}}}", u32::from(c))),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a task title for its heading. A leading `[` would otherwise read
/// as a category tag.
pub fn escape_title(s: &str) -> String {
    let escaped = escape_line(s);
    if escaped.starts_with('[') {
        format!("\\{}", escaped)
    } else {
        escaped
    }
}

/// Inverse of [`escape_line`] and [`escape_title`]. Unknown escapes are
/// kept verbatim.
pub fn unescape_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('[') => out.push('['),
            Some('u') => match code_point(chars.as_str()) {
                Some((c, len)) => {
                    out.push(c);
                    chars = chars.as_str()[len..].chars();
                }
                None => out.push_str("\\u"),
            },
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// `{hex}` at the start of `rest`, with the number of bytes it spans
fn code_point(rest: &str) -> Option<(char, usize)> {
    let body = rest.strip_prefix('{')?;
    let end = body.find('}')?;
    let hex = &body[..end];
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let c = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?;
    Some((c, end + 2))
}

/// RFC 3339 with as much sub-second precision as the value carries
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a metadata comment. Values must not contain `;`.
pub fn format_meta(pairs: &[(&str, String)]) -> String {
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} {} {}", META_OPEN, body, META_CLOSE)
}

pub fn is_meta_line(trimmed: &str) -> bool {
    trimmed.starts_with(META_OPEN)
}

/// Parse a metadata comment into key/value pairs. Returns `None` when the
/// line is not a well-formed comment; malformed pairs are dropped.
pub fn parse_meta(trimmed: &str) -> Option<Vec<(String, String)>> {
    let body = trimmed.strip_prefix(META_OPEN)?.strip_suffix(META_CLOSE)?;
    Some(
        body.split(';')
            .filter_map(|pair| {
                let (k, v) = pair.split_once(':')?;
                let k = k.trim();
                if k.is_empty() {
                    return None;
                }
                Some((k.to_string(), v.trim().to_string()))
            })
            .collect(),
    )
}
