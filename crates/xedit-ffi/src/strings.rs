//! UTF-16 marshalling and decoding of the engine's textual result formats.

use rustc_hash::FxHashMap;
use xedit_core::{XEditError, XEditResult};

/// Encode a host string as a nul-terminated wide string.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode exactly `units`, stopping early at an embedded nul.
pub fn from_wide(units: &[u16]) -> XEditResult<String> {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16(&units[..end]).map_err(|e| XEditError::Decode(e.to_string()))
}

/// Decode for diagnostics, replacing invalid sequences.
pub fn from_wide_lossy(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// Split a `\r\n` separated string array. An empty result is an empty list.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a comma separated flag list.
pub fn split_commas(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key=value` lines.
pub fn parse_dict(text: &str) -> FxHashMap<String, String> {
    split_lines(text)
        .into_iter()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}

/// Join a list the way the engine expects string arrays as input.
pub fn join_lines<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\r\n")
}
