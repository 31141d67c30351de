//! Detection of tool-output payloads embedded in model prose.
//!
//! The agent echoes tool results into its text stream as a brace-delimited
//! record, e.g. `{'path': '/tmp/out.csv', 'message': 'done'}`. Spotting them
//! is a heuristic: nested braces are not supported and prose that happens to
//! look like such a record will be split out as well.

use agentline_types::{Message, Sender};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Finds the first embedded tool-output payload in a text.
pub trait ToolOutputMatcher: Send + Sync {
    /// Byte range of the first payload in `text`, if any.
    fn find(&self, text: &str) -> Option<Range<usize>>;
}

/// Brace-delimited record containing a quoted `path` key.
static PATH_PAYLOAD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{[^{}]*?['"]path['"]\s*:[^{}]*\}"#).unwrap()
});

/// Default matcher: a `{...}` record naming a `path` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPayloadMatcher;

impl ToolOutputMatcher for PathPayloadMatcher {
    fn find(&self, text: &str) -> Option<Range<usize>> {
        PATH_PAYLOAD_REGEX.find(text).map(|m| m.range())
    }
}

/// Quoted `path` or `csv_file` key with a quoted value.
static FILE_FIELD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"](path|csv_file)['"]\s*:\s*(?:'([^']*)'|"([^"]*)")"#).unwrap()
});

/// File a tool payload refers to: its `path` field, else its `csv_file`
/// field. Empty values are skipped.
pub fn file_reference(payload: &str) -> Option<&str> {
    let mut csv_file = None;

    for caps in FILE_FIELD_REGEX.captures_iter(payload) {
        let Some(value) = caps.get(2).or_else(|| caps.get(3)) else {
            continue;
        };
        if value.as_str().is_empty() {
            continue;
        }
        match &caps[1] {
            "path" => return Some(value.as_str()),
            _ => {
                csv_file.get_or_insert(value.as_str());
            }
        }
    }

    csv_file
}

/// File named by the most recent tool message that names one.
pub fn latest_file_reference(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|m| m.sender == Sender::Tool)
        .find_map(|m| file_reference(&m.content))
}

impl<F> ToolOutputMatcher for F
where
    F: Fn(&str) -> Option<Range<usize>> + Send + Sync,
{
    fn find(&self, text: &str) -> Option<Range<usize>> {
        self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(text: &str) -> Option<&str> {
        PathPayloadMatcher.find(text).map(|r| &text[r])
    }

    #[test]
    fn test_python_style_record() {
        let text = "{'path': '/tmp/out.csv', 'message': 'done'}";
        assert_eq!(matched(text), Some(text));
    }

    #[test]
    fn test_json_style_record_with_surrounding_prose() {
        let text = r#"Saved {"message": "ok", "path": "/data/leads.csv"} for you"#;
        assert_eq!(matched(text), Some(r#"{"message": "ok", "path": "/data/leads.csv"}"#));
    }

    #[test]
    fn test_records_without_path_are_ignored() {
        assert_eq!(matched("{'message': 'done'}"), None);
        assert_eq!(matched("the path is clear"), None);
        assert_eq!(matched("{'path' '/tmp/x'}"), None);
    }

    #[test]
    fn test_incomplete_record_is_not_matched() {
        assert_eq!(matched("{'path': '/tmp/out"), None);
    }

    #[test]
    fn test_first_of_two_records() {
        let text = "{'path': 'a'} and {'path': 'b'}";
        assert_eq!(matched(text), Some("{'path': 'a'}"));
    }

    #[test]
    fn test_file_reference_prefers_path() {
        assert_eq!(
            file_reference("{'csv_file': '/tmp/raw.csv', 'path': '/tmp/out.csv'}"),
            Some("/tmp/out.csv")
        );
        assert_eq!(
            file_reference(r#"{"message": "ok", "path": "/data/leads.csv"}"#),
            Some("/data/leads.csv")
        );
    }

    #[test]
    fn test_file_reference_falls_back_to_csv_file() {
        assert_eq!(
            file_reference("{'path': '', 'csv_file': '/tmp/raw.csv'}"),
            Some("/tmp/raw.csv")
        );
        assert_eq!(
            file_reference(r#"{"csv_file": "/tmp/raw.csv"}"#),
            Some("/tmp/raw.csv")
        );
    }

    #[test]
    fn test_file_reference_absent() {
        assert_eq!(file_reference("{'message': 'done'}"), None);
        assert_eq!(file_reference("{'path': ''}"), None);
        assert_eq!(file_reference("{'path': None}"), None);
    }

    #[test]
    fn test_latest_file_reference_skips_other_senders() {
        let messages = vec![
            Message::human("{'path': '/tmp/typed.csv'}"),
            Message::tool("{'path': '/tmp/first.csv'}"),
            Message::ai("done"),
            Message::tool("{'message': 'no file'}"),
            Message::tool("{'csv_file': '/tmp/second.csv'}"),
            Message::ai("{'path': '/tmp/prose.csv'}"),
        ];
        assert_eq!(latest_file_reference(&messages), Some("/tmp/second.csv"));
        assert_eq!(latest_file_reference(&messages[..3]), Some("/tmp/first.csv"));
        assert_eq!(latest_file_reference(&messages[..1]), None);
    }

    #[test]
    fn test_closure_matcher() {
        let matcher = |text: &str| text.find("@@").map(|i| i..i + 2);
        assert_eq!(matcher.find("ab@@cd"), Some(2..4));
    }
}
