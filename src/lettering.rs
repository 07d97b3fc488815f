//! Lettering literals: captions and speech balloons for a panel.
//!
//! Manifests carry lettering as a JSON-like literal with bare keys, the way
//! an author would type it:
//!
//! ```text
//! [{type: "caption", text: "Night falls.", position: {top: 20, left: 20}},
//!  {type: "speech", text: "Who's there?", position: {bottom: "12%", right: 30}}]
//! ```
//!
//! Bare keys directly after `{` or `,` are quoted, then the result is parsed
//! as JSON. A single object is accepted in place of a list. Numeric positions
//! are pixels; string positions are used as written (`"12%"`, `"3em"`).
//!
//! Known limitation: the key quoting is purely textual, so a string value
//! that itself contains `, word:` is rewritten too and usually fails to
//! parse. There is no escape for this.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;

static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("valid bare key pattern")
});

#[derive(Error, Debug)]
pub enum LetteringError {
    #[error("Lettering parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetteringKind {
    Caption,
    #[serde(alias = "balloon", alias = "dialogue")]
    Speech,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LetteringItem {
    #[serde(alias = "type")]
    pub kind: LetteringKind,
    pub text: String,
    #[serde(default)]
    pub position: Position,
}

/// Offsets from the panel edges.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Position {
    pub top: Option<CssLength>,
    pub left: Option<CssLength>,
    pub bottom: Option<CssLength>,
    pub right: Option<CssLength>,
}

impl Position {
    /// Inline CSS declarations, e.g. `top: 20px; left: 5%;`.
    pub fn to_css(&self) -> String {
        [
            ("top", &self.top),
            ("left", &self.left),
            ("bottom", &self.bottom),
            ("right", &self.right),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {};", v.to_css())))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CssLength {
    Number(f64),
    Text(String),
}

impl CssLength {
    pub fn to_css(&self) -> String {
        match self {
            CssLength::Number(n) => format!("{n}px"),
            // Keep a value inside its own declaration
            CssLength::Text(s) => s.trim().replace([';', '{', '}'], ""),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<LetteringItem>),
    One(LetteringItem),
}

/// Quote bare object keys so the literal becomes JSON.
pub fn normalize(raw: &str) -> String {
    BARE_KEY.replace_all(raw, r#"$1"$2":"#).into_owned()
}

/// Parse a lettering literal. An empty literal is no lettering.
pub fn parse(raw: &str) -> Result<Vec<LetteringItem>, LetteringError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items = match serde_json::from_str::<OneOrMany>(&normalize(raw))? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    };
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_keys_are_quoted() {
        assert_eq!(
            normalize(r#"{type: "caption", text: "hi"}"#),
            r#"{"type": "caption", "text": "hi"}"#
        );
    }

    #[test]
    fn quoted_keys_untouched() {
        let json = r#"{"type": "caption", "text": "hi"}"#;
        assert_eq!(normalize(json), json);
    }

    #[test]
    fn parses_caption_and_speech_list() {
        let raw = r#"[{type: "caption", text: "Night falls.", position: {top: 20, left: 20}},
                     {type: "speech", text: "Who's there?", position: {bottom: "12%", right: 30}}]"#;
        let items = parse(raw).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, LetteringKind::Caption);
        assert_eq!(items[0].text, "Night falls.");
        assert_eq!(items[0].position.to_css(), "top: 20px; left: 20px;");
        assert_eq!(items[1].kind, LetteringKind::Speech);
        assert_eq!(items[1].position.to_css(), "bottom: 12%; right: 30px;");
    }

    #[test]
    fn single_object_is_one_item() {
        let items = parse(r#"{kind: "speech", text: "Hey!"}"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].position, Position::default());
    }

    #[test]
    fn balloon_alias_is_speech() {
        let items = parse(r#"{type: "balloon", text: "x"}"#).unwrap();
        assert_eq!(items[0].kind, LetteringKind::Speech);
    }

    #[test]
    fn empty_literal_is_no_lettering() {
        assert!(parse("  ").unwrap().is_empty());
        assert!(parse("[]").unwrap().is_empty());
    }

    #[test]
    fn bare_values_fail() {
        assert!(parse(r#"{type: caption, text: "x"}"#).is_err());
    }

    #[test]
    fn unknown_kind_fails() {
        assert!(parse(r#"{type: "thought", text: "x"}"#).is_err());
    }

    #[test]
    fn key_like_text_in_values_is_a_known_limitation() {
        // ", said:" inside the string gets quoted as if it were a key
        let raw = r#"{type: "speech", text: "Well, said: no"}"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn fractional_and_text_lengths() {
        assert_eq!(CssLength::Number(12.5).to_css(), "12.5px");
        assert_eq!(CssLength::Text(" 3em ".into()).to_css(), "3em");
        assert_eq!(CssLength::Text("1px; color: red".into()).to_css(), "1px color: red");
    }
}
