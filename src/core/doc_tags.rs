//! core::doc_tags
//!
//! Documentation block parsing.
//!
//! # Format
//!
//! A documentation block is free text, optionally wrapped in comment
//! decoration:
//!
//! ```text
//! /**
//!  * Total amount of the order.
//!  *
//!  * @var float
//!  * @Acme::Lazy
//!  */
//! ```
//!
//! Each line is stripped of a trailing `*/` and of leading whitespace, `/`
//! and `*`. Lines that then begin with `@` are tag lines; everything before
//! the first tag line is the description.
//!
//! Tag names are case-folded. A namespaced marker such as
//! `@Acme::Lazy(true)` is recorded under its last segment (`lazy`) with the
//! parenthesized arguments as its value.
//!
//! # Example
//!
//! ```
//! use classlens::core::doc_tags::DocComment;
//!
//! let doc = DocComment::parse("/**\n * Amount\n * @var float\n * @param string $x the x\n */");
//! assert_eq!(doc.description(), "Amount");
//! assert_eq!(doc.tag_values("var"), ["float"]);
//! assert_eq!(doc.tag_values("param"), ["string $x the x"]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A parsed documentation block.
///
/// Parsing never fails; malformed input yields an empty description and
/// no tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocComment {
    description: String,
    tags: BTreeMap<String, Vec<String>>,
}

impl DocComment {
    /// Parse a documentation block from scratch.
    pub fn parse(text: &str) -> Self {
        let mut description = Vec::new();
        let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for raw in text.lines() {
            let line = strip_decoration(raw);

            if line.starts_with('@') {
                let (name, value) = split_tag(line);
                if name.is_empty() {
                    continue;
                }
                let values = tags.entry(name).or_default();
                match value {
                    Some(value) => values.push(value),
                    // A bare repeat resets the tag.
                    None => values.clear(),
                }
            } else if tags.is_empty() {
                description.push(line);
            }
        }

        Self {
            description: description.join("\n").trim().to_string(),
            tags,
        }
    }

    /// Parse an optional documentation block.
    pub fn parse_opt(text: Option<&str>) -> Self {
        text.map(Self::parse).unwrap_or_default()
    }

    /// The free-text description preceding the first tag.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// All tags with their values.
    pub fn tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.tags
    }

    /// Consume the comment, returning its tags.
    pub fn into_tags(self) -> BTreeMap<String, Vec<String>> {
        self.tags
    }

    /// Whether the tag occurs at least once.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// Values recorded for a tag, empty if absent.
    pub fn tag_values(&self, name: &str) -> &[String] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn strip_decoration(raw: &str) -> &str {
    let line = raw.trim_end();
    let line = line.strip_suffix("*/").unwrap_or(line);
    line.trim_start_matches(|c: char| c.is_whitespace() || c == '/' || c == '*')
        .trim_end()
}

/// Split a tag line (starting with `@`) into name and optional value.
fn split_tag(line: &str) -> (String, Option<String>) {
    let body = &line[1..];

    if let Some((name, args)) = namespaced_marker(body) {
        return (name.to_lowercase(), args.map(clean_value));
    }

    let (name, rest) = match body.find(char::is_whitespace) {
        Some(index) => (&body[..index], Some(&body[index..])),
        None => (body, None),
    };

    let value = rest.map(clean_value).filter(|v| !v.is_empty());
    (name.to_lowercase(), value)
}

/// Match `Ns::Name` or `Ns::Name(args)` spanning the whole body.
fn namespaced_marker(body: &str) -> Option<(&str, Option<&str>)> {
    let (path, args) = match body.find('(') {
        Some(open) => {
            let args = body[open + 1..].strip_suffix(')')?;
            (&body[..open], Some(args))
        }
        None => (body, None),
    };

    if !path.contains("::") {
        return None;
    }
    let valid = path
        .split("::")
        .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric()));
    if !valid {
        return None;
    }

    let name = path.rsplit("::").next()?;
    Some((name, args))
}

fn clean_value(value: &str) -> String {
    value
        .trim_matches(|c: char| c.is_whitespace() || c == '"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        let doc = DocComment::parse("");
        assert_eq!(doc.description(), "");
        assert!(doc.tags().is_empty());
        assert_eq!(DocComment::parse_opt(None), DocComment::default());
    }

    #[test]
    fn description_only() {
        let doc = DocComment::parse("/**\n * First line\n *\n * Second line\n */");
        assert_eq!(doc.description(), "First line\n\nSecond line");
        assert!(doc.tags().is_empty());
    }

    #[test]
    fn tags_are_case_folded() {
        let doc = DocComment::parse("/** @Var Integer */");
        assert_eq!(doc.tag_values("var"), ["Integer"]);
    }

    #[test]
    fn valueless_tag_recorded_empty() {
        let doc = DocComment::parse("/**\n * @transient\n */");
        assert!(doc.has_tag("transient"));
        assert!(doc.tag_values("transient").is_empty());
    }

    #[test]
    fn repeated_tags_accumulate() {
        let doc = DocComment::parse("/**\n * @param string $a first\n * @param int $b\n */");
        assert_eq!(doc.tag_values("param"), ["string $a first", "int $b"]);
    }

    #[test]
    fn valueless_repeat_resets_values() {
        let doc = DocComment::parse("/**\n * @var int\n * @var\n */");
        assert!(doc.has_tag("var"));
        assert!(doc.tag_values("var").is_empty());

        let doc = DocComment::parse("/**\n * @var\n * @var int\n */");
        assert_eq!(doc.tag_values("var"), ["int"]);
    }

    #[test]
    fn quotes_trimmed() {
        let doc = DocComment::parse("/** @see \"Some Reference\" */");
        assert_eq!(doc.tag_values("see"), ["Some Reference"]);
    }

    #[test]
    fn text_after_first_tag_is_not_description() {
        let doc = DocComment::parse("/**\n * Intro\n * @var int\n * trailing prose\n */");
        assert_eq!(doc.description(), "Intro");
        assert_eq!(doc.tag_values("var"), ["int"]);
    }

    #[test]
    fn namespaced_markers() {
        let doc = DocComment::parse("/**\n * @Acme::Lazy\n * @Acme::Scope(\"singleton\")\n */");
        assert!(doc.has_tag("lazy"));
        assert!(doc.tag_values("lazy").is_empty());
        assert_eq!(doc.tag_values("scope"), ["singleton"]);
    }

    #[test]
    fn email_in_prose_is_not_a_tag() {
        let doc = DocComment::parse("/**\n * Contact admin@example.com\n */");
        assert_eq!(doc.description(), "Contact admin@example.com");
        assert!(doc.tags().is_empty());
    }

    #[test]
    fn parse_is_idempotent() {
        let text = "/**\n * Desc\n * @var array<int>\n * @api\n */";
        assert_eq!(DocComment::parse(text), DocComment::parse(text));
    }
}
