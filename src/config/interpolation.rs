//! Placeholder substitution for step commands.
//!
//! Commands may reference section defaults using `{{key}}` syntax.
//!
//! # Syntax
//!
//! - `{{key}}` - replaced with the value of `key` in the mapping
//! - `{{unknown}}` - left as-is when `unknown` is not in the mapping
//!
//! Substitution is a single left-to-right pass: a substituted value is never
//! scanned again, so a value containing `{{other}}` stays literal.
//!
//! # Example
//!
//! ```
//! use jump_in::config::{replace_placeholders, Delimiters};
//! use std::collections::BTreeMap;
//!
//! let mut map = BTreeMap::new();
//! map.insert("name".to_string(), "World".to_string());
//! let out = replace_placeholders("Hello, {{name}}!", &map, &Delimiters::default());
//! assert_eq!(out, "Hello, World!");
//! ```

use crate::config::schema::value_kind;
use crate::error::{JumpInError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Opening and closing markers around a placeholder key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

impl Delimiters {
    /// Create custom delimiters.
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// A substitutable template: one string, or an argv-style sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    Text(String),
    Sequence(Vec<String>),
}

impl Template {
    /// Substitute every known placeholder, preserving the template's shape.
    pub fn substitute(&self, values: &BTreeMap<String, String>, delims: &Delimiters) -> Self {
        match self {
            Self::Text(text) => Self::Text(replace_placeholders(text, values, delims)),
            Self::Sequence(items) => Self::Sequence(
                items
                    .iter()
                    .map(|item| replace_placeholders(item, values, delims))
                    .collect(),
            ),
        }
    }

    /// Whether the template carries no command text at all.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Sequence(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }
}

impl TryFrom<&Value> for Template {
    type Error = JumpInError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Self::Text(text.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(invalid_type(other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Sequence),
            other => Err(invalid_type(other)),
        }
    }
}

fn invalid_type(value: &Value) -> JumpInError {
    JumpInError::InvalidInputType {
        message: format!(
            "expected a string or a list of strings, found {}",
            value_kind(value)
        ),
    }
}

/// Substitute placeholders in a dynamically-typed value.
///
/// # Errors
///
/// Returns `InvalidInputType` unless `value` is a string or an array of strings.
pub fn substitute_value(
    value: &Value,
    values: &BTreeMap<String, String>,
    delims: &Delimiters,
) -> Result<Template> {
    Ok(Template::try_from(value)?.substitute(values, delims))
}

/// Replace `open + key + close` with the mapped value for every known key.
pub fn replace_placeholders(
    input: &str,
    values: &BTreeMap<String, String>,
    delims: &Delimiters,
) -> String {
    if values.is_empty() || delims.open.is_empty() || delims.close.is_empty() {
        return input.to_string();
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(&delims.open) {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + delims.open.len()..];

        let replaced = after_open.find(&delims.close).and_then(|end| {
            values
                .get(&after_open[..end])
                .map(|value| (value, end + delims.close.len()))
        });

        match replaced {
            Some((value, consumed)) => {
                result.push_str(value);
                rest = &after_open[consumed..];
            }
            None => {
                // No match: emit one character and rescan from the next
                let skip = delims.open.chars().next().map_or(1, char::len_utf8);
                result.push_str(&rest[start..start + skip]);
                rest = &rest[start + skip..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Collect every placeholder key referenced by `input`.
pub fn extract_placeholders(input: &str, delims: &Delimiters) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    if delims.open.is_empty() || delims.close.is_empty() {
        return keys;
    }

    let mut rest = input;
    while let Some(start) = rest.find(&delims.open) {
        let after_open = &rest[start + delims.open.len()..];
        let skip = delims.open.chars().next().map_or(1, char::len_utf8);

        // A longer run of opener characters: the placeholder starts further in
        if after_open.starts_with(&delims.open[..skip]) {
            rest = &rest[start + skip..];
            continue;
        }

        match after_open.find(&delims.close) {
            Some(end) => {
                let key = &after_open[..end];
                if !key.is_empty() && !key.contains(&delims.open) {
                    keys.insert(key.to_string());
                }
                rest = &after_open[end + delims.close.len()..];
            }
            None => break,
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_single_placeholder() {
        let out = replace_placeholders(
            "Hello, {{name}}!",
            &map(&[("name", "World")]),
            &Delimiters::default(),
        );
        assert_eq!(out, "Hello, World!");
    }

    #[test]
    fn replaces_sequence_elementwise() {
        let template = Template::Sequence(vec!["{{greeting}}, {{name}}!".to_string()]);
        let out = template.substitute(
            &map(&[("greeting", "Hi"), ("name", "Alice")]),
            &Delimiters::default(),
        );
        assert_eq!(out, Template::Sequence(vec!["Hi, Alice!".to_string()]));
    }

    #[test]
    fn unknown_keys_stay_literal() {
        let out = replace_placeholders(
            "cd {{directory}} && {{missing}}",
            &map(&[("directory", "/tmp")]),
            &Delimiters::default(),
        );
        assert_eq!(out, "cd /tmp && {{missing}}");
    }

    #[test]
    fn repeated_placeholders_all_replaced() {
        let out = replace_placeholders("{{a}}-{{a}}-{{a}}", &map(&[("a", "x")]), &Delimiters::default());
        assert_eq!(out, "x-x-x");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let values = map(&[("a", "{{b}}"), ("b", "boom")]);
        let out = replace_placeholders("{{a}} {{b}}", &values, &Delimiters::default());
        assert_eq!(out, "{{b}} boom");
    }

    #[test]
    fn stray_opener_before_real_placeholder() {
        let out = replace_placeholders("{{ {{name}}", &map(&[("name", "n")]), &Delimiters::default());
        assert_eq!(out, "{{ n");
    }

    #[test]
    fn placeholder_inside_extra_braces() {
        let values = map(&[("name", "X")]);
        let delims = Delimiters::default();

        assert_eq!(replace_placeholders("{{{name}}}", &values, &delims), "{X}");
        assert_eq!(replace_placeholders("${{{name}}}", &values, &delims), "${X}");
        assert_eq!(replace_placeholders("{{{{name}}}}", &values, &delims), "{{X}}");
        assert_eq!(replace_placeholders("{{{other}}}", &values, &delims), "{{{other}}}");
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        let out = replace_placeholders("echo {{name", &map(&[("name", "n")]), &Delimiters::default());
        assert_eq!(out, "echo {{name");
    }

    #[test]
    fn custom_delimiters() {
        let delims = Delimiters::new("<%", "%>");
        let out = replace_placeholders("ls <%dir%> {{dir}}", &map(&[("dir", "/srv")]), &delims);
        assert_eq!(out, "ls /srv {{dir}}");
    }

    #[test]
    fn empty_mapping_is_identity() {
        let input = "run {{anything}} here";
        assert_eq!(
            replace_placeholders(input, &BTreeMap::new(), &Delimiters::default()),
            input
        );
    }

    #[test]
    fn second_pass_with_empty_mapping_is_noop() {
        let values = map(&[("name", "World"), ("dir", "/tmp")]);
        let delims = Delimiters::default();
        for input in ["Hello, {{name}}!", "{{dir}}/{{other}}", "plain", ""] {
            let once = replace_placeholders(input, &values, &delims);
            let twice = replace_placeholders(&once, &BTreeMap::new(), &delims);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn text_without_tokens_is_unchanged() {
        let values = map(&[("x", "1"), ("y", "2")]);
        for input in ["echo hi", "a { b } c", "}} {", "$HOME/${x}"] {
            assert_eq!(
                replace_placeholders(input, &values, &Delimiters::default()),
                input
            );
        }
    }

    #[test]
    fn substitute_value_accepts_string_and_list() {
        let values = map(&[("name", "World")]);
        let delims = Delimiters::default();

        let text = substitute_value(&json!("Hello, {{name}}!"), &values, &delims).unwrap();
        assert_eq!(text, Template::Text("Hello, World!".to_string()));

        let list = substitute_value(&json!(["echo", "{{name}}"]), &values, &delims).unwrap();
        assert_eq!(
            list,
            Template::Sequence(vec!["echo".to_string(), "World".to_string()])
        );
    }

    #[test]
    fn substitute_value_rejects_integer() {
        let result = substitute_value(&json!(123), &BTreeMap::new(), &Delimiters::default());
        assert!(matches!(result, Err(JumpInError::InvalidInputType { .. })));
    }

    #[test]
    fn substitute_value_rejects_mixed_list() {
        let result = substitute_value(&json!(["echo", 1]), &BTreeMap::new(), &Delimiters::default());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn blank_templates_detected() {
        assert!(Template::Text("   ".into()).is_blank());
        assert!(Template::Sequence(vec![]).is_blank());
        assert!(!Template::Sequence(vec!["ls".into()]).is_blank());
    }

    #[test]
    fn extract_lists_unique_keys() {
        let keys = extract_placeholders("{{a}} {{b}} {{a}} {{", &Delimiters::default());
        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn extract_finds_key_inside_extra_braces() {
        let keys = extract_placeholders("echo ${{{directory}}}", &Delimiters::default());
        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["directory".to_string()]
        );
    }
}
