use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

pub type TokenTreeResult<T> = std::result::Result<T, TokenTreeError>;

#[derive(Debug, Error)]
pub enum TokenTreeError {
    #[error("failed to parse token tree")]
    Parse(#[from] serde_json::Error),
    #[error("token tree root must be an object")]
    NotAnObject,
    #[error(
        "ambiguous token node at `{path}`: a token needs both `type` and a non-empty `value` \
         (write a numeric zero as the string \"0\")"
    )]
    AmbiguousNode { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    Color,
    BoxShadow,
    FontFamilies,
    Other(String),
}

impl TokenType {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "color" => Self::Color,
            "boxShadow" => Self::BoxShadow,
            "fontFamilies" => Self::FontFamilies,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Color => "color",
            Self::BoxShadow => "boxShadow",
            Self::FontFamilies => "fontFamilies",
            Self::Other(tag) => tag,
        }
    }
}

/// One shadow record, fields already rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowLayer {
    pub x: String,
    pub y: String,
    pub blur: String,
    pub spread: String,
    pub color: Option<String>,
    pub inset: bool,
}

impl fmt::Display for ShadowLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inset {
            f.write_str("inset ")?;
        }
        write!(
            f,
            "{}px {}px {}px {}px",
            self.x, self.y, self.blur, self.spread
        )?;
        if let Some(color) = &self.color {
            write!(f, " {color}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowEntry {
    Layer(ShadowLayer),
    Verbatim(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// Plain string or number.
    Text(String),
    /// `{a.b.c}`, stored without braces.
    Reference(String),
    Shadow(ShadowLayer),
    Shadows(Vec<ShadowEntry>),
    /// Array of scalars, e.g. a font stack.
    List(Vec<String>),
    Raw(Value),
}

impl TokenValue {
    /// CSS text of the value. References keep their braces; only the
    /// converter rewrites them.
    pub fn to_css(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Reference(path) => format!("{{{path}}}"),
            Self::Shadow(layer) => layer.to_string(),
            Self::Shadows(entries) => entries
                .iter()
                .map(|entry| match entry {
                    ShadowEntry::Layer(layer) => layer.to_string(),
                    ShadowEntry::Verbatim(text) => text.clone(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Self::List(items) => items.join(","),
            Self::Raw(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: TokenValue,
    pub kind: TokenType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenNode {
    Group(TokenTree),
    Token(Token),
}

/// Nested token groups in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenTree {
    nodes: IndexMap<String, TokenNode>,
}

impl TokenTree {
    pub fn from_json(document: &str) -> TokenTreeResult<Self> {
        let value: Value = serde_json::from_str(document)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> TokenTreeResult<Self> {
        let object = value.as_object().ok_or(TokenTreeError::NotAnObject)?;
        let mut path = Vec::new();
        parse_group(object, &mut path)
    }

    pub fn get(&self, key: &str) -> Option<&TokenNode> {
        self.nodes.get(key)
    }

    pub fn group(&self, key: &str) -> Option<&TokenTree> {
        match self.nodes.get(key) {
            Some(TokenNode::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenNode)> {
        self.nodes.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Follows `path` through nested groups to a token.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&Token> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for part in parents {
            current = current.group(part.as_ref())?;
        }
        match current.get(last.as_ref())? {
            TokenNode::Token(token) => Some(token),
            TokenNode::Group(_) => None,
        }
    }

    /// Every token, depth first in document order, with its full path.
    pub fn leaves(&self) -> Vec<(Vec<String>, &Token)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_leaves(&mut path, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'a Token)>) {
        for (key, node) in &self.nodes {
            path.push(key.clone());
            match node {
                TokenNode::Token(token) => out.push((path.clone(), token)),
                TokenNode::Group(group) => group.collect_leaves(path, out),
            }
            path.pop();
        }
    }

    pub fn token_count(&self) -> usize {
        self.nodes
            .values()
            .map(|node| match node {
                TokenNode::Token(_) => 1,
                TokenNode::Group(group) => group.token_count(),
            })
            .sum()
    }
}

/// `--a-b-c` for the token at `a.b.c`.
pub fn variable_name<S: AsRef<str>>(path: &[S]) -> String {
    let joined: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
    format!("--{}", joined.join("-"))
}

pub fn dotted_path<S: AsRef<str>>(path: &[S]) -> String {
    let joined: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
    joined.join(".")
}

fn parse_group(object: &Map<String, Value>, path: &mut Vec<String>) -> TokenTreeResult<TokenTree> {
    let mut nodes = IndexMap::with_capacity(object.len());
    for (key, child) in object {
        path.push(key.clone());
        let parsed = match child {
            Value::Object(child_object) => Some(parse_node(child_object, path)?),
            _ => {
                tracing::debug!(path = %dotted_path(path), "skipping non-object entry in token tree");
                None
            }
        };
        path.pop();
        if let Some(node) = parsed {
            nodes.insert(key.clone(), node);
        }
    }
    Ok(TokenTree { nodes })
}

fn parse_node(object: &Map<String, Value>, path: &mut Vec<String>) -> TokenTreeResult<TokenNode> {
    match (object.get("value"), object.get("type")) {
        (None, None) => Ok(TokenNode::Group(parse_group(object, path)?)),
        (Some(value), Some(Value::String(tag))) if is_truthy(value) => {
            let kind = TokenType::from_tag(tag);
            let value = parse_value(&kind, value);
            Ok(TokenNode::Token(Token { value, kind }))
        }
        _ => Err(TokenTreeError::AmbiguousNode {
            path: dotted_path(path),
        }),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn parse_value(kind: &TokenType, value: &Value) -> TokenValue {
    match value {
        Value::String(text) => match text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            Some(reference) => TokenValue::Reference(reference.to_string()),
            None => TokenValue::Text(text.clone()),
        },
        Value::Number(number) => TokenValue::Text(number.to_string()),
        Value::Object(object) if *kind == TokenType::BoxShadow && object.contains_key("x") => {
            TokenValue::Shadow(parse_shadow(object))
        }
        Value::Array(items) if *kind == TokenType::BoxShadow => TokenValue::Shadows(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(object) if object.contains_key("x") => {
                        ShadowEntry::Layer(parse_shadow(object))
                    }
                    other => ShadowEntry::Verbatim(scalar_text(other)),
                })
                .collect(),
        ),
        Value::Array(items) if items.iter().all(is_scalar) => {
            TokenValue::List(items.iter().map(scalar_text).collect())
        }
        other => TokenValue::Raw(other.clone()),
    }
}

fn parse_shadow(object: &Map<String, Value>) -> ShadowLayer {
    let field = |name: &str| {
        object
            .get(name)
            .filter(|value| !value.is_null())
            .map(scalar_text)
    };
    ShadowLayer {
        x: field("x").unwrap_or_else(|| "0".to_string()),
        y: field("y").unwrap_or_else(|| "0".to_string()),
        blur: field("blur").unwrap_or_else(|| "0".to_string()),
        spread: field("spread").unwrap_or_else(|| "0".to_string()),
        color: field("color"),
        inset: object.get("type").and_then(Value::as_str) == Some("innerShadow"),
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r##"{
        "color": {
            "primary": {
                "base": { "value": "#3b82f6", "type": "color" },
                "light": { "value": "{color.secondary.100}", "type": "color" }
            },
            "$description": "palette"
        },
        "shadow": {
            "md": {
                "value": [
                    { "x": 0, "y": 4, "blur": 6, "spread": -1, "color": "rgba(0,0,0,0.1)" },
                    { "x": 0, "y": 2, "blur": 4, "spread": -2, "color": "rgba(0,0,0,0.1)", "type": "innerShadow" }
                ],
                "type": "boxShadow"
            }
        },
        "$themes": []
    }"##;

    #[test]
    fn from_json_builds_groups_and_tokens_in_document_order() {
        let tree = TokenTree::from_json(TREE).expect("tree should parse");
        assert_eq!(tree.keys().collect::<Vec<_>>(), ["color", "shadow"]);
        assert_eq!(tree.token_count(), 3);

        let leaves: Vec<String> = tree
            .leaves()
            .into_iter()
            .map(|(path, _)| dotted_path(&path))
            .collect();
        assert_eq!(
            leaves,
            ["color.primary.base", "color.primary.light", "shadow.md"]
        );
    }

    #[test]
    fn from_json_parses_references_and_shadows() {
        let tree = TokenTree::from_json(TREE).expect("tree should parse");
        let light = tree
            .resolve(&["color", "primary", "light"])
            .expect("light token resolves");
        assert_eq!(light.kind, TokenType::Color);
        assert_eq!(
            light.value,
            TokenValue::Reference("color.secondary.100".to_string())
        );

        let shadow = tree.resolve(&["shadow", "md"]).expect("shadow resolves");
        let TokenValue::Shadows(entries) = &shadow.value else {
            panic!("expected shadow list, got {:?}", shadow.value);
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            shadow.value.to_css(),
            "0px 4px 6px -1px rgba(0,0,0,0.1), inset 0px 2px 4px -2px rgba(0,0,0,0.1)"
        );
    }

    #[test]
    fn resolve_rejects_groups_and_missing_paths() {
        let tree = TokenTree::from_json(TREE).expect("tree should parse");
        assert!(tree.resolve(&["color", "primary"]).is_none());
        assert!(tree.resolve(&["color", "accent"]).is_none());
        assert!(tree.resolve::<&str>(&[]).is_none());
    }

    #[test]
    fn from_json_rejects_half_tokens() {
        for (document, expected) in [
            (r#"{"spacing": {"sm": {"value": "4px"}}}"#, "spacing.sm"),
            (r#"{"spacing": {"sm": {"type": "dimension"}}}"#, "spacing.sm"),
            (r#"{"spacing": {"none": {"value": 0, "type": "dimension"}}}"#, "spacing.none"),
            (r#"{"a": {"b": {"value": "", "type": "color"}}}"#, "a.b"),
        ] {
            let err = TokenTree::from_json(document).expect_err("ambiguous node should fail");
            assert!(
                matches!(&err, TokenTreeError::AmbiguousNode { path } if path == expected),
                "{document}: {err:?}"
            );
        }
    }

    #[test]
    fn zero_valued_token_error_explains_string_zero() {
        let err = TokenTree::from_json(r#"{"opacity": {"0": {"value": 0, "type": "opacity"}}}"#)
            .expect_err("numeric zero should be rejected");
        let message = err.to_string();
        assert!(message.contains("`opacity.0`"), "{message}");
        assert!(message.contains(r#"the string "0""#), "{message}");

        let tree = TokenTree::from_json(r#"{"opacity": {"0": {"value": "0", "type": "opacity"}}}"#)
            .expect("string zero should parse");
        assert_eq!(tree.token_count(), 1);
    }

    #[test]
    fn scalar_arrays_become_lists() {
        let tree = TokenTree::from_json(
            r#"{"font": {"family": {"sans": {"value": ["Inter", "sans-serif"], "type": "fontFamilies"}}}}"#,
        )
        .expect("tree should parse");
        let sans = tree.resolve(&["font", "family", "sans"]).expect("sans resolves");
        assert_eq!(
            sans.value,
            TokenValue::List(vec!["Inter".to_string(), "sans-serif".to_string()])
        );
        assert_eq!(sans.value.to_css(), "Inter,sans-serif");
    }

    #[test]
    fn from_json_rejects_non_object_roots_and_bad_json() {
        assert!(matches!(
            TokenTree::from_json("[1, 2]"),
            Err(TokenTreeError::NotAnObject)
        ));
        assert!(matches!(
            TokenTree::from_json("{ invalid "),
            Err(TokenTreeError::Parse(_))
        ));
    }

    #[test]
    fn numbers_render_as_text() {
        let tree = TokenTree::from_json(r#"{"font": {"weight": {"bold": {"value": 700, "type": "fontWeights"}}}}"#)
            .expect("tree should parse");
        let bold = tree.resolve(&["font", "weight", "bold"]).expect("bold resolves");
        assert_eq!(bold.value, TokenValue::Text("700".to_string()));
        assert_eq!(bold.kind, TokenType::Other("fontWeights".to_string()));
    }

    #[test]
    fn variable_name_joins_path_with_dashes() {
        assert_eq!(variable_name(&["color", "text", "on-primary"]), "--color-text-on-primary");
        assert_eq!(dotted_path(&["color", "accent"]), "color.accent");
    }
}
