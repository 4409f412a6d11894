use std::collections::HashMap;

use thiserror::Error;

use crate::merge::PreservedTokens;
use crate::store::{VariableStore, DEFAULT_BLOCK};
use crate::tokens::{dotted_path, variable_name, Token, TokenNode, TokenTree, TokenType, TokenValue};

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("tokens `{first}` and `{second}` both map to variable `{name}`")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },
}

/// Top-level categories in output order, with their section titles.
const CATEGORIES: [(&str, &str); 6] = [
    ("spacing", "SPACING SCALE"),
    ("color", "COLOR PALETTE"),
    ("font", "TYPOGRAPHY"),
    ("line", "LINE HEIGHTS"),
    ("radius", "BORDER RADIUS"),
    ("shadow", "SHADOWS"),
];

const COLOR_LEADING: [(&str, &str); 1] = [("primary", "Primary Colors")];
const COLOR_SEMANTIC: [(&str, &str); 4] = [
    ("secondary", "Secondary Colors (Gray Scale)"),
    ("success", "Success Colors"),
    ("warning", "Warning Colors"),
    ("error", "Error Colors"),
];
const COLOR_SURFACES: [(&str, &str); 2] = [("bg", "Background Colors"), ("border", "Border Colors")];
const COLOR_KEYS: [&str; 8] = [
    "primary", "secondary", "success", "warning", "error", "text", "bg", "border",
];

const FONT_GROUPS: [(&str, &str); 3] = [
    ("family", "Font Families"),
    ("size", "Font Sizes"),
    ("weight", "Font Weights"),
];

const ON_PRIMARY_KEY: &str = "on-primary";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Selector of the declaration block, `@theme` by default.
    pub block: String,
    /// Timestamp for the header comment; omitted when `None`.
    pub generated_at: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            block: DEFAULT_BLOCK.to_string(),
            generated_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub document: String,
    pub token_count: usize,
    pub preserved: PreservedTokens,
}

/// Renders `tree` as a variable document, carrying forward the custom
/// variables of `existing` that the tree does not produce.
pub fn convert(
    tree: &TokenTree,
    existing: &VariableStore,
    options: &ConvertOptions,
) -> ConvertResult<Conversion> {
    let mut emitter = Emitter::default();
    emitter.out.push_str("/* Design System Tokens */\n");
    if let Some(generated_at) = &options.generated_at {
        emitter
            .out
            .push_str(&format!("/* Auto-generated from token tree - {generated_at} */\n"));
    }
    emitter.out.push_str(&format!("\n{} {{\n", options.block));

    for (key, title) in CATEGORIES {
        if let Some(node) = tree.get(key) {
            emitter.section(&category_header(title), |e| e.category(key, node))?;
        }
    }
    emitter.section(&category_header("OTHER TOKENS"), |e| {
        for (key, node) in tree.iter() {
            if !CATEGORIES.iter().any(|(known, _)| *known == key) {
                e.node(&mut vec![key.to_string()], node)?;
            }
        }
        Ok(())
    })?;

    let preserved = PreservedTokens::classify(tree, existing);
    if !preserved.is_empty() {
        emitter
            .out
            .push_str(&category_header("CUSTOM TOKENS (NOT IN TOKEN SOURCE)"));
        for (kind, variables) in preserved.groups() {
            if variables.is_empty() {
                continue;
            }
            emitter.out.push_str(&format!("  /* {} */\n", kind.heading()));
            for variable in variables {
                emitter.out.push_str(&format!("  {variable}\n"));
            }
        }
    }
    emitter.out.push_str("}\n");

    let token_count = tree.token_count();
    tracing::debug!(
        tokens = token_count,
        declared = emitter.names.len(),
        preserved = preserved.len(),
        "converted token tree"
    );
    Ok(Conversion {
        document: emitter.out,
        token_count,
        preserved,
    })
}

/// The variable value a single token converts to, trimmed the way the
/// document parser reads it back.
pub fn convert_token(token: &Token) -> String {
    let value = match (&token.kind, &token.value) {
        (TokenType::Color, TokenValue::Reference(path)) => {
            format!("var(--{})", path.trim().replace('.', "-"))
        }
        (TokenType::FontFamilies, value @ (TokenValue::Text(_) | TokenValue::Reference(_))) => {
            let family = value.to_css();
            if family.contains(['\'', '"']) {
                family
            } else {
                format!("'{}'", family.trim())
            }
        }
        (_, value) => value.to_css(),
    };
    value.trim().to_string()
}

fn category_header(title: &str) -> String {
    format!("\n  /* ===== {title} ===== */\n")
}

fn group_header(title: &str) -> String {
    format!("  /* {title} */\n")
}

#[derive(Debug, Default)]
struct Emitter {
    out: String,
    /// variable name -> dotted token path
    names: HashMap<String, String>,
}

impl Emitter {
    /// Runs `body` and keeps its output, prefixed with `header`, only if it
    /// wrote anything.
    fn section(
        &mut self,
        header: &str,
        body: impl FnOnce(&mut Self) -> ConvertResult<()>,
    ) -> ConvertResult<()> {
        let outer = std::mem::take(&mut self.out);
        let result = body(self);
        let inner = std::mem::replace(&mut self.out, outer);
        result?;
        if !inner.is_empty() {
            self.out.push_str(header);
            self.out.push_str(&inner);
        }
        Ok(())
    }

    fn category(&mut self, key: &str, node: &TokenNode) -> ConvertResult<()> {
        let TokenNode::Group(group) = node else {
            return self.node(&mut vec![key.to_string()], node);
        };
        match key {
            "color" => self.color(group),
            "font" => {
                for (sub, title) in FONT_GROUPS {
                    self.subgroup(group, "font", sub, title)?;
                }
                self.section(&group_header("Other Typography"), |e| {
                    e.remaining(group, "font", |key| {
                        FONT_GROUPS.iter().any(|(known, _)| *known == key)
                    })
                })
            }
            _ => self.node(&mut vec![key.to_string()], node),
        }
    }

    fn color(&mut self, group: &TokenTree) -> ConvertResult<()> {
        for (sub, title) in COLOR_LEADING {
            self.subgroup(group, "color", sub, title)?;
        }

        let on_primary = match group.get("text") {
            Some(TokenNode::Group(text)) => match text.get(ON_PRIMARY_KEY) {
                Some(TokenNode::Token(token)) => Some(token),
                _ => None,
            },
            _ => None,
        };
        if let Some(token) = on_primary {
            let path = ["color", "text", ON_PRIMARY_KEY].map(String::from);
            self.section(
                &group_header("Text on primary background - updated by the color service"),
                |e| e.declare(&path, token),
            )?;
        }

        for (sub, title) in COLOR_SEMANTIC {
            self.subgroup(group, "color", sub, title)?;
        }

        if let Some(text) = group.get("text") {
            self.section(&group_header("Text Colors"), |e| match text {
                TokenNode::Group(text_group) => {
                    let mut path = vec!["color".to_string(), "text".to_string()];
                    for (key, node) in text_group.iter() {
                        if key == ON_PRIMARY_KEY && on_primary.is_some() {
                            continue;
                        }
                        path.push(key.to_string());
                        e.node(&mut path, node)?;
                        path.pop();
                    }
                    Ok(())
                }
                TokenNode::Token(_) => e.node(&mut vec!["color".into(), "text".into()], text),
            })?;
        }

        for (sub, title) in COLOR_SURFACES {
            self.subgroup(group, "color", sub, title)?;
        }

        self.section(&group_header("Other Colors"), |e| {
            e.remaining(group, "color", |key| COLOR_KEYS.contains(&key))
        })
    }

    fn subgroup(
        &mut self,
        group: &TokenTree,
        parent: &str,
        key: &str,
        title: &str,
    ) -> ConvertResult<()> {
        let Some(node) = group.get(key) else {
            return Ok(());
        };
        self.section(&group_header(title), |e| {
            e.node(&mut vec![parent.to_string(), key.to_string()], node)
        })
    }

    /// Emits the children of `group` that `is_known` does not claim.
    fn remaining(
        &mut self,
        group: &TokenTree,
        parent: &str,
        is_known: impl Fn(&str) -> bool,
    ) -> ConvertResult<()> {
        for (key, node) in group.iter() {
            if is_known(key) {
                continue;
            }
            self.node(&mut vec![parent.to_string(), key.to_string()], node)?;
        }
        Ok(())
    }

    fn node(&mut self, path: &mut Vec<String>, node: &TokenNode) -> ConvertResult<()> {
        match node {
            TokenNode::Token(token) => self.declare(path, token),
            TokenNode::Group(group) => {
                for (key, child) in group.iter() {
                    path.push(key.to_string());
                    let result = self.node(path, child);
                    path.pop();
                    result?;
                }
                Ok(())
            }
        }
    }

    fn declare(&mut self, path: &[String], token: &Token) -> ConvertResult<()> {
        let name = variable_name(path);
        let dotted = dotted_path(path);
        if let Some(first) = self.names.get(&name) {
            return Err(ConvertError::NameCollision {
                name,
                first: first.clone(),
                second: dotted,
            });
        }

        let value = convert_token(token);
        tracing::trace!(name = %name, kind = token.kind.as_str(), "declare variable");
        self.out
            .push_str(&format!("  {name}: {value}; /* {dotted} */\n"));
        self.names.insert(name, dotted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{parse, Variable};

    fn tree(json: &str) -> TokenTree {
        TokenTree::from_json(json).expect("fixture tree should parse")
    }

    fn token(kind: &str, value: serde_json::Value) -> Token {
        let json = serde_json::json!({ "t": { "value": value, "type": kind } });
        match TokenTree::from_value(&json).expect("token parses").get("t") {
            Some(TokenNode::Token(token)) => token.clone(),
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[test]
    fn convert_token_rewrites_color_references() {
        assert_eq!(
            convert_token(&token("color", "{color.secondary.900}".into())),
            "var(--color-secondary-900)"
        );
        assert_eq!(convert_token(&token("color", "#112233".into())), "#112233");
        // references are only rewritten for colors
        assert_eq!(
            convert_token(&token("dimension", "{spacing.md}".into())),
            "{spacing.md}"
        );
    }

    #[test]
    fn convert_token_renders_shadows() {
        let single = token(
            "boxShadow",
            serde_json::json!({ "x": 0, "y": 1, "blur": 2, "spread": 0, "color": "#00000033" }),
        );
        assert_eq!(convert_token(&single), "0px 1px 2px 0px #00000033");

        let layered = token(
            "boxShadow",
            serde_json::json!([
                { "x": 0, "y": 4, "blur": 6, "spread": -1, "color": "rgba(0,0,0,0.1)" },
                "0 0 0 1px red"
            ]),
        );
        assert_eq!(
            convert_token(&layered),
            "0px 4px 6px -1px rgba(0,0,0,0.1), 0 0 0 1px red"
        );

        let plain = token("boxShadow", "none".into());
        assert_eq!(convert_token(&plain), "none");
    }

    #[test]
    fn convert_token_quotes_font_families_once() {
        assert_eq!(convert_token(&token("fontFamilies", "Inter".into())), "'Inter'");
        assert_eq!(
            convert_token(&token("fontFamilies", "'Inter', sans-serif".into())),
            "'Inter', sans-serif"
        );
        assert_eq!(
            convert_token(&token("fontFamilies", "\"Fira Code\"".into())),
            "\"Fira Code\""
        );
    }

    #[test]
    fn convert_orders_sections_and_subgroups() {
        let tree = tree(
            r##"{
                "shadow": { "sm": { "value": "none", "type": "boxShadow" } },
                "color": {
                    "bg": { "page": { "value": "#ffffff", "type": "color" } },
                    "text": {
                        "body": { "value": "{color.secondary.900}", "type": "color" },
                        "on-primary": { "value": "#ffffff", "type": "color" }
                    },
                    "primary": { "base": { "value": "#3b82f6", "type": "color" } }
                },
                "spacing": { "sm": { "value": "4px", "type": "spacing" } }
            }"##,
        );

        let conversion = convert(&tree, &VariableStore::new(), &ConvertOptions::default())
            .expect("conversion should succeed");
        assert_eq!(conversion.token_count, 6);
        assert_eq!(
            conversion.document,
            "/* Design System Tokens */\n\
             \n@theme {\n\
             \n  /* ===== SPACING SCALE ===== */\n\
             \x20 --spacing-sm: 4px; /* spacing.sm */\n\
             \n  /* ===== COLOR PALETTE ===== */\n\
             \x20 /* Primary Colors */\n\
             \x20 --color-primary-base: #3b82f6; /* color.primary.base */\n\
             \x20 /* Text on primary background - updated by the color service */\n\
             \x20 --color-text-on-primary: #ffffff; /* color.text.on-primary */\n\
             \x20 /* Text Colors */\n\
             \x20 --color-text-body: var(--color-secondary-900); /* color.text.body */\n\
             \x20 /* Background Colors */\n\
             \x20 --color-bg-page: #ffffff; /* color.bg.page */\n\
             \n  /* ===== SHADOWS ===== */\n\
             \x20 --shadow-sm: none; /* shadow.sm */\n\
             }\n"
        );
    }

    #[test]
    fn convert_emits_unlisted_groups_after_known_ones() {
        let tree = tree(
            r##"{
                "opacity": { "muted": { "value": "0.6", "type": "opacity" } },
                "color": {
                    "info": { "500": { "value": "#0ea5e9", "type": "color" } },
                    "border": { "default": { "value": "#e5e7eb", "type": "color" } }
                },
                "font": { "tracking": { "wide": { "value": "0.05em", "type": "letterSpacing" } } }
            }"##,
        );

        let document = convert(&tree, &VariableStore::new(), &ConvertOptions::default())
            .expect("conversion should succeed")
            .document;
        let border = document.find("--color-border-default").expect("border emitted");
        let info = document.find("--color-info-500").expect("info emitted");
        let tracking = document.find("--font-tracking-wide").expect("tracking emitted");
        let opacity = document.find("--opacity-muted").expect("opacity emitted");
        assert!(border < info && info < tracking && tracking < opacity);
        assert!(document.contains("  /* Other Colors */\n"));
        assert!(document.contains("  /* Other Typography */\n"));
        assert!(document.contains("/* ===== OTHER TOKENS ===== */"));
    }

    #[test]
    fn convert_appends_preserved_custom_variables_by_group() {
        let tree = tree(r##"{"radius": {"md": {"value": "6px", "type": "borderRadius"}}}"##);
        let existing: VariableStore = [
            Variable::new("--radius-md", "4px"),
            Variable::new("--z-modal", "50").with_comment("modal layer"),
            Variable::new("--my-transition", "all 0.2s"),
            Variable::new("--brand-glow", "0 0 4px red"),
        ]
        .into_iter()
        .collect();

        let conversion = convert(&tree, &existing, &ConvertOptions::default())
            .expect("conversion should succeed");
        assert_eq!(conversion.preserved.len(), 3);
        assert!(conversion.document.ends_with(
            "\n  /* ===== CUSTOM TOKENS (NOT IN TOKEN SOURCE) ===== */\n\
             \x20 /* Transitions */\n\
             \x20 --my-transition: all 0.2s;\n\
             \x20 /* Z-Index Scale */\n\
             \x20 --z-modal: 50; /* modal layer */\n\
             \x20 /* Other Custom Tokens */\n\
             \x20 --brand-glow: 0 0 4px red;\n\
             }\n"
        ));

        let reparsed = parse(&conversion.document, DEFAULT_BLOCK);
        assert_eq!(reparsed.value("--radius-md"), Some("6px"));
        assert_eq!(
            reparsed.get("--z-modal"),
            Some(&Variable::new("--z-modal", "50").with_comment("modal layer"))
        );
    }

    #[test]
    fn convert_writes_header_timestamp_and_custom_block() {
        let options = ConvertOptions {
            block: ":root".to_string(),
            generated_at: Some("2024-01-01T00:00:00Z".to_string()),
        };
        let document = convert(&TokenTree::default(), &VariableStore::new(), &options)
            .expect("conversion should succeed")
            .document;
        assert_eq!(
            document,
            "/* Design System Tokens */\n\
             /* Auto-generated from token tree - 2024-01-01T00:00:00Z */\n\
             \n:root {\n}\n"
        );
    }

    #[test]
    fn convert_rejects_colliding_variable_names() {
        let tree = tree(
            r##"{"spacing": {
                "a-b": { "value": "1px", "type": "spacing" },
                "a": { "b": { "value": "2px", "type": "spacing" } }
            }}"##,
        );

        let err = convert(&tree, &VariableStore::new(), &ConvertOptions::default())
            .expect_err("colliding names should fail");
        assert!(matches!(
            err,
            ConvertError::NameCollision { ref name, ref first, ref second }
                if name == "--spacing-a-b" && first == "spacing.a-b" && second == "spacing.a.b"
        ));
    }

    #[test]
    fn font_family_arrays_render_as_comma_list() {
        let tree = tree(
            r#"{"font": {"family": {"sans": {"value": ["Inter", "sans-serif"], "type": "fontFamilies"}}}}"#,
        );
        let document = convert(&tree, &VariableStore::new(), &ConvertOptions::default())
            .expect("conversion should succeed")
            .document;
        assert!(
            document.contains("  --font-family-sans: Inter,sans-serif; /* font.family.sans */\n"),
            "{document}"
        );
    }

    #[test]
    fn padded_values_are_stable_across_cycles() {
        let tree = tree(
            r#"{"spacing": {"sm": {"value": " 4px ", "type": "spacing"}},
                "font": {"family": {"body": {"value": "Inter ", "type": "fontFamilies"}}}}"#,
        );
        assert_eq!(convert_token(tree.resolve(&["spacing", "sm"]).expect("sm")), "4px");

        let first = convert(&tree, &VariableStore::new(), &ConvertOptions::default())
            .expect("first conversion should succeed");
        let persisted = parse(&first.document, DEFAULT_BLOCK);
        let changes = crate::merge::diff(&tree, &persisted);
        assert!(changes.added.is_empty());
        assert!(changes.updated.is_empty(), "{:?}", changes.updated);
        assert_eq!(persisted.value("--font-family-body"), Some("'Inter'"));
    }
}
