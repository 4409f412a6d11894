use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;

/// Block selector used when no other one is configured.
pub const DEFAULT_BLOCK: &str = "@theme";

/// One flattened custom property, e.g. `--color-primary-base: #3b82f6; /* note */`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub comment: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {};", self.name, self.value)?;
        if let Some(comment) = &self.comment {
            write!(f, " /* {comment} */")?;
        }
        Ok(())
    }
}

/// Variables keyed by name, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    entries: IndexMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|variable| variable.value.as_str())
    }

    /// Inserts or replaces a variable. A later declaration of the same name
    /// wins, matching CSS cascade order.
    pub fn insert(&mut self, variable: Variable) {
        self.entries.insert(variable.name.clone(), variable);
    }

    /// Overwrites the value of `name`, keeping its comment, or appends it.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.entries.get_mut(name) {
            Some(variable) => variable.value = value.to_string(),
            None => self.insert(Variable::new(name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }
}

impl FromIterator<Variable> for VariableStore {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut store = Self::new();
        for variable in iter {
            store.insert(variable);
        }
        store
    }
}

/// Reads the declarations of the first `block { ... }` in `document`.
///
/// Best effort: anything that is not a `--name: value;` line inside the block
/// is skipped, and a document without the block yields an empty store.
pub fn parse(document: &str, block: &str) -> VariableStore {
    let mut store = VariableStore::new();
    let Some(start) = block_body_start(document, block) else {
        tracing::debug!(block, "no declaration block found in document");
        return store;
    };

    for line in document[start..].lines() {
        let close = closing_brace(line);
        let trimmed = line[..close.unwrap_or(line.len())].trim();
        if !trimmed.is_empty() {
            match parse_declaration(trimmed) {
                Some(variable) => store.insert(variable),
                None => tracing::trace!(line = trimmed, "skipping non-declaration line"),
            }
        }
        if close.is_some() {
            break;
        }
    }

    tracing::debug!(variables = store.len(), "parsed existing variables");
    store
}

/// Rewrites `document` so every variable in `updates` carries its new value.
///
/// Existing declarations are edited in place (indentation and trailing
/// comment survive); missing ones are inserted before the block's closing
/// brace. Without a block, a fresh one is appended.
pub fn rewrite_document(document: &str, block: &str, updates: &[Variable]) -> String {
    let Some(start) = block_body_start(document, block) else {
        let mut output = document.to_string();
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&format!("\n{block} {{\n"));
        for variable in updates {
            output.push_str(&format!("  {variable}\n"));
        }
        output.push_str("}\n");
        return output;
    };

    let by_name: IndexMap<&str, &Variable> = updates
        .iter()
        .map(|variable| (variable.name.as_str(), variable))
        .collect();
    let mut seen = HashSet::new();
    let mut output = String::with_capacity(document.len() + updates.len() * 48);
    output.push_str(&document[..start]);

    let mut lines = document[start..].split_inclusive('\n');
    let mut closed = false;
    for line in lines.by_ref() {
        let text = line.trim_end_matches(['\r', '\n']);
        let ending = &line[text.len()..];
        let Some(close) = closing_brace(text) else {
            output.push_str(&rewrite_declaration(text, &by_name, &mut seen));
            output.push_str(ending);
            continue;
        };

        let (head, tail) = text.split_at(close);
        let head = rewrite_declaration(head, &by_name, &mut seen);
        let missing = unseen(&by_name, &seen);
        if head.trim().is_empty() {
            push_declarations(&mut output, &missing);
            output.push_str(&head);
        } else {
            output.push_str(head.trim_end());
            if missing.is_empty() {
                output.push(' ');
            } else {
                output.push('\n');
                push_declarations(&mut output, &missing);
            }
        }
        output.push_str(tail);
        output.push_str(ending);
        closed = true;
        break;
    }
    for line in lines {
        output.push_str(line);
    }

    if !closed {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        push_declarations(&mut output, &unseen(&by_name, &seen));
        output.push_str("}\n");
    }

    output
}

/// Replaces the value of a declaration named in `updates`, keeping its
/// indentation and comment. Other text comes back unchanged.
fn rewrite_declaration<'a>(
    text: &str,
    updates: &IndexMap<&'a str, &'a Variable>,
    seen: &mut HashSet<&'a str>,
) -> String {
    let Some(existing) = parse_declaration(text.trim()) else {
        return text.to_string();
    };
    let Some((name, update)) = updates.get_key_value(existing.name.as_str()) else {
        return text.to_string();
    };
    seen.insert(*name);

    let indent = &text[..text.len() - text.trim_start().len()];
    let rewritten = Variable {
        name: existing.name,
        value: update.value.clone(),
        comment: existing.comment.or_else(|| update.comment.clone()),
    };
    format!("{indent}{rewritten}")
}

fn unseen<'a>(
    updates: &IndexMap<&'a str, &'a Variable>,
    seen: &HashSet<&'a str>,
) -> Vec<&'a Variable> {
    updates
        .iter()
        .filter(|(name, _)| !seen.contains(*name))
        .map(|(_, variable)| *variable)
        .collect()
}

fn push_declarations(output: &mut String, variables: &[&Variable]) {
    for variable in variables {
        output.push_str(&format!("  {variable}\n"));
    }
}

/// Offset of the `}` that closes the enclosing block, ignoring braces inside
/// `/* ... */` and balanced `{...}` pairs such as unresolved references.
fn closing_brace(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_comment = false;
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if in_comment {
            if bytes[i..].starts_with(b"*/") {
                in_comment = false;
                i += 1;
            }
        } else if bytes[i..].starts_with(b"/*") {
            in_comment = true;
            i += 1;
        } else if bytes[i] == b'{' {
            depth += 1;
        } else if bytes[i] == b'}' {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
        i += 1;
    }
    None
}

/// Byte offset just past the `{` that opens `block`, allowing whitespace
/// between selector and brace.
fn block_body_start(document: &str, block: &str) -> Option<usize> {
    if block.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(found) = document[from..].find(block) {
        let after = from + found + block.len();
        let rest = &document[after..];
        let skipped = rest.len() - rest.trim_start().len();
        if rest[skipped..].starts_with('{') {
            return Some(after + skipped + 1);
        }
        from = after;
    }
    None
}

fn parse_declaration(line: &str) -> Option<Variable> {
    if !line.starts_with("--") {
        return None;
    }
    let (name, rest) = line.split_once(':')?;
    let name = name.trim();
    if name.len() <= 2 {
        return None;
    }

    let mut value = rest.trim();
    let mut comment = None;
    if let Some(body) = value.strip_suffix("*/") {
        if let Some(open) = body.rfind("/*") {
            let text = body[open + 2..].trim();
            if !text.is_empty() {
                comment = Some(text.to_string());
            }
            value = body[..open].trim_end();
        }
    }
    let value = value.strip_suffix(';').unwrap_or(value).trim();
    if value.is_empty() {
        return None;
    }

    Some(Variable {
        name: name.to_string(),
        value: value.to_string(),
        comment,
    })
}
