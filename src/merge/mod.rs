use std::collections::HashSet;
use std::fmt;

use crate::color::TEXT_ON_PRIMARY_VAR;
use crate::convert::convert_token;
use crate::store::{Variable, VariableStore};
use crate::tokens::{variable_name, TokenTree};

const RULE: &str = "==================================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub name: String,
    pub old_value: String,
    pub new_value: String,
}

/// Which reporting bucket a preserved variable falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreservedKind {
    Transition,
    ZIndex,
    Other,
}

impl PreservedKind {
    pub fn of(name: &str) -> Self {
        if name.contains("transition") {
            Self::Transition
        } else if name.contains("z-") {
            Self::ZIndex
        } else {
            Self::Other
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Transition => "Transitions",
            Self::ZIndex => "Z-Index Scale",
            Self::Other => "Other Custom Tokens",
        }
    }

    pub fn fallback_comment(self) -> &'static str {
        match self {
            Self::Transition => "custom transition",
            Self::ZIndex => "custom z-index",
            Self::Other => "custom token",
        }
    }
}

/// Hand-authored variables with no counterpart in the token tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedTokens {
    pub transitions: Vec<Variable>,
    pub z_index: Vec<Variable>,
    pub other: Vec<Variable>,
}

impl PreservedTokens {
    /// Collects every variable of `current` that the tree does not produce.
    pub fn classify(tree: &TokenTree, current: &VariableStore) -> Self {
        let produced: HashSet<String> = tree
            .leaves()
            .iter()
            .map(|(path, _)| variable_name(path))
            .collect();

        let mut preserved = Self::default();
        for variable in current.iter() {
            if variable.name == TEXT_ON_PRIMARY_VAR || produced.contains(&variable.name) {
                continue;
            }
            if tree.resolve(&source_address(&variable.name)).is_some() {
                continue;
            }
            preserved.push(variable.clone());
        }
        preserved
    }

    fn push(&mut self, variable: Variable) {
        match PreservedKind::of(&variable.name) {
            PreservedKind::Transition => self.transitions.push(variable),
            PreservedKind::ZIndex => self.z_index.push(variable),
            PreservedKind::Other => self.other.push(variable),
        }
    }

    pub fn len(&self) -> usize {
        self.transitions.len() + self.z_index.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buckets in output order, empty ones included.
    pub fn groups(&self) -> [(PreservedKind, &[Variable]); 3] {
        [
            (PreservedKind::Transition, self.transitions.as_slice()),
            (PreservedKind::ZIndex, self.z_index.as_slice()),
            (PreservedKind::Other, self.other.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    pub added: Vec<Added>,
    pub updated: Vec<Updated>,
    pub preserved: PreservedTokens,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.preserved.is_empty()
    }
}

/// Compares the converted tree against the variables already persisted.
///
/// Values are compared after conversion, so diffing a tree against the
/// document it produced reports nothing added or updated.
pub fn diff(tree: &TokenTree, current: &VariableStore) -> Changes {
    let mut changes = Changes::default();

    for (path, token) in tree.leaves() {
        let name = variable_name(&path);
        let value = convert_token(token);
        match current.get(&name) {
            None => changes.added.push(Added { name, value }),
            Some(existing) if existing.value != value => changes.updated.push(Updated {
                name,
                old_value: existing.value.clone(),
                new_value: value,
            }),
            Some(_) => {}
        }
    }
    changes.preserved = PreservedTokens::classify(tree, current);

    tracing::debug!(
        added = changes.added.len(),
        updated = changes.updated.len(),
        preserved = changes.preserved.len(),
        "computed token diff"
    );
    changes
}

/// Maps a variable name back to the tree path it would come from:
/// `--color-primary-base` becomes `color.primary.base`.
pub fn source_address(name: &str) -> Vec<String> {
    name.replace("--", "")
        .split('-')
        .map(str::to_string)
        .collect()
}

impl fmt::Display for Changes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PREVIEW OF CHANGES:")?;
        writeln!(f, "{RULE}")?;

        if !self.added.is_empty() {
            writeln!(f, "\nNEW TOKENS FROM SOURCE:")?;
            for token in &self.added {
                writeln!(f, "  + {}: {}", token.name, token.value)?;
            }
        }

        if !self.updated.is_empty() {
            writeln!(f, "\nUPDATED TOKENS:")?;
            for token in &self.updated {
                writeln!(
                    f,
                    "  ~ {}: {} -> {}",
                    token.name, token.old_value, token.new_value
                )?;
            }
        }

        if !self.preserved.is_empty() {
            writeln!(f, "\nPRESERVED CUSTOM TOKENS:")?;
            for (kind, variables) in self.preserved.groups() {
                for variable in variables {
                    let comment = variable
                        .comment
                        .as_deref()
                        .unwrap_or(kind.fallback_comment());
                    writeln!(f, "  = {}: {} ({comment})", variable.name, variable.value)?;
                }
            }
        }

        if self.is_empty() {
            writeln!(f, "\nNo changes.")?;
        }

        write!(f, "\n{RULE}")
    }
}
