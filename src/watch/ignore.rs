use std::path::{Component, Path};

/// Build artifacts, dependencies and editor droppings that never trigger a
/// redeploy. `target` matters most: `cargo run` writes there, and watching
/// it would redeploy in a loop.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    "target",
    "node_modules",
    "dist",
    "build",
    ".next",
    "__pycache__",
    ".pytest_cache",
    ".venv",
    "venv",
    ".idea",
    ".DS_Store",
    "*.log",
    "*.swp",
    "*.swo",
    "*~",
];

/// Name patterns matched against each component of a root-relative path.
///
/// A pattern is either an exact name (`node_modules`) or a suffix glob
/// starting with `*` (`*.swp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    patterns: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_IGNORE.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl IgnoreRules {
    /// No rules at all.
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Default rules plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rules = Self::default();
        for pattern in extra {
            let pattern = pattern.into();
            if !pattern.is_empty() && !rules.patterns.contains(&pattern) {
                rules.patterns.push(pattern);
            }
        }
        rules
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether any component of `relative` matches a rule.
    pub fn matches(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                self.patterns.iter().any(|p| pattern_matches(p, &name))
            }
            _ => false,
        })
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => name == pattern,
    }
}
