//! Name allocation for synthesized and normalized bindings.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ast::Name;
use crate::scope::{ScopeId, ScopeTree};

pub const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGIT: &str = "0123456789";

lazy_static::lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref RESERVED: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for word in [
            "await", "break", "case", "catch", "class", "const", "continue", "debugger",
            "default", "delete", "do", "else", "enum", "export", "extends", "false",
            "finally", "for", "function", "if", "implements", "import", "in", "instanceof",
            "interface", "let", "new", "null", "package", "private", "protected", "public",
            "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof",
            "var", "void", "while", "with", "yield", "undefined", "reactive",
        ] {
            s.insert(word);
        }
        s
    };
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Words that can never name a binding in printed output.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRATEGIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Proposes a successor for a name that is already taken, or a first name
/// when given `None`.
pub trait NamingStrategy: fmt::Debug {
    fn resolve_name(&self, name: Option<&str>) -> String;
}

/// `_`, then one more leading underscore per collision.
#[derive(Debug, Clone, Default)]
pub struct UnderscorePrependStrategy;

impl NamingStrategy for UnderscorePrependStrategy {
    fn resolve_name(&self, name: Option<&str>) -> String {
        match name {
            None => "_".to_string(),
            Some(name) => format!("_{}", name),
        }
    }
}

/// Appends `separator` and a counter, or bumps an existing counter:
/// `dog` -> `dog__1` -> `dog__2`.
#[derive(Debug, Clone)]
pub struct AppendNumberStrategy {
    pub separator: String,
    pub start: u64,
}

impl AppendNumberStrategy {
    pub fn new(separator: impl Into<String>, start: u64) -> Self {
        Self { separator: separator.into(), start }
    }
}

impl Default for AppendNumberStrategy {
    fn default() -> Self {
        Self::new("__", 1)
    }
}

impl NamingStrategy for AppendNumberStrategy {
    fn resolve_name(&self, name: Option<&str>) -> String {
        let name = name.unwrap_or("");
        let sep = &self.separator;
        let Some(at) = name.rfind(sep.as_str()).filter(|_| !sep.is_empty()) else {
            return format!("{}{}{}", name, sep, self.start);
        };
        let (stem, counter) = (&name[..at], &name[at + sep.len()..]);
        if counter.is_empty() {
            return format!("{}{}{}", stem, sep, self.start);
        }
        if NUMBER.is_match(counter) {
            if let Some(next) = counter.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
                return format!("{}{}{}", stem, sep, next);
            }
        }
        format!("{}{}{}", name, sep, self.start)
    }
}

/// Counts through names like an odometer: the first position draws from
/// `first`, the rest from `rest`. With letters then digits this yields
/// `a, b, .., z, a0, .., a9, b0, .., z9, a00, ..`.
#[derive(Debug, Clone)]
pub struct IncrementalStrategy {
    first: Vec<char>,
    rest: Vec<char>,
}

impl IncrementalStrategy {
    /// Falls back to the default sets when either is empty.
    pub fn new(first: &str, rest: &str) -> Self {
        let first: Vec<char> = if first.is_empty() { LOWER } else { first }.chars().collect();
        let rest: Vec<char> = if rest.is_empty() { DIGIT } else { rest }.chars().collect();
        Self { first, rest }
    }
}

impl Default for IncrementalStrategy {
    fn default() -> Self {
        Self::new(LOWER, DIGIT)
    }
}

impl NamingStrategy for IncrementalStrategy {
    fn resolve_name(&self, name: Option<&str>) -> String {
        let mut chars: Vec<char> = match name {
            Some(name) if !name.is_empty() => name.chars().collect(),
            _ => return self.first[0].to_string(),
        };
        for i in (0..chars.len()).rev() {
            let set = if i == 0 { &self.first } else { &self.rest };
            match set.iter().position(|&c| c == chars[i]) {
                None => {
                    chars[i] = set[0];
                    return chars.into_iter().collect();
                }
                Some(at) if at + 1 < set.len() => {
                    chars[i] = set[at + 1];
                    return chars.into_iter().collect();
                }
                Some(_) => chars[i] = set[0],
            }
        }
        chars.push(self.rest[0]);
        chars.into_iter().collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn default_separator() -> String {
    "__".to_string()
}

fn default_start() -> u64 {
    1
}

fn default_first() -> String {
    LOWER.to_string()
}

fn default_rest() -> String {
    DIGIT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StrategyKind {
    Incremental {
        #[serde(default = "default_first")]
        first: String,
        #[serde(default = "default_rest")]
        rest: String,
    },
    AppendNumber {
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default = "default_start")]
        start: u64,
    },
    UnderscorePrepend,
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::AppendNumber { separator: default_separator(), start: default_start() }
    }
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn NamingStrategy> {
        match self {
            StrategyKind::Incremental { first, rest } => Box::new(IncrementalStrategy::new(first, rest)),
            StrategyKind::AppendNumber { separator, start } => {
                Box::new(AppendNumberStrategy::new(separator.clone(), *start))
            }
            StrategyKind::UnderscorePrepend => Box::new(UnderscorePrependStrategy),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NameOptions {
    /// Ignore hints and always start from the strategy's first name.
    pub minimize: bool,
    /// Only avoid names in the immediate scope, allowing ancestor names to be
    /// shadowed.
    pub aggressive: bool,
    pub strategy: StrategyKind,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAMER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct Namer {
    pub minimize: bool,
    pub aggressive: bool,
    strategy: Box<dyn NamingStrategy>,
}

impl Default for Namer {
    fn default() -> Self {
        Self::new(&NameOptions::default())
    }
}

impl Namer {
    pub fn new(options: &NameOptions) -> Self {
        Self {
            minimize: options.minimize,
            aggressive: options.aggressive,
            strategy: options.strategy.build(),
        }
    }

    pub fn with_strategy(minimize: bool, aggressive: bool, strategy: Box<dyn NamingStrategy>) -> Self {
        Self { minimize, aggressive, strategy }
    }

    pub fn resolve_name(&self, name: Option<&str>) -> String {
        self.strategy.resolve_name(name)
    }

    /// Whether `name` is unavailable in `scope`: declared there, or in an
    /// ancestor unless aggressive.
    pub fn scope_has(&self, tree: &ScopeTree, scope: ScopeId, name: &Name) -> bool {
        if self.aggressive {
            tree.has_immediate(scope, name)
        } else {
            tree.has(scope, name)
        }
    }

    /// First candidate, starting from the hint, that `taken` rejects.
    pub fn get_name(&self, hint: Option<&str>, mut taken: impl FnMut(&str) -> bool) -> String {
        let hint = hint.filter(|h| !self.minimize && is_valid_identifier(h));
        let mut candidate = match hint {
            Some(h) => h.to_string(),
            None => self.resolve_name(None),
        };
        while taken(&candidate) {
            candidate = self.resolve_name(Some(&candidate));
        }
        candidate
    }

    /// Name for a new binding in `scope`.
    pub fn name_in_scope(&self, tree: &ScopeTree, scope: ScopeId, hint: Option<&str>) -> String {
        self.get_name(hint, |candidate| {
            is_reserved(candidate) || self.scope_has(tree, scope, &Name::ident(candidate))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeId;

    #[test]
    fn test_incremental_strategy() {
        let s = IncrementalStrategy::default();
        assert_eq!(s.resolve_name(None), "a");
        assert_eq!(s.resolve_name(Some("a")), "b");
        assert_eq!(s.resolve_name(Some("z")), "a0");
        assert_eq!(s.resolve_name(Some("a0")), "a1");
        assert_eq!(s.resolve_name(Some("a9")), "b0");
        assert_eq!(s.resolve_name(Some("z9")), "a00");
    }

    #[test]
    fn test_append_number_strategy() {
        let s = AppendNumberStrategy::default();
        assert_eq!(s.resolve_name(None), "__1");
        assert_eq!(s.resolve_name(Some("dog")), "dog__1");
        assert_eq!(s.resolve_name(Some("dog__1")), "dog__2");
        assert_eq!(s.resolve_name(Some("dog__")), "dog__1");
        assert_eq!(s.resolve_name(Some("dog__x")), "dog__x__1");
        assert_eq!(
            s.resolve_name(Some("v__18446744073709551615")),
            "v__18446744073709551615__1"
        );

        let s = AppendNumberStrategy::new("_", 0);
        assert_eq!(s.resolve_name(Some("set_a")), "set_a_0");
        assert_eq!(s.resolve_name(Some("set_a_0")), "set_a_1");
    }

    #[test]
    fn test_underscore_strategy() {
        let s = UnderscorePrependStrategy;
        assert_eq!(s.resolve_name(None), "_");
        assert_eq!(s.resolve_name(Some("a")), "_a");
        assert_eq!(s.resolve_name(Some("_a")), "__a");
    }

    #[test]
    fn test_get_name_prefers_hint() {
        let namer = Namer::default();
        assert_eq!(namer.get_name(Some("set_a"), |_| false), "set_a");
        assert_eq!(namer.get_name(Some("set_a"), |c| c == "set_a" || c == "set_a__1"), "set_a__2");
        assert_eq!(namer.get_name(Some("1abc"), |_| false), "__1");
        assert_eq!(namer.get_name(None, |c| c == "__1"), "__2");

        let minimize = Namer::new(&NameOptions { minimize: true, ..NameOptions::default() });
        assert_eq!(minimize.get_name(Some("set_a"), |_| false), "__1");
    }

    #[test]
    fn test_name_in_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let child = tree.add_scope(root, None);
        tree.add_declaration(root, Name::ident("a"), NodeId(0)).unwrap();

        let options = NameOptions {
            strategy: StrategyKind::Incremental { first: default_first(), rest: default_rest() },
            ..NameOptions::default()
        };
        assert_eq!(Namer::new(&options).name_in_scope(&tree, child, None), "b");

        let aggressive = NameOptions { aggressive: true, ..options };
        assert_eq!(Namer::new(&aggressive).name_in_scope(&tree, child, None), "a");
        assert_eq!(Namer::new(&aggressive).name_in_scope(&tree, root, None), "b");
    }

    #[test]
    fn test_reserved_words_are_skipped() {
        let namer = Namer::with_strategy(false, false, Box::new(UnderscorePrependStrategy));
        let tree = ScopeTree::new();
        assert_eq!(namer.name_in_scope(&tree, tree.root(), Some("let")), "_let");
        assert!(is_reserved("reactive"));
        assert!(!is_reserved("set_a"));
    }

    #[test]
    fn test_strategy_kind_from_json() {
        let kind: StrategyKind =
            serde_json::from_str(r#"{ "kind": "appendNumber", "separator": "_" }"#).unwrap();
        assert_eq!(kind, StrategyKind::AppendNumber { separator: "_".to_string(), start: 1 });

        let kind: StrategyKind = serde_json::from_str(r#"{ "kind": "underscorePrepend" }"#).unwrap();
        assert_eq!(kind.build().resolve_name(Some("x")), "_x");
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("set_a"));
        assert!(is_valid_identifier("$el"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
