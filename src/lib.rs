//! # Poly Compiler Core
//!
//! Rewrites a Poly syntax tree in place before code generation.
//!
//! ## Passes
//!
//! 1. **Walk**: [`walker::walk`] visits every field of every node in a fixed
//!    order and lets the visitor insert, replace and remove nodes while the
//!    walk is running. Cursors re-resolve their position on every use.
//!
//! 2. **Scopes**: one scope per block or function. A name is declared at most
//!    once per scope; every read and write must resolve to a declaration in
//!    the current scope or an ancestor (P-ERR-SCOPE-001 / P-ERR-SCOPE-002).
//!
//! 3. **Reactive rewrite**: `let a = reactive(x) + 1;` becomes
//!    `let a; let set_a = () => { a = x + 1; }; set_a();`, and each later
//!    `x = ...;` is followed by `set_a();` plus the update closures of every
//!    value derived from `a`.
//!
//! 4. **Placeholder sweep**: synthesized bindings are placeholders until the
//!    end of analysis, when the [`namer::Namer`] picks names that collide with
//!    nothing visible from any of their uses.
//!
//! The JS front end ([`parse`]) and printer ([`print`]) adapt source text to
//! and from the tree; the passes never depend on them.

pub mod analyze;
pub mod ast;
pub mod compile;
pub mod error;
pub mod namer;
pub mod normalize;
pub mod parse;
pub mod print;
pub mod reactive;
pub mod scope;
pub mod transform;
pub mod walker;

#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod walker_tests;

pub use analyze::analyze_scopes;
pub use ast::{Ast, LiteralValue, Name, Node, NodeId, Placeholder};
pub use compile::{transform_source, CompileOptions, CompileResult, CompileSummary};
#[cfg(feature = "napi")]
pub use compile::transform_source_native;
pub use error::{Diagnostic, Error, Result};
pub use namer::{NameOptions, Namer, NamingStrategy, StrategyKind};
pub use normalize::normalize_program;
pub use parse::{parse_program, parse_statement};
pub use print::{program_to_source, statement_to_source};
pub use scope::{ScopeContext, ScopeId, ScopeTree};
pub use walker::{walk, CursorId, Visitor, WalkObject, Walker};
