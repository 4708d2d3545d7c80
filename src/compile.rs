//! Source-to-source pipeline: parse, analyze, optionally normalize, print.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyze::analyze_scopes;
use crate::ast::Ast;
use crate::error::{Error, Result};
use crate::namer::{NameOptions, Namer};
use crate::normalize::normalize_program;
use crate::parse::parse_program;
use crate::print::program_to_source;

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub naming: NameOptions,
    /// Rename every binding to an anonymous name after analysis.
    pub normalize: bool,
}

impl CompileOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileSummary {
    pub scopes: u32,
    pub placeholders: u32,
    pub updates: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub code: String,
    pub summary: CompileSummary,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

pub fn transform_source(source: &str, options: &CompileOptions) -> Result<CompileResult> {
    let mut ast = Ast::new();
    let root = parse_program(&mut ast, source)?;
    let namer = Namer::new(&options.naming);
    let tree = analyze_scopes(&mut ast, root, &namer)?;
    if options.normalize {
        normalize_program(&mut ast, root, &options.naming)?;
    }
    let code = program_to_source(&ast, root)?;

    let summary = CompileSummary {
        scopes: tree.len() as u32,
        placeholders: ast.placeholder_count() as u32,
        updates: tree.updates().len() as u32,
    };
    info!(
        scopes = summary.scopes,
        placeholders = summary.placeholders,
        updates = summary.updates,
        "compiled source"
    );
    Ok(CompileResult { code, summary })
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors cross the boundary as a serialized diagnostic.
#[cfg(feature = "napi")]
#[napi]
pub fn transform_source_native(
    source: String,
    options: Option<serde_json::Value>,
) -> napi::Result<CompileResult> {
    let options = match options {
        Some(value) => serde_json::from_value(value).map_err(|e| Error::Config(e.to_string())),
        None => Ok(CompileOptions::default()),
    };
    options.and_then(|options| transform_source(&source, &options)).map_err(|err| {
        let diagnostic = crate::error::Diagnostic::from(&err);
        napi::Error::from_reason(
            serde_json::to_string(&diagnostic).unwrap_or_else(|_| err.to_string()),
        )
    })
}
