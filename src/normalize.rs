//! Renames every binding to a namer-chosen anonymous name so that trees can be
//! compared without regard to the names their authors (or the placeholder
//! sweep) picked.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{Ast, Name, Node, NodeId};
use crate::error::{Error, Result};
use crate::namer::{NameOptions, Namer};
use crate::scope::{ScopeId, ScopeTree};
use crate::walker::{walk, CursorId, Visitor, Walker};

#[derive(Debug)]
struct Frame {
    cursor: CursorId,
    scope: ScopeId,
    renames: HashMap<Name, String>,
}

struct Normalizer<'n> {
    namer: &'n Namer,
    /// Scopes holding only the new names, so freed names are reused once a
    /// scope closes.
    tree: ScopeTree,
    frames: Vec<Frame>,
    renamed: usize,
}

impl<'n> Normalizer<'n> {
    fn new(namer: &'n Namer) -> Self {
        Self { namer, tree: ScopeTree::new(), frames: Vec::new(), renamed: 0 }
    }

    fn current(&self) -> ScopeId {
        self.frames.last().map(|f| f.scope).unwrap_or_else(|| self.tree.root())
    }

    fn push(&mut self, cursor: CursorId, node: NodeId) {
        let scope = self.tree.add_scope(self.current(), Some(node));
        self.frames.push(Frame { cursor, scope, renames: HashMap::new() });
    }

    /// Picks a fresh name for `name` in the innermost scope.
    fn bind(&mut self, name: &Name, binder: NodeId) -> Result<String> {
        let scope = self.current();
        let fresh = self.namer.name_in_scope(&self.tree, scope, None);
        self.tree.add_declaration(scope, Name::ident(fresh.clone()), binder)?;
        let Some(frame) = self.frames.last_mut() else {
            return Err(Error::undeclared(name));
        };
        if frame.renames.insert(name.clone(), fresh.clone()).is_some() {
            return Err(Error::redeclared(name));
        }
        trace!(from = %name, to = %fresh, "rename binding");
        self.renamed += 1;
        Ok(fresh)
    }

    fn resolve(&self, name: &Name) -> Result<String> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.renames.get(name))
            .cloned()
            .ok_or_else(|| Error::undeclared(name))
    }
}

impl Visitor for Normalizer<'_> {
    fn enter(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
        let Some((id, node)) = walker.get(cursor) else {
            return Ok(());
        };
        match node {
            Node::Block { .. } => {
                let in_func = walker
                    .parent_node(cursor)
                    .map(|p| matches!(walker.ast().node(p), Node::Func { .. }))
                    .unwrap_or(false);
                if !in_func {
                    self.push(cursor, id);
                }
            }
            Node::Func { params, .. } => {
                let params = params.clone();
                self.push(cursor, id);
                let mut renamed = Vec::with_capacity(params.len());
                for param in &params {
                    renamed.push(Name::Ident(self.bind(param, id)?));
                }
                if let Node::Func { params, .. } = walker.ast_mut().node_mut(id) {
                    *params = renamed;
                }
            }
            Node::Declare { name, .. } => {
                let name = name.clone();
                let fresh = self.bind(&name, id)?;
                if let Node::Declare { name, .. } = walker.ast_mut().node_mut(id) {
                    *name = Name::Ident(fresh);
                }
            }
            Node::Identifier { name } => {
                let fresh = self.resolve(name)?;
                if let Node::Identifier { name } = walker.ast_mut().node_mut(id) {
                    *name = Name::Ident(fresh);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn leave(&mut self, _walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
        if self.frames.last().map(|f| f.cursor) == Some(cursor) {
            self.frames.pop();
        }
        Ok(())
    }
}

/// Renames all bindings under `root` with the strategy configured in
/// `options`, rewriting every reference to match.
pub fn normalize_program(ast: &mut Ast, root: NodeId, options: &NameOptions) -> Result<()> {
    let namer = Namer::new(options);
    let mut normalizer = Normalizer::new(&namer);
    walk(ast, root, &mut normalizer)?;
    debug!(renamed = normalizer.renamed, "normalized bindings");
    Ok(())
}
