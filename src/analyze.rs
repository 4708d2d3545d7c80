//! Scope analysis driver.
//!
//! One walk resolves scopes and performs the reactive rewrite; placeholders
//! introduced along the way are then given final names.

use tracing::{debug, info};

use crate::ast::{Ast, Node, NodeId};
use crate::error::Result;
use crate::namer::Namer;
use crate::reactive::{handle_reactives, propagate_assign, ReactiveRecord, ReactiveTracker};
use crate::scope::{ScopeContext, ScopeTree};
use crate::walker::{walk, CursorId, Visitor, Walker};

#[derive(Debug, Default)]
struct Analyzer {
    scopes: ScopeContext,
    tracker: ReactiveTracker,
}

impl Visitor for Analyzer {
    fn enter(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
        self.tracker.enter(walker, cursor, self.scopes.current())?;
        self.scopes.enter(walker, cursor)
    }

    fn leave(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
        if matches!(walker.get(cursor), Some((_, Node::Assign { .. }))) {
            propagate_assign(walker, cursor, &mut self.scopes)?;
        }
        let records = self.tracker.leave(cursor);
        if self.belongs_to_enclosing(walker, cursor, &records) {
            self.tracker.hand_up(records);
        } else if !records.is_empty() {
            handle_reactives(walker, cursor, &records, &mut self.scopes)?;
        }
        self.scopes.leave(walker, cursor);
        Ok(())
    }
}

impl Analyzer {
    /// A `return` inside another reactive statement leaves its reads to that
    /// statement when each one names the same binding there.
    fn belongs_to_enclosing(
        &self,
        walker: &Walker<'_>,
        cursor: CursorId,
        records: &[ReactiveRecord],
    ) -> bool {
        if records.is_empty() || !matches!(walker.get(cursor), Some((_, Node::Return { .. }))) {
            return false;
        }
        let Some(outer) = self.tracker.scope() else {
            return false;
        };
        let tree = &self.scopes.tree;
        let here = self.scopes.current();
        records.iter().all(|r| match tree.lookup(here, &r.name) {
            Some(declaring) => tree.lookup(outer, &r.name) == Some(declaring),
            None => false,
        })
    }
}

/// Resolves every name under `root`, rewrites reactive statements and
/// substitutes placeholders. Returns the populated scope tree.
pub fn analyze_scopes(ast: &mut Ast, root: NodeId, namer: &Namer) -> Result<ScopeTree> {
    let mut analyzer = Analyzer::default();
    walk(ast, root, &mut analyzer)?;
    debug_assert!(analyzer.scopes.is_balanced(), "scope stack left unbalanced");
    let mut tree = analyzer.scopes.into_tree();
    debug!(scopes = tree.len(), updates = tree.updates().len(), "scopes resolved");
    tree.sub_placeholders(ast, namer)?;
    info!(scopes = tree.len(), "analysis complete");
    Ok(tree)
}
