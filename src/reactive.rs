//! Reactive rewriting.
//!
//! `reactive(x)` marks a read whose enclosing statement must be re-run when
//! `x` is reassigned. The tracker collects those marks per statement and
//! unwraps them in place; when the statement is left it is rewritten into an
//! update closure plus an immediate call, and the closure is registered
//! against every dependency. Later assignments to a dependency get calls to
//! every closure that (transitively) depends on it.
//!
//! A closure whose dependencies live in enclosing blocks is bound in the
//! outermost of them (`let set_a;` there, `set_a = () => ..` in place) so
//! assignments out there can call it. Hoisting stops at the enclosing
//! function; assignments that cannot see a closure do not call it.

use tracing::debug;

use crate::ast::{Ast, Field, Name, Node, NodeId, Placeholder};
use crate::error::{Error, Result};
use crate::scope::{ScopeContext, ScopeId, ScopeTree, UpdateId};
use crate::transform;
use crate::walker::{CursorId, Walker};

/// A `reactive(...)` occurrence found inside a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveRecord {
    pub name: Name,
    /// The wrapper sat on the left of an assignment.
    pub assign_target: bool,
    /// Statement the record belongs to.
    pub statement: NodeId,
}

#[derive(Debug)]
struct Frame {
    cursor: CursorId,
    statement: NodeId,
    scope: ScopeId,
    records: Vec<ReactiveRecord>,
}

/// Collects reactive records for the innermost enclosing declaration,
/// expression or `return` statement. Records of a nested `return` can be
/// handed up to the enclosing statement with [`ReactiveTracker::hand_up`].
#[derive(Debug, Default)]
pub struct ReactiveTracker {
    frames: Vec<Frame>,
}

impl ReactiveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `scope` is the scope the entered position sits in.
    pub fn enter(
        &mut self,
        walker: &mut Walker<'_>,
        cursor: CursorId,
        scope: ScopeId,
    ) -> Result<()> {
        let Some((id, node)) = walker.get(cursor) else {
            return Ok(());
        };
        match node {
            Node::Declare { .. } | Node::Expression { .. } | Node::Return { .. } => {
                self.open(cursor, id, scope)
            }
            Node::Reactive { value } => {
                let inner = *value;
                let assign_target = walker.field(cursor) == Some(Field::Left)
                    && walker
                        .parent_node(cursor)
                        .map(|p| matches!(walker.ast().node(p), Node::Assign { .. }))
                        .unwrap_or(false);
                let name = match walker.ast().node(inner) {
                    Node::Identifier { name } => name.clone(),
                    other => {
                        return Err(Error::Reactive(format!(
                            "reactive() expects an identifier, found {}",
                            other.type_name()
                        )))
                    }
                };
                let Some(frame) = self.frames.last_mut() else {
                    return Err(Error::Reactive(if assign_target {
                        format!("reactive({}) cannot be assigned outside a statement", name)
                    } else {
                        format!("reactive({}) must appear inside a statement", name)
                    }));
                };
                frame.records.push(ReactiveRecord { name, assign_target, statement: frame.statement });
                walker.replace(cursor, inner)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Records gathered for `cursor`'s statement, if it opened a frame.
    pub fn leave(&mut self, cursor: CursorId) -> Vec<ReactiveRecord> {
        if self.frames.last().map(|f| f.cursor) == Some(cursor) {
            self.frames.pop().map(|f| f.records).unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Scope of the innermost open statement.
    pub fn scope(&self) -> Option<ScopeId> {
        self.frames.last().map(|f| f.scope)
    }

    /// Gives records left by a nested statement to the innermost open one.
    pub fn hand_up(&mut self, records: Vec<ReactiveRecord>) {
        if let Some(frame) = self.frames.last_mut() {
            let statement = frame.statement;
            frame
                .records
                .extend(records.into_iter().map(|r| ReactiveRecord { statement, ..r }));
        }
    }

    fn open(&mut self, cursor: CursorId, statement: NodeId, scope: ScopeId) {
        self.frames.push(Frame { cursor, statement, scope, records: Vec::new() });
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT REWRITE
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrites the statement at `cursor` into an update closure and registers
/// the closure against each dependency named by `records`.
pub fn handle_reactives(
    walker: &mut Walker<'_>,
    cursor: CursorId,
    records: &[ReactiveRecord],
    ctx: &mut ScopeContext,
) -> Result<()> {
    if records.is_empty() {
        return Err(Error::Reactive("no reactive records to rewrite".to_string()));
    }
    let mut deps: Vec<Name> = Vec::new();
    for record in records {
        if !deps.contains(&record.name) {
            deps.push(record.name.clone());
        }
    }

    let scope = ctx.current();
    let mut sources = Vec::with_capacity(deps.len());
    for dep in &deps {
        let declaring = ctx.tree.lookup(scope, dep).ok_or_else(|| Error::undeclared(dep))?;
        sources.push((declaring, dep.clone()));
    }
    let home = closure_home(walker.ast(), &ctx.tree, scope, &sources);

    let Some((statement, node)) = walker.get(cursor) else {
        return Err(Error::Reactive("reactive records on a value position".to_string()));
    };
    let site = Site { cursor, statement, scope, home };
    let (closure, target) = match node {
        Node::Declare { name, .. } => {
            let name = name.clone();
            rewrite_declare(walker, site, name, ctx)?
        }
        Node::Expression { .. } => rewrite_expression(walker, site, &deps, ctx)?,
        Node::Return { .. } => rewrite_return(walker, site, &deps, ctx)?,
        other => {
            return Err(Error::Reactive(format!(
                "cannot rewrite reactive {} statement",
                other.type_name()
            )))
        }
    };

    let update = ctx.tree.add_update(home, closure, target);
    for (declaring, dep) in sources {
        debug!(dependency = %dep, update = update.0, "register reactive assign");
        ctx.tree.add_reactive_assign(declaring, dep, update);
    }
    Ok(())
}

/// Where a reactive statement is being rewritten.
#[derive(Debug, Clone, Copy)]
struct Site {
    cursor: CursorId,
    statement: NodeId,
    /// Scope holding the statement.
    scope: ScopeId,
    /// Scope the update closure is bound in.
    home: ScopeId,
}

fn is_function_scope(ast: &Ast, tree: &ScopeTree, scope: ScopeId) -> bool {
    tree.scope(scope).node.map(|n| matches!(ast.node(n), Node::Func { .. })).unwrap_or(false)
}

/// Outermost scope, up to the enclosing function, that declares one of
/// `sources` or binds a closure maintaining one.
fn closure_home(
    ast: &Ast,
    tree: &ScopeTree,
    scope: ScopeId,
    sources: &[(ScopeId, Name)],
) -> ScopeId {
    let mut depth = tree.depth(scope);
    for (declaring, dep) in sources {
        depth = depth.min(tree.depth(*declaring));
        for update in tree.updates() {
            if matches!(&update.target, Some((s, n)) if s == declaring && n == dep) {
                depth = depth.min(tree.depth(update.scope));
            }
        }
    }
    let mut home = scope;
    while tree.depth(home) > depth && !is_function_scope(ast, tree, home) {
        match tree.parent(home) {
            Some(parent) => home = parent,
            None => break,
        }
    }
    home
}

/// Statement of the home scope's block that contains the site.
fn home_statement(walker: &Walker<'_>, site: Site, ctx: &ScopeContext) -> Result<CursorId> {
    let unbound = || Error::Reactive("update closure has no block to be bound in".to_string());
    let home = ctx.tree.scope(site.home).node.ok_or_else(unbound)?;
    let block = match walker.ast().node(home) {
        Node::Func { body, .. } => *body,
        _ => home,
    };
    let mut current = Some(site.cursor);
    while let Some(c) = current {
        if walker.parent_node(c) == Some(block) && walker.index(c).is_some() {
            return Ok(c);
        }
        current = walker.parent(c);
    }
    Err(unbound())
}

/// `let closure = func;`, or `closure = func;` with `let closure;` placed in
/// the home scope when that is not the statement's own scope.
fn bind_closure(
    walker: &mut Walker<'_>,
    site: Site,
    closure: Placeholder,
    func: NodeId,
    ctx: &mut ScopeContext,
) -> Result<NodeId> {
    if site.home == site.scope {
        let decl = transform::declare(walker.ast_mut(), closure, func);
        ctx.tree.add_declaration(site.scope, closure.into(), decl)?;
        return Ok(decl);
    }
    let anchor = home_statement(walker, site, ctx)?;
    let ast = walker.ast_mut();
    let hoisted = ast.declare(closure, None);
    let target = ast.ident(closure);
    let assign = ast.assign(target, func);
    let statement = transform::expression_statement(ast, assign);

    debug!(closure = closure.0, scope = site.home.0, "bind update closure in enclosing scope");
    walker.insert_before(anchor, vec![hoisted])?;
    ctx.tree.add_declaration(site.home, closure.into(), hoisted)?;
    ctx.tree.add_assignment(site.scope, closure.into(), target)?;
    Ok(statement)
}

fn closure_hint(prefix: &str, deps: &[Name]) -> String {
    let names: Vec<&str> = deps.iter().filter_map(Name::as_ident).collect();
    if names.is_empty() {
        prefix.to_string()
    } else {
        format!("{}_{}", prefix, names.join("_"))
    }
}

/// `let v = e;` -> `let v; let set_v = () => { v = e; }; set_v();`
fn rewrite_declare(
    walker: &mut Walker<'_>,
    site: Site,
    name: Name,
    ctx: &mut ScopeContext,
) -> Result<(Placeholder, Option<(ScopeId, Name)>)> {
    let ast = walker.ast_mut();
    let hint = match &name {
        Name::Ident(s) => format!("set_{}", s),
        Name::Placeholder(_) => "set".to_string(),
    };
    let closure = ast.placeholder(Some(&hint));
    let assign = transform::declare_to_assign(ast, site.statement)?;
    transform::take_value(ast, site.statement);
    let target = match ast.node(assign) {
        Node::Assign { left, .. } => *left,
        _ => assign,
    };
    let body = transform::expression_statement(ast, assign);
    let func = transform::closure(ast, vec![body]);
    let (call, callee) = transform::call_statement(ast, closure);
    let binding = bind_closure(walker, site, closure, func, ctx)?;

    debug!(binding = %name, "rewrite reactive declaration");
    walker.insert_after(site.cursor, vec![binding, call])?;

    ctx.tree.add_assignment(site.scope, name.clone(), target)?;
    ctx.tree.add_reference(site.scope, closure.into(), callee)?;
    Ok((closure, Some((site.scope, name))))
}

/// `e;` -> `let update = () => { e; }; update();`
///
/// The call takes the statement's place, so calls already queued after the
/// statement still run after it. When `e` assigns a binding, the closure
/// maintains that binding.
fn rewrite_expression(
    walker: &mut Walker<'_>,
    site: Site,
    deps: &[Name],
    ctx: &mut ScopeContext,
) -> Result<(Placeholder, Option<(ScopeId, Name)>)> {
    let assigned = match walker.ast().node(site.statement) {
        Node::Expression { value } => match walker.ast().node(*value) {
            Node::Assign { left, .. } => match walker.ast().node(*left) {
                Node::Identifier { name } => Some(name.clone()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    };
    let target = assigned.and_then(|name| ctx.tree.lookup(site.scope, &name).map(|s| (s, name)));

    let ast = walker.ast_mut();
    let closure = ast.placeholder(Some(&closure_hint("update", deps)));
    let func = transform::closure(ast, vec![site.statement]);
    let (call, callee) = transform::call_statement(ast, closure);
    let binding = bind_closure(walker, site, closure, func, ctx)?;

    debug!(target = ?target.as_ref().map(|(_, n)| n.to_string()), "rewrite reactive expression");
    walker.insert_before(site.cursor, vec![binding])?;
    walker.replace(site.cursor, call)?;

    ctx.tree.add_reference(site.scope, closure.into(), callee)?;
    Ok((closure, target))
}

/// `return e;` -> `let result; let update = () => { result = e; }; update(); return result;`
///
/// An arrow expression body becomes a block holding the same statements.
fn rewrite_return(
    walker: &mut Walker<'_>,
    site: Site,
    deps: &[Name],
    ctx: &mut ScopeContext,
) -> Result<(Placeholder, Option<(ScopeId, Name)>)> {
    let ast = walker.ast_mut();
    let value = match ast.node(site.statement) {
        Node::Return { value: Some(value) } => *value,
        _ => return Err(Error::Reactive("reactive return without a value".to_string())),
    };
    let result = ast.placeholder(Some("result"));
    let result_decl = ast.declare(result, None);
    let target = ast.ident(result);
    let assign = ast.assign(target, value);
    let body = transform::expression_statement(ast, assign);
    let func = transform::closure(ast, vec![body]);
    let closure = ast.placeholder(Some(&closure_hint("update", deps)));
    let (call, callee) = transform::call_statement(ast, closure);
    let returned = ast.ident(result);
    if let Node::Return { value } = ast.node_mut(site.statement) {
        *value = Some(returned);
    }
    let binding = bind_closure(walker, site, closure, func, ctx)?;

    debug!("rewrite reactive return");
    if walker.index(site.cursor).is_some() {
        walker.insert_before(site.cursor, vec![result_decl, binding, call])?;
    } else {
        let block = walker.ast_mut().block(vec![result_decl, binding, call, site.statement]);
        walker.replace(site.cursor, block)?;
    }

    ctx.tree.add_declaration(site.scope, result.into(), result_decl)?;
    ctx.tree.add_assignment(site.scope, result.into(), target)?;
    ctx.tree.add_reference(site.scope, closure.into(), callee)?;
    ctx.tree.add_reference(site.scope, result.into(), returned)?;
    Ok((closure, Some((site.scope, Name::Placeholder(result)))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPAGATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Called when leaving an `Assign`. A binding maintained by an update closure
/// is first cut loose from that closure's dependencies. If the assigned name
/// has dependents, calls to the update closures visible here are sequenced
/// right after the assignment; an assignment nested in a larger expression is
/// first hoisted into `let intermediate = (assign);` before the enclosing
/// statement.
pub fn propagate_assign(
    walker: &mut Walker<'_>,
    cursor: CursorId,
    ctx: &mut ScopeContext,
) -> Result<()> {
    let Some((assign, Node::Assign { left, .. })) = walker.get(cursor) else {
        return Ok(());
    };
    let Node::Identifier { name } = walker.ast().node(*left) else {
        return Ok(());
    };
    let name = name.clone();
    let scope = ctx.current();
    let Some(declaring) = ctx.tree.lookup(scope, &name) else {
        return Ok(());
    };
    if ctx.tree.unset_reactive(declaring, &name) > 0 {
        debug!(binding = %name, "assignment cuts binding loose from its dependencies");
    }
    let updates: Vec<UpdateId> = ctx
        .tree
        .dependents(declaring, &name)
        .into_iter()
        .filter(|u| ctx.tree.has(scope, &Name::Placeholder(ctx.tree.update(*u).name)))
        .collect();
    if updates.is_empty() {
        return Ok(());
    }

    let mut calls = Vec::with_capacity(updates.len());
    for update in &updates {
        let closure = ctx.tree.update(*update).name;
        let (call, callee) = transform::call_statement(walker.ast_mut(), closure);
        ctx.tree.add_reference(scope, closure.into(), callee)?;
        calls.push(call);
    }

    let parent = walker.parent(cursor);
    let whole_statement = parent
        .and_then(|p| walker.get(p))
        .map(|(_, node)| matches!(node, Node::Expression { .. }))
        .unwrap_or(false);
    debug!(binding = %name, updates = updates.len(), hoist = !whole_statement, "propagate assignment");

    match parent {
        Some(statement) if whole_statement => walker.insert_after(statement, calls),
        _ => {
            let unhoistable = || {
                Error::Reactive(format!(
                    "cannot hoist the assignment to {} out of its expression",
                    name
                ))
            };
            let statement = walker.ancestor(cursor, Node::is_statement).ok_or_else(unhoistable)?;
            let in_block = walker.index(statement).is_some();
            // `() => x = e` has no block to hoist into; it gets one.
            let arrow_body = !in_block
                && walker.field(statement) == Some(Field::Body)
                && walker
                    .parent_node(statement)
                    .map(|p| matches!(walker.ast().node(p), Node::Func { .. }))
                    .unwrap_or(false);
            if !in_block && !arrow_body {
                return Err(unhoistable());
            }

            let ast = walker.ast_mut();
            let intermediate = ast.placeholder(Some("intermediate"));
            let hoisted = transform::declare(ast, intermediate, assign);
            let replacement = ast.ident(intermediate);
            let mut nodes = Vec::with_capacity(calls.len() + 2);
            nodes.push(hoisted);
            nodes.extend(calls);
            walker.replace(cursor, replacement)?;
            if in_block {
                walker.insert_before(statement, nodes)?;
            } else {
                let Some(body) = walker.node(statement) else {
                    return Err(unhoistable());
                };
                nodes.push(body);
                let block = walker.ast_mut().block(nodes);
                walker.replace(statement, block)?;
            }
            ctx.tree.add_declaration(scope, intermediate.into(), hoisted)?;
            ctx.tree.add_reference(scope, intermediate.into(), replacement)?;
            Ok(())
        }
    }
}
