//! Lexical scopes.
//!
//! [`ScopeTree`] is an arena of scopes mirroring block and function nesting.
//! It outlives the walk that builds it so the final placeholder sweep can run
//! over every scope. [`ScopeContext`] drives the tree from walker callbacks.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::ast::{Ast, Field, Name, Node, NodeId, Placeholder};
use crate::error::{Error, Result};
use crate::namer::{is_reserved, Namer};
use crate::walker::{CursorId, Walker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a synthesized update closure. Ids grow in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpdateId(pub u32);

/// A zero-argument closure that recomputes one reactive binding.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateClosure {
    /// Name the closure is bound to.
    pub name: Placeholder,
    /// Scope the closure is declared in.
    pub scope: ScopeId,
    /// Binding the closure assigns, as (declaring scope, name).
    pub target: Option<(ScopeId, Name)>,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Block or function that opened the scope.
    pub node: Option<NodeId>,
    declarations: Vec<(Name, NodeId)>,
    declared: HashMap<Name, usize>,
    references: HashMap<Name, Vec<NodeId>>,
    assignments: HashMap<Name, Vec<NodeId>>,
    reactive_assigns: HashMap<Name, Vec<UpdateId>>,
    resolved: HashMap<Placeholder, String>,
}

impl Scope {
    pub fn has_immediate(&self, name: &Name) -> bool {
        self.declared.contains_key(name)
    }

    /// Binder node of a name declared directly in this scope.
    pub fn declaration(&self, name: &Name) -> Option<NodeId> {
        self.declared.get(name).map(|&i| self.declarations[i].1)
    }

    /// Declarations in the order they were made.
    pub fn declarations(&self) -> impl Iterator<Item = (&Name, NodeId)> {
        self.declarations.iter().map(|(n, id)| (n, *id))
    }

    pub fn references(&self, name: &Name) -> &[NodeId] {
        self.references.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn assignments(&self, name: &Name) -> &[NodeId] {
        self.assignments.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reactive_assigns(&self, name: &Name) -> &[UpdateId] {
        self.reactive_assigns.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Final name chosen for a placeholder declared here.
    pub fn resolved(&self, p: Placeholder) -> Option<&str> {
        self.resolved.get(&p).map(String::as_str)
    }

    fn uses_ident(&self, name: &str) -> bool {
        let key = Name::ident(name);
        self.references.contains_key(&key) || self.assignments.contains_key(&key)
    }

    fn rekey(&mut self, from: &Name, to: &Name) {
        fn move_key<T>(map: &mut HashMap<Name, Vec<T>>, from: &Name, to: &Name) {
            if let Some(items) = map.remove(from) {
                map.entry(to.clone()).or_default().extend(items);
            }
        }
        move_key(&mut self.references, from, to);
        move_key(&mut self.assignments, from, to);
        move_key(&mut self.reactive_assigns, from, to);
        if let Some(i) = self.declared.remove(from) {
            self.declarations[i].0 = to.clone();
            self.declared.insert(to.clone(), i);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    updates: Vec<UpdateClosure>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the root scope.
    pub fn new() -> Self {
        Self { scopes: vec![Scope::default()], updates: Vec::new() }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn add_scope(&mut self, parent: ScopeId, node: Option<NodeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope { parent: Some(parent), node, ..Scope::default() });
        self.scopes[parent.index()].children.push(id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).parent
    }

    /// Number of scopes from `id` up to and including the root.
    pub fn depth(&self, id: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = Some(id);
        while let Some(s) = current {
            depth += 1;
            current = self.parent(s);
        }
        depth
    }

    pub fn has_immediate(&self, scope: ScopeId, name: &Name) -> bool {
        self.scope(scope).has_immediate(name)
    }

    pub fn has(&self, scope: ScopeId, name: &Name) -> bool {
        self.lookup(scope, name).is_some()
    }

    /// Scope that declares `name` as seen from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &Name) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if self.has_immediate(s, name) {
                return Some(s);
            }
            current = self.parent(s);
        }
        None
    }

    /// Binder node of `name` as seen from `scope`.
    pub fn get(&self, scope: ScopeId, name: &Name) -> Result<NodeId> {
        self.lookup(scope, name)
            .and_then(|s| self.scope(s).declaration(name))
            .ok_or_else(|| Error::undeclared(name))
    }

    pub fn add_declaration(&mut self, scope: ScopeId, name: Name, binder: NodeId) -> Result<()> {
        if self.has_immediate(scope, &name) {
            return Err(Error::redeclared(&name));
        }
        trace!(scope = scope.0, %name, "declare");
        let s = self.scope_mut(scope);
        s.declared.insert(name.clone(), s.declarations.len());
        s.declarations.push((name, binder));
        Ok(())
    }

    /// Records a read of `name` at `site`. Returns the declaring scope.
    pub fn add_reference(&mut self, scope: ScopeId, name: Name, site: NodeId) -> Result<ScopeId> {
        let declaring = self.lookup(scope, &name).ok_or_else(|| Error::undeclared(&name))?;
        self.scope_mut(scope).references.entry(name).or_default().push(site);
        Ok(declaring)
    }

    /// Records a write of `name` at `site`. Returns the declaring scope.
    pub fn add_assignment(&mut self, scope: ScopeId, name: Name, site: NodeId) -> Result<ScopeId> {
        let declaring = self.lookup(scope, &name).ok_or_else(|| Error::undeclared(&name))?;
        self.scope_mut(scope).assignments.entry(name).or_default().push(site);
        Ok(declaring)
    }

    pub fn add_update(
        &mut self,
        scope: ScopeId,
        name: Placeholder,
        target: Option<(ScopeId, Name)>,
    ) -> UpdateId {
        let id = UpdateId(self.updates.len() as u32);
        self.updates.push(UpdateClosure { name, scope, target });
        id
    }

    pub fn update(&self, id: UpdateId) -> &UpdateClosure {
        &self.updates[id.0 as usize]
    }

    pub fn updates(&self) -> &[UpdateClosure] {
        &self.updates
    }

    /// Registers `update` to re-run whenever `name`, declared in `scope`, is
    /// reassigned.
    pub fn add_reactive_assign(&mut self, scope: ScopeId, name: Name, update: UpdateId) {
        let list = self.scope_mut(scope).reactive_assigns.entry(name).or_default();
        if !list.contains(&update) {
            list.push(update);
        }
    }

    /// Every update closure that must re-run after `name` (declared in
    /// `scope`) changes: its own registrations, then those of each closure's
    /// target, transitively. A closure comes after every reached closure whose
    /// target it reads; ties keep creation order.
    pub fn dependents(&self, scope: ScopeId, name: &Name) -> Vec<UpdateId> {
        let mut reached = BTreeSet::new();
        let mut queue = vec![(scope, name.clone())];
        while let Some((s, n)) = queue.pop() {
            for &update in self.scope(s).reactive_assigns(&n) {
                if reached.insert(update) {
                    if let Some((ts, tn)) = &self.update(update).target {
                        queue.push((*ts, tn.clone()));
                    }
                }
            }
        }

        let mut waiting: HashMap<UpdateId, usize> = reached.iter().map(|&u| (u, 0)).collect();
        let mut readers: HashMap<UpdateId, Vec<UpdateId>> = HashMap::new();
        for &update in &reached {
            let Some((ts, tn)) = &self.update(update).target else {
                continue;
            };
            for &reader in self.scope(*ts).reactive_assigns(tn) {
                if reader != update && reached.contains(&reader) {
                    readers.entry(update).or_default().push(reader);
                    *waiting.entry(reader).or_default() += 1;
                }
            }
        }

        let mut ready: BTreeSet<UpdateId> =
            waiting.iter().filter(|&(_, &n)| n == 0).map(|(&u, _)| u).collect();
        let mut order = Vec::with_capacity(reached.len());
        while let Some(update) = ready.pop_first() {
            order.push(update);
            for reader in readers.get(&update).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(n) = waiting.get_mut(reader) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(*reader);
                    }
                }
            }
        }
        // Closures feeding each other in a cycle keep creation order.
        if order.len() < reached.len() {
            let placed: HashSet<UpdateId> = order.iter().copied().collect();
            order.extend(reached.into_iter().filter(|u| !placed.contains(u)));
        }
        order
    }

    /// Cuts every closure that maintains `name` (declared in `scope`) loose
    /// from its dependencies, so a plain assignment to the binding sticks.
    /// Returns how many registrations were dropped.
    pub fn unset_reactive(&mut self, scope: ScopeId, name: &Name) -> usize {
        let cut: Vec<UpdateId> = self
            .updates
            .iter()
            .enumerate()
            .filter(|(_, u)| matches!(&u.target, Some((s, n)) if *s == scope && n == name))
            .map(|(i, _)| UpdateId(i as u32))
            .collect();
        if cut.is_empty() {
            return 0;
        }
        let mut removed = 0;
        for s in &mut self.scopes {
            for list in s.reactive_assigns.values_mut() {
                let before = list.len();
                list.retain(|u| !cut.contains(u));
                removed += before - list.len();
            }
        }
        if removed > 0 {
            trace!(scope = scope.0, %name, removed, "unset reactive");
        }
        removed
    }

    fn subtree(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut out = vec![scope];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.scope(out[i]).children.iter().copied());
            i += 1;
        }
        out
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLACEHOLDER SUBSTITUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Replaces every placeholder declaration, and each of its uses, with a
    /// printable name chosen by `namer`. Scopes are processed parents first.
    pub fn sub_placeholders(&mut self, ast: &mut Ast, namer: &Namer) -> Result<()> {
        for index in 0..self.scopes.len() {
            let scope = ScopeId(index as u32);
            let pending: Vec<(Placeholder, NodeId)> = self
                .scope(scope)
                .declarations()
                .filter_map(|(name, binder)| match name {
                    Name::Placeholder(p) => Some((*p, binder)),
                    Name::Ident(_) => None,
                })
                .collect();
            for (p, binder) in pending {
                self.sub_placeholder(ast, namer, scope, p, binder)?;
            }
        }

        for scope in &self.scopes {
            let leftover = scope
                .references
                .keys()
                .chain(scope.assignments.keys())
                .find(|name| name.is_placeholder());
            if let Some(name) = leftover {
                return Err(Error::SubName(format!("{} was never declared", name)));
            }
        }
        Ok(())
    }

    fn sub_placeholder(
        &mut self,
        ast: &mut Ast,
        namer: &Namer,
        scope: ScopeId,
        p: Placeholder,
        binder: NodeId,
    ) -> Result<()> {
        let key = Name::Placeholder(p);
        let subtree = self.subtree(scope);

        // Scopes on the way from each use back up to the declaration must not
        // shadow the chosen name.
        let mut path: HashSet<ScopeId> = HashSet::new();
        let mut sites: Vec<NodeId> = Vec::new();
        for &s in &subtree {
            let scope_data = self.scope(s);
            let uses = scope_data.references(&key).iter().chain(scope_data.assignments(&key));
            let before = sites.len();
            sites.extend(uses);
            if sites.len() > before {
                let mut current = Some(s);
                while let Some(c) = current {
                    if !path.insert(c) || c == scope {
                        break;
                    }
                    current = self.parent(c);
                }
            }
        }

        let name = namer.get_name(ast.hint(p), |candidate| {
            let ident = Name::ident(candidate);
            is_reserved(candidate)
                || namer.scope_has(self, scope, &ident)
                || path.iter().any(|&s| self.has_immediate(s, &ident))
                || subtree.iter().any(|&s| self.scope(s).uses_ident(candidate))
        });
        debug!(placeholder = p.0, hint = ?ast.hint(p), %name, uses = sites.len(), "substitute placeholder");

        sub_binder(ast, binder, p, &name)?;
        for site in sites {
            sub_site(ast, site, p, &name)?;
        }

        let ident = Name::ident(name.clone());
        for &s in &subtree {
            self.scope_mut(s).rekey(&key, &ident);
        }
        self.scope_mut(scope).resolved.insert(p, name);
        Ok(())
    }
}

fn sub_binder(ast: &mut Ast, binder: NodeId, p: Placeholder, name: &str) -> Result<()> {
    let key = Name::Placeholder(p);
    match ast.node_mut(binder) {
        Node::Declare { name: declared, .. } if *declared == key => {
            *declared = Name::ident(name);
            Ok(())
        }
        Node::Func { params, .. } => {
            let mut matching = params.iter_mut().filter(|param| **param == key);
            match (matching.next(), matching.next()) {
                (Some(param), None) => {
                    *param = Name::ident(name);
                    Ok(())
                }
                (None, _) => Err(Error::SubName(format!("no parameter binds {}", key))),
                (Some(_), Some(_)) => {
                    Err(Error::SubName(format!("several parameters bind {}", key)))
                }
            }
        }
        other => Err(Error::SubName(format!("{} does not bind {}", other.type_name(), key))),
    }
}

fn sub_site(ast: &mut Ast, site: NodeId, p: Placeholder, name: &str) -> Result<()> {
    let key = Name::Placeholder(p);
    match ast.node_mut(site) {
        Node::Identifier { name: used } if *used == key => {
            *used = Name::ident(name);
            Ok(())
        }
        other => Err(Error::SubName(format!("{} does not use {}", other.type_name(), key))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Maintains the scope stack while walking and records declarations,
/// references and assignments into a [`ScopeTree`].
#[derive(Debug, Clone)]
pub struct ScopeContext {
    pub tree: ScopeTree,
    stack: Vec<(CursorId, ScopeId)>,
}

impl Default for ScopeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeContext {
    pub fn new() -> Self {
        Self { tree: ScopeTree::new(), stack: Vec::new() }
    }

    pub fn current(&self) -> ScopeId {
        self.stack.last().map(|&(_, s)| s).unwrap_or_else(|| self.tree.root())
    }

    /// Depth of the current scope, the root counting as one.
    pub fn depth(&self) -> usize {
        self.tree.depth(self.current())
    }

    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn into_tree(self) -> ScopeTree {
        self.tree
    }

    pub fn enter(&mut self, walker: &Walker<'_>, cursor: CursorId) -> Result<()> {
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
                let scope = self.push(cursor, id);
                for param in params {
                    self.tree.add_declaration(scope, param, id)?;
                }
            }
            Node::Declare { name, .. } => {
                let name = name.clone();
                let scope = self.current();
                self.tree.add_declaration(scope, name, id)?;
            }
            Node::Identifier { name } => {
                let name = name.clone();
                let is_target = walker.field(cursor) == Some(Field::Left)
                    && walker
                        .parent_node(cursor)
                        .map(|p| matches!(walker.ast().node(p), Node::Assign { .. }))
                        .unwrap_or(false);
                let scope = self.current();
                if is_target {
                    self.tree.add_assignment(scope, name, id)?;
                } else {
                    self.tree.add_reference(scope, name, id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn leave(&mut self, _walker: &Walker<'_>, cursor: CursorId) {
        if let Some(&(top, scope)) = self.stack.last() {
            if top == cursor {
                trace!(scope = scope.0, "pop scope");
                self.stack.pop();
            }
        }
    }

    fn push(&mut self, cursor: CursorId, node: NodeId) -> ScopeId {
        let parent = self.current();
        let scope = self.tree.add_scope(parent, Some(node));
        trace!(scope = scope.0, depth = self.stack.len() + 1, "push scope");
        self.stack.push((cursor, scope));
        scope
    }
}
