//! Depth-first walker over an [`Ast`] that tolerates mutation mid-walk.
//!
//! Every visited position gets a [`CursorId`]. A cursor remembers the parent
//! node and field it was reached through plus a cached index, but the index is
//! only a hint: before each callback and each mutation the walker looks the
//! node up again in the parent's live array. A cursor stashed during one visit
//! can therefore still splice siblings around its node during a later visit,
//! and a cursor whose node has been detached silently does nothing.
//!
//! Iteration over an array field resumes after the visited element plus
//! whatever that element inserted after itself, so nodes a cursor inserts
//! around itself are never visited.

use tracing::trace;

use crate::ast::{Ast, Field, FieldKind, Node, NodeId};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(u32);

impl CursorId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a cursor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkObject {
    Node(NodeId),
    /// A plain-data position: a name, tag, literal payload, parameter, or an
    /// absent optional child.
    Value,
}

#[derive(Debug, Clone)]
struct Cursor {
    object: WalkObject,
    parent: Option<CursorId>,
    parent_node: Option<NodeId>,
    field: Option<Field>,
    index: Option<usize>,
    skipped: bool,
    removed: bool,
    visiting: bool,
    /// Position the node occupied when it was removed.
    slot: usize,
    /// Nodes inserted after this cursor since the last sibling visit completed.
    after_run: usize,
    after_mark: u64,
    /// Nodes inserted after this cursor during its own visit.
    after_total: usize,
    /// Number of element visits completed in this node's array fields.
    completed_children: u64,
}

/// Callbacks invoked around every visited position.
///
/// `leave` runs for every `enter`, including skipped and removed cursors.
pub trait Visitor {
    fn enter(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
        let _ = (walker, cursor);
        Ok(())
    }

    fn leave(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
        let _ = (walker, cursor);
        Ok(())
    }
}

/// Walks the tree rooted at `root`, stopping at the first error.
pub fn walk<V: Visitor + ?Sized>(ast: &mut Ast, root: NodeId, visitor: &mut V) -> Result<()> {
    let mut walker = Walker { ast, cursors: Vec::new() };
    let root = walker.push(None, None, None, WalkObject::Node(root), None);
    walker.visit(visitor, root)
}

pub struct Walker<'a> {
    ast: &'a mut Ast,
    cursors: Vec<Cursor>,
}

impl<'a> Walker<'a> {
    pub fn ast(&self) -> &Ast {
        self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        self.ast
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CURSOR QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn object(&self, cursor: CursorId) -> WalkObject {
        self.cursor(cursor).object
    }

    /// Node currently referenced by the cursor, if it is a node position.
    pub fn node(&self, cursor: CursorId) -> Option<NodeId> {
        match self.cursor(cursor).object {
            WalkObject::Node(id) => Some(id),
            WalkObject::Value => None,
        }
    }

    /// The cursor's node together with its data.
    pub fn get(&self, cursor: CursorId) -> Option<(NodeId, &Node)> {
        self.node(cursor).map(|id| (id, self.ast.node(id)))
    }

    pub fn parent(&self, cursor: CursorId) -> Option<CursorId> {
        self.cursor(cursor).parent
    }

    pub fn parent_node(&self, cursor: CursorId) -> Option<NodeId> {
        self.cursor(cursor).parent_node
    }

    pub fn field(&self, cursor: CursorId) -> Option<Field> {
        self.cursor(cursor).field
    }

    /// Current index within the parent's array field. Node positions are
    /// re-resolved against the live array; `None` for non-array fields and
    /// detached nodes.
    pub fn index(&self, cursor: CursorId) -> Option<usize> {
        let cur = self.cursor(cursor);
        match cur.object {
            WalkObject::Node(_) => self.locate(cursor),
            WalkObject::Value => cur.index,
        }
    }

    pub fn is_removed(&self, cursor: CursorId) -> bool {
        self.cursor(cursor).removed
    }

    pub fn is_skipped(&self, cursor: CursorId) -> bool {
        self.cursor(cursor).skipped
    }

    /// Nearest cursor, starting with `cursor` itself, whose node satisfies
    /// `pred`.
    pub fn ancestor(&self, cursor: CursorId, pred: impl Fn(&Node) -> bool) -> Option<CursorId> {
        let mut current = Some(cursor);
        while let Some(c) = current {
            if let Some((_, node)) = self.get(c) {
                if pred(node) {
                    return Some(c);
                }
            }
            current = self.parent(c);
        }
        None
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATION
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn skip(&mut self, cursor: CursorId) {
        self.cursor_mut(cursor).skipped = true;
    }

    /// Splices `nodes` into the parent array directly before the cursor's node.
    /// Repeated calls accumulate in call order.
    pub fn insert_before(&mut self, cursor: CursorId, nodes: Vec<NodeId>) -> Result<()> {
        let (parent, field) = self
            .array_slot(cursor)
            .ok_or(Error::InsertBefore("cursor is not held in an array field"))?;
        let cur = self.cursor(cursor);
        let pos = if cur.removed {
            if !cur.visiting {
                return Ok(());
            }
            cur.slot
        } else {
            match self.locate(cursor) {
                Some(i) => i,
                None => return Ok(()),
            }
        };
        let count = nodes.len();
        trace!(?cursor, pos, count, "insert before");
        self.splice(parent, field, pos, nodes);
        let cur = self.cursor_mut(cursor);
        if cur.removed {
            cur.slot += count;
        } else {
            cur.index = Some(pos + count);
        }
        Ok(())
    }

    /// Splices `nodes` into the parent array after the cursor's node. Within
    /// one sibling visit, later calls land after earlier ones.
    pub fn insert_after(&mut self, cursor: CursorId, nodes: Vec<NodeId>) -> Result<()> {
        let (parent, field) = self
            .array_slot(cursor)
            .ok_or(Error::InsertAfter("cursor is not held in an array field"))?;
        let cur = self.cursor(cursor);
        let base = if cur.removed {
            if !cur.visiting {
                return Ok(());
            }
            cur.slot
        } else {
            match self.locate(cursor) {
                Some(i) => i + 1,
                None => return Ok(()),
            }
        };
        let mark = self.sibling_mark(cursor);
        let cur = self.cursor_mut(cursor);
        if cur.after_mark != mark {
            cur.after_mark = mark;
            cur.after_run = 0;
        }
        let pos = base + cur.after_run;
        let count = nodes.len();
        cur.after_run += count;
        if cur.visiting {
            cur.after_total += count;
        }
        trace!(?cursor, pos, count, "insert after");
        self.splice(parent, field, pos, nodes);
        Ok(())
    }

    /// Puts `node` where the cursor's node is. The cursor follows the
    /// replacement, and a replacement made during `enter` is descended into.
    pub fn replace(&mut self, cursor: CursorId, node: NodeId) -> Result<()> {
        let cur = self.cursor(cursor);
        let WalkObject::Node(old) = cur.object else {
            return Err(Error::Replace("value positions hold no node"));
        };
        let (Some(parent), Some(field)) = (cur.parent_node, cur.field) else {
            return Err(Error::Replace("the root has no parent"));
        };
        if cur.removed {
            return Ok(());
        }
        match self.ast.node(parent).field_kind(field) {
            Some(FieldKind::NodeArray) => {
                let Some(i) = self.locate(cursor) else {
                    return Ok(());
                };
                if let Some(array) = self.ast.node_mut(parent).array_mut(field) {
                    array[i] = node;
                }
                self.cursor_mut(cursor).index = Some(i);
            }
            Some(FieldKind::Node) | Some(FieldKind::OptionalNode) => {
                if self.ast.node(parent).child(field) != Some(old) {
                    return Ok(());
                }
                self.ast.node_mut(parent).set_child(field, node);
            }
            _ => return Err(Error::Replace("field holds no node")),
        }
        trace!(?cursor, from = old.0, to = node.0, "replace");
        self.cursor_mut(cursor).object = WalkObject::Node(node);
        Ok(())
    }

    /// Detaches the cursor's node from the parent array. Its subtree is not
    /// visited but `leave` still runs.
    pub fn remove(&mut self, cursor: CursorId) -> Result<()> {
        if self.cursor(cursor).removed {
            return Err(Error::Remove("cursor was already removed"));
        }
        let (parent, field) = self
            .array_slot(cursor)
            .ok_or(Error::Remove("cursor is not held in an array field"))?;
        let Some(i) = self.locate(cursor) else {
            return Ok(());
        };
        if let Some(array) = self.ast.node_mut(parent).array_mut(field) {
            array.remove(i);
        }
        trace!(?cursor, index = i, "remove");
        let cur = self.cursor_mut(cursor);
        cur.removed = true;
        cur.skipped = true;
        cur.slot = i;
        cur.index = None;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRAVERSAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn visit<V: Visitor + ?Sized>(&mut self, visitor: &mut V, cursor: CursorId) -> Result<()> {
        self.refresh(cursor);
        self.cursor_mut(cursor).visiting = true;
        visitor.enter(self, cursor)?;

        let (descend, object) = {
            let cur = self.cursor(cursor);
            (!cur.skipped && !cur.removed, cur.object)
        };
        if let (true, WalkObject::Node(node)) = (descend, object) {
            self.traverse(visitor, cursor, node)?;
        }

        self.refresh(cursor);
        visitor.leave(self, cursor)?;
        self.cursor_mut(cursor).visiting = false;
        Ok(())
    }

    fn traverse<V: Visitor + ?Sized>(
        &mut self,
        visitor: &mut V,
        cursor: CursorId,
        node: NodeId,
    ) -> Result<()> {
        let fields = self.ast.node(node).fields();
        for &(field, kind) in fields {
            match kind {
                FieldKind::Node | FieldKind::OptionalNode => {
                    let object = match self.ast.node(node).child(field) {
                        Some(child) => WalkObject::Node(child),
                        None => WalkObject::Value,
                    };
                    let child = self.push(Some(cursor), Some(node), Some(field), object, None);
                    self.visit(visitor, child)?;
                }
                FieldKind::Value => {
                    let child =
                        self.push(Some(cursor), Some(node), Some(field), WalkObject::Value, None);
                    self.visit(visitor, child)?;
                }
                FieldKind::ValueArray => {
                    let mut i = 0;
                    while i < self.ast.node(node).value_len(field) {
                        let child = self.push(
                            Some(cursor),
                            Some(node),
                            Some(field),
                            WalkObject::Value,
                            Some(i),
                        );
                        self.visit(visitor, child)?;
                        i += 1;
                    }
                }
                FieldKind::NodeArray => self.traverse_array(visitor, cursor, node, field)?,
            }
        }
        Ok(())
    }

    fn traverse_array<V: Visitor + ?Sized>(
        &mut self,
        visitor: &mut V,
        cursor: CursorId,
        node: NodeId,
        field: Field,
    ) -> Result<()> {
        let mut i = 0;
        while let Some(element) = self.element_at(node, field, i) {
            let child = self.push(
                Some(cursor),
                Some(node),
                Some(field),
                WalkObject::Node(element),
                Some(i),
            );
            self.visit(visitor, child)?;
            i = self.next_index(child, i);
            self.cursor_mut(cursor).completed_children += 1;
        }
        Ok(())
    }

    fn next_index(&self, cursor: CursorId, i: usize) -> usize {
        let cur = self.cursor(cursor);
        if cur.removed {
            return cur.slot + cur.after_total;
        }
        match self.locate(cursor) {
            Some(j) => j + 1 + cur.after_total,
            // Detached behind our back: whatever now sits at `i` is unvisited.
            None => i,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn push(
        &mut self,
        parent: Option<CursorId>,
        parent_node: Option<NodeId>,
        field: Option<Field>,
        object: WalkObject,
        index: Option<usize>,
    ) -> CursorId {
        let id = CursorId(self.cursors.len() as u32);
        let after_mark = parent.map(|p| self.cursor(p).completed_children).unwrap_or(0);
        self.cursors.push(Cursor {
            object,
            parent,
            parent_node,
            field,
            index,
            skipped: false,
            removed: false,
            visiting: false,
            slot: 0,
            after_run: 0,
            after_mark,
            after_total: 0,
            completed_children: 0,
        });
        id
    }

    #[inline]
    fn cursor(&self, cursor: CursorId) -> &Cursor {
        &self.cursors[cursor.index()]
    }

    #[inline]
    fn cursor_mut(&mut self, cursor: CursorId) -> &mut Cursor {
        &mut self.cursors[cursor.index()]
    }

    fn element_at(&self, node: NodeId, field: Field, i: usize) -> Option<NodeId> {
        self.ast.node(node).array(field).and_then(|a| a.get(i).copied())
    }

    /// Parent node and field when the cursor is a node held in an array.
    fn array_slot(&self, cursor: CursorId) -> Option<(NodeId, Field)> {
        let cur = self.cursor(cursor);
        if cur.object == WalkObject::Value {
            return None;
        }
        let (parent, field) = (cur.parent_node?, cur.field?);
        match self.ast.node(parent).field_kind(field) {
            Some(FieldKind::NodeArray) => Some((parent, field)),
            _ => None,
        }
    }

    /// Identity search for the cursor's node in its parent array, trying the
    /// cached index first.
    fn locate(&self, cursor: CursorId) -> Option<usize> {
        let cur = self.cursor(cursor);
        let WalkObject::Node(node) = cur.object else {
            return None;
        };
        let array = self.ast.node(cur.parent_node?).array(cur.field?)?;
        if let Some(hint) = cur.index {
            if array.get(hint) == Some(&node) {
                return Some(hint);
            }
        }
        array.iter().position(|&n| n == node)
    }

    fn refresh(&mut self, cursor: CursorId) {
        if self.cursor(cursor).object == WalkObject::Value {
            return;
        }
        if let Some(i) = self.locate(cursor) {
            self.cursor_mut(cursor).index = Some(i);
        }
    }

    fn sibling_mark(&self, cursor: CursorId) -> u64 {
        self.parent(cursor).map(|p| self.cursor(p).completed_children).unwrap_or(0)
    }

    fn splice(&mut self, parent: NodeId, field: Field, pos: usize, nodes: Vec<NodeId>) {
        if let Some(array) = self.ast.node_mut(parent).array_mut(field) {
            let pos = pos.min(array.len());
            array.splice(pos..pos, nodes);
        }
    }
}
