//! Poly syntax tree.
//!
//! Nodes live in an [`Ast`] arena and refer to their children by [`NodeId`].
//! Each variant has a fixed field table ([`Node::fields`]) that drives the
//! walker, so traversal order is decided here and nowhere else.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ═══════════════════════════════════════════════════════════════════════════════
// IDS AND NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Index of a node inside an [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An opaque stand-in for a binding whose printable name is decided later.
///
/// Two placeholders are equal only if they were minted by the same call to
/// [`Ast::placeholder`]. The optional hint lives in the arena's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placeholder(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Name {
    Ident(String),
    Placeholder(Placeholder),
}

impl Name {
    pub fn ident(name: impl Into<String>) -> Self {
        Name::Ident(name.into())
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Name::Ident(s) => Some(s),
            Name::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Name::Placeholder(_))
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::Ident(s.to_string())
    }
}

impl From<Placeholder> for Name {
    fn from(p: Placeholder) -> Self {
        Name::Placeholder(p)
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Name::Ident(s) => write!(f, "{}", s),
            Name::Placeholder(p) => write!(f, "<placeholder #{}>", p.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Null,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Statements
    Block { body: Vec<NodeId> },
    Declare { name: Name, value: Option<NodeId> },
    Return { value: Option<NodeId> },
    Expression { value: NodeId },

    // Expressions
    Literal { value: LiteralValue },
    Identifier { name: Name },
    Plus { left: NodeId, right: NodeId },
    Assign { left: NodeId, right: NodeId },
    Reactive { value: NodeId },
    List { value: Vec<NodeId> },
    Element { tag: String, attributes: Vec<NodeId>, children: Vec<NodeId> },
    Func { params: Vec<Name>, body: NodeId },
    Call { func: NodeId, arguments: Vec<NodeId> },

    // Attributes
    NormalAttribute { key: String, value: Option<NodeId> },
    EventAttribute { event: String, handler: NodeId },
}

/// Named field of a node. The meaning of a field depends on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Body,
    Name,
    Value,
    Left,
    Right,
    Tag,
    Attributes,
    Children,
    Params,
    Func,
    Arguments,
    Key,
    Event,
    Handler,
}

/// How the walker treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Always holds one child node.
    Node,
    /// Holds a node or nothing; nothing is visited as a value position.
    OptionalNode,
    /// Ordered child nodes.
    NodeArray,
    /// Plain data visited as a value position.
    Value,
    /// Ordered plain data.
    ValueArray,
}

use FieldKind as K;

const BLOCK_FIELDS: &[(Field, FieldKind)] = &[(Field::Body, K::NodeArray)];
const DECLARE_FIELDS: &[(Field, FieldKind)] =
    &[(Field::Name, K::Value), (Field::Value, K::OptionalNode)];
const RETURN_FIELDS: &[(Field, FieldKind)] = &[(Field::Value, K::OptionalNode)];
const EXPRESSION_FIELDS: &[(Field, FieldKind)] = &[(Field::Value, K::Node)];
const LITERAL_FIELDS: &[(Field, FieldKind)] = &[(Field::Value, K::Value)];
const IDENTIFIER_FIELDS: &[(Field, FieldKind)] = &[(Field::Name, K::Value)];
const BINARY_FIELDS: &[(Field, FieldKind)] = &[(Field::Left, K::Node), (Field::Right, K::Node)];
const REACTIVE_FIELDS: &[(Field, FieldKind)] = &[(Field::Value, K::Node)];
const LIST_FIELDS: &[(Field, FieldKind)] = &[(Field::Value, K::NodeArray)];
const ELEMENT_FIELDS: &[(Field, FieldKind)] = &[
    (Field::Tag, K::Value),
    (Field::Attributes, K::NodeArray),
    (Field::Children, K::NodeArray),
];
const FUNC_FIELDS: &[(Field, FieldKind)] = &[(Field::Params, K::ValueArray), (Field::Body, K::Node)];
const CALL_FIELDS: &[(Field, FieldKind)] =
    &[(Field::Func, K::Node), (Field::Arguments, K::NodeArray)];
const NORMAL_ATTRIBUTE_FIELDS: &[(Field, FieldKind)] =
    &[(Field::Key, K::Value), (Field::Value, K::OptionalNode)];
const EVENT_ATTRIBUTE_FIELDS: &[(Field, FieldKind)] =
    &[(Field::Event, K::Value), (Field::Handler, K::Node)];

impl Node {
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Block { .. } => "Block",
            Node::Declare { .. } => "Declare",
            Node::Return { .. } => "Return",
            Node::Expression { .. } => "Expression",
            Node::Literal { .. } => "Literal",
            Node::Identifier { .. } => "Identifier",
            Node::Plus { .. } => "Plus",
            Node::Assign { .. } => "Assign",
            Node::Reactive { .. } => "Reactive",
            Node::List { .. } => "List",
            Node::Element { .. } => "Element",
            Node::Func { .. } => "Func",
            Node::Call { .. } => "Call",
            Node::NormalAttribute { .. } => "NormalAttribute",
            Node::EventAttribute { .. } => "EventAttribute",
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::Block { .. } | Node::Declare { .. } | Node::Return { .. } | Node::Expression { .. }
        )
    }

    /// Fields in traversal order.
    pub fn fields(&self) -> &'static [(Field, FieldKind)] {
        match self {
            Node::Block { .. } => BLOCK_FIELDS,
            Node::Declare { .. } => DECLARE_FIELDS,
            Node::Return { .. } => RETURN_FIELDS,
            Node::Expression { .. } => EXPRESSION_FIELDS,
            Node::Literal { .. } => LITERAL_FIELDS,
            Node::Identifier { .. } => IDENTIFIER_FIELDS,
            Node::Plus { .. } | Node::Assign { .. } => BINARY_FIELDS,
            Node::Reactive { .. } => REACTIVE_FIELDS,
            Node::List { .. } => LIST_FIELDS,
            Node::Element { .. } => ELEMENT_FIELDS,
            Node::Func { .. } => FUNC_FIELDS,
            Node::Call { .. } => CALL_FIELDS,
            Node::NormalAttribute { .. } => NORMAL_ATTRIBUTE_FIELDS,
            Node::EventAttribute { .. } => EVENT_ATTRIBUTE_FIELDS,
        }
    }

    pub fn field_kind(&self, field: Field) -> Option<FieldKind> {
        self.fields().iter().find(|(f, _)| *f == field).map(|(_, k)| *k)
    }

    /// Child held by a single-node field, if any.
    pub fn child(&self, field: Field) -> Option<NodeId> {
        match (self, field) {
            (Node::Declare { value, .. }, Field::Value)
            | (Node::Return { value }, Field::Value)
            | (Node::NormalAttribute { value, .. }, Field::Value) => *value,
            (Node::Expression { value }, Field::Value) | (Node::Reactive { value }, Field::Value) => {
                Some(*value)
            }
            (Node::Plus { left, .. }, Field::Left) | (Node::Assign { left, .. }, Field::Left) => {
                Some(*left)
            }
            (Node::Plus { right, .. }, Field::Right) | (Node::Assign { right, .. }, Field::Right) => {
                Some(*right)
            }
            (Node::Func { body, .. }, Field::Body) => Some(*body),
            (Node::Call { func, .. }, Field::Func) => Some(*func),
            (Node::EventAttribute { handler, .. }, Field::Handler) => Some(*handler),
            _ => None,
        }
    }

    /// Points a single-node field at `child`. Returns false if the variant has
    /// no such field.
    pub fn set_child(&mut self, field: Field, child: NodeId) -> bool {
        match (self, field) {
            (Node::Declare { value, .. }, Field::Value)
            | (Node::Return { value }, Field::Value)
            | (Node::NormalAttribute { value, .. }, Field::Value) => *value = Some(child),
            (Node::Expression { value }, Field::Value) | (Node::Reactive { value }, Field::Value) => {
                *value = child
            }
            (Node::Plus { left, .. }, Field::Left) | (Node::Assign { left, .. }, Field::Left) => {
                *left = child
            }
            (Node::Plus { right, .. }, Field::Right) | (Node::Assign { right, .. }, Field::Right) => {
                *right = child
            }
            (Node::Func { body, .. }, Field::Body) => *body = child,
            (Node::Call { func, .. }, Field::Func) => *func = child,
            (Node::EventAttribute { handler, .. }, Field::Handler) => *handler = child,
            _ => return false,
        }
        true
    }

    pub fn array(&self, field: Field) -> Option<&Vec<NodeId>> {
        match (self, field) {
            (Node::Block { body }, Field::Body) => Some(body),
            (Node::List { value }, Field::Value) => Some(value),
            (Node::Element { attributes, .. }, Field::Attributes) => Some(attributes),
            (Node::Element { children, .. }, Field::Children) => Some(children),
            (Node::Call { arguments, .. }, Field::Arguments) => Some(arguments),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, field: Field) -> Option<&mut Vec<NodeId>> {
        match (self, field) {
            (Node::Block { body }, Field::Body) => Some(body),
            (Node::List { value }, Field::Value) => Some(value),
            (Node::Element { attributes, .. }, Field::Attributes) => Some(attributes),
            (Node::Element { children, .. }, Field::Children) => Some(children),
            (Node::Call { arguments, .. }, Field::Arguments) => Some(arguments),
            _ => None,
        }
    }

    /// Length of a value-array field (function parameters).
    pub fn value_len(&self, field: Field) -> usize {
        match (self, field) {
            (Node::Func { params, .. }, Field::Params) => params.len(),
            _ => 0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARENA
// ═══════════════════════════════════════════════════════════════════════════════

/// Owns every node and the placeholder hint table.
///
/// Removing a node from its parent leaves the arena slot orphaned; ids are
/// never reused within one arena.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    hints: Vec<Option<String>>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Mints a fresh placeholder with an optional naming hint.
    pub fn placeholder(&mut self, hint: Option<&str>) -> Placeholder {
        let p = Placeholder(self.hints.len() as u32);
        self.hints.push(hint.map(str::to_string));
        p
    }

    pub fn hint(&self, p: Placeholder) -> Option<&str> {
        self.hints.get(p.0 as usize).and_then(|h| h.as_deref())
    }

    pub fn placeholder_count(&self) -> usize {
        self.hints.len()
    }

    // ─── builders ───────────────────────────────────────────────────────────

    pub fn block(&mut self, body: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Block { body })
    }

    pub fn declare(&mut self, name: impl Into<Name>, value: Option<NodeId>) -> NodeId {
        self.alloc(Node::Declare { name: name.into(), value })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.alloc(Node::Return { value })
    }

    pub fn expression(&mut self, value: NodeId) -> NodeId {
        self.alloc(Node::Expression { value })
    }

    pub fn number(&mut self, n: f64) -> NodeId {
        self.alloc(Node::Literal { value: LiteralValue::Number(n) })
    }

    pub fn string(&mut self, s: impl Into<String>) -> NodeId {
        self.alloc(Node::Literal { value: LiteralValue::String(s.into()) })
    }

    pub fn null(&mut self) -> NodeId {
        self.alloc(Node::Literal { value: LiteralValue::Null })
    }

    pub fn ident(&mut self, name: impl Into<Name>) -> NodeId {
        self.alloc(Node::Identifier { name: name.into() })
    }

    pub fn plus(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.alloc(Node::Plus { left, right })
    }

    pub fn assign(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.alloc(Node::Assign { left, right })
    }

    pub fn reactive(&mut self, value: NodeId) -> NodeId {
        self.alloc(Node::Reactive { value })
    }

    pub fn list(&mut self, value: Vec<NodeId>) -> NodeId {
        self.alloc(Node::List { value })
    }

    pub fn element(
        &mut self,
        tag: impl Into<String>,
        attributes: Vec<NodeId>,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.alloc(Node::Element { tag: tag.into(), attributes, children })
    }

    pub fn func(&mut self, params: Vec<Name>, body: NodeId) -> NodeId {
        self.alloc(Node::Func { params, body })
    }

    pub fn call(&mut self, func: NodeId, arguments: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Call { func, arguments })
    }

    pub fn attribute(&mut self, key: impl Into<String>, value: Option<NodeId>) -> NodeId {
        self.alloc(Node::NormalAttribute { key: key.into(), value })
    }

    pub fn event(&mut self, event: impl Into<String>, handler: NodeId) -> NodeId {
        self.alloc(Node::EventAttribute { event: event.into(), handler })
    }

    // ─── queries ────────────────────────────────────────────────────────────

    /// Name carried by an identifier or declaration.
    pub fn name_of(&self, id: NodeId) -> Option<&Name> {
        match self.node(id) {
            Node::Identifier { name } | Node::Declare { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Structural JSON view of a subtree, used for equality checks and
    /// debugging output. Placeholders render with their id and hint.
    pub fn view(&self, id: NodeId) -> Value {
        let node = self.node(id);
        let opt = |child: &Option<NodeId>| match child {
            Some(c) => self.view(*c),
            None => Value::Null,
        };
        let many = |ids: &[NodeId]| Value::Array(ids.iter().map(|c| self.view(*c)).collect());
        match node {
            Node::Block { body } => json!({ "type": "Block", "body": many(body) }),
            Node::Declare { name, value } => {
                json!({ "type": "Declare", "name": self.view_name(name), "value": opt(value) })
            }
            Node::Return { value } => json!({ "type": "Return", "value": opt(value) }),
            Node::Expression { value } => {
                json!({ "type": "Expression", "value": self.view(*value) })
            }
            Node::Literal { value } => json!({ "type": "Literal", "value": value }),
            Node::Identifier { name } => {
                json!({ "type": "Identifier", "name": self.view_name(name) })
            }
            Node::Plus { left, right } => {
                json!({ "type": "Plus", "left": self.view(*left), "right": self.view(*right) })
            }
            Node::Assign { left, right } => {
                json!({ "type": "Assign", "left": self.view(*left), "right": self.view(*right) })
            }
            Node::Reactive { value } => json!({ "type": "Reactive", "value": self.view(*value) }),
            Node::List { value } => json!({ "type": "List", "value": many(value) }),
            Node::Element { tag, attributes, children } => json!({
                "type": "Element",
                "tag": tag,
                "attributes": many(attributes),
                "children": many(children),
            }),
            Node::Func { params, body } => json!({
                "type": "Func",
                "params": params.iter().map(|p| self.view_name(p)).collect::<Vec<_>>(),
                "body": self.view(*body),
            }),
            Node::Call { func, arguments } => json!({
                "type": "Call",
                "func": self.view(*func),
                "arguments": many(arguments),
            }),
            Node::NormalAttribute { key, value } => {
                json!({ "type": "NormalAttribute", "key": key, "value": opt(value) })
            }
            Node::EventAttribute { event, handler } => json!({
                "type": "EventAttribute",
                "event": event,
                "handler": self.view(*handler),
            }),
        }
    }

    fn view_name(&self, name: &Name) -> Value {
        match name {
            Name::Ident(s) => Value::String(s.clone()),
            Name::Placeholder(p) => json!({ "placeholder": p.0, "hint": self.hint(*p) }),
        }
    }
}
