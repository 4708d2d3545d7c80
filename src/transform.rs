//! Small tree-building helpers shared by the rewriting passes.

use crate::ast::{Ast, Name, Node, NodeId};
use crate::error::{Error, Result};

/// `let v = e;` -> `v = e`. The value node is shared, so the declaration
/// should be emptied or dropped afterwards.
pub fn declare_to_assign(ast: &mut Ast, declare: NodeId) -> Result<NodeId> {
    let Node::Declare { name, value } = ast.node(declare) else {
        return Err(Error::Reactive(format!(
            "expected a declaration, found {}",
            ast.node(declare).type_name()
        )));
    };
    let (name, value) = (name.clone(), *value);
    let value = value.ok_or_else(|| {
        Error::Reactive(format!("cannot assign from declaration of {} with no value", name))
    })?;
    let target = ast.ident(name);
    Ok(ast.assign(target, value))
}

/// `() => { statements }`
pub fn closure(ast: &mut Ast, statements: Vec<NodeId>) -> NodeId {
    let body = ast.block(statements);
    ast.func(Vec::new(), body)
}

/// `expression;`
pub fn expression_statement(ast: &mut Ast, expression: NodeId) -> NodeId {
    ast.expression(expression)
}

/// `let name = expression;`
pub fn declare(ast: &mut Ast, name: impl Into<Name>, expression: NodeId) -> NodeId {
    ast.declare(name, Some(expression))
}

/// `name();` Returns the statement and the identifier naming the callee.
pub fn call_statement(ast: &mut Ast, name: impl Into<Name>) -> (NodeId, NodeId) {
    let callee = ast.ident(name);
    let call = ast.call(callee, Vec::new());
    (ast.expression(call), callee)
}

/// Detaches and returns the value of a declaration, leaving `let v;`.
pub fn take_value(ast: &mut Ast, declare: NodeId) -> Option<NodeId> {
    match ast.node_mut(declare) {
        Node::Declare { value, .. } => value.take(),
        _ => None,
    }
}
