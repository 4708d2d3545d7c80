//! Printer back to JavaScript.
//!
//! Emits source text for a tree, then re-parses it and runs it through
//! `oxc_codegen` so output formatting is stable regardless of how the text
//! was assembled here.

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use tracing::trace;

use crate::ast::{Ast, LiteralValue, Name, Node, NodeId};
use crate::error::{Error, Result};
use crate::parse::{parse_options, source_type, REACTIVE_CALL};

/// Prints a program. A `Block` root prints as its statements.
pub fn program_to_source(ast: &Ast, root: NodeId) -> Result<String> {
    let mut printer = Printer::new(ast);
    match ast.node(root) {
        Node::Block { body } => {
            for &stmt in body {
                printer.statement(stmt)?;
                printer.out.push('\n');
            }
        }
        _ => printer.statement(root)?,
    }
    format_source(&printer.out)
}

pub fn statement_to_source(ast: &Ast, stmt: NodeId) -> Result<String> {
    let mut printer = Printer::new(ast);
    printer.statement(stmt)?;
    format_source(&printer.out)
}

/// Re-emits `source` through oxc codegen.
pub fn format_source(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).with_options(parse_options()).parse();
    if let Some(first) = ret.errors.first() {
        return Err(Error::Parse(format!("{} in printed output `{}`", first, source)));
    }
    Ok(Codegen::new().build(&ret.program).code)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

struct Printer<'a> {
    ast: &'a Ast,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self { ast, out: String::new() }
    }

    fn name(&mut self, name: &Name) -> Result<()> {
        match name {
            Name::Ident(s) => {
                self.out.push_str(s);
                Ok(())
            }
            Name::Placeholder(_) => Err(Error::SubName(format!("cannot print {}", name))),
        }
    }

    fn statement(&mut self, id: NodeId) -> Result<()> {
        trace!(node = id.0, "print statement");
        match self.ast.node(id) {
            Node::Block { body } => {
                self.out.push_str("{\n");
                for &stmt in body {
                    self.statement(stmt)?;
                    self.out.push('\n');
                }
                self.out.push('}');
            }
            Node::Declare { name, value } => {
                self.out.push_str("let ");
                self.name(name)?;
                if let Some(value) = value {
                    self.out.push_str(" = ");
                    self.expression(*value)?;
                }
                self.out.push(';');
            }
            Node::Return { value } => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expression(*value)?;
                }
                self.out.push(';');
            }
            Node::Expression { value } => {
                self.expression(*value)?;
                self.out.push(';');
            }
            other => {
                return Err(Error::NotSupported(format!(
                    "{} is not a statement",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    /// Prints `id`, wrapped in parentheses when it would not parse as an
    /// operand.
    fn operand(&mut self, id: NodeId, allow_plus: bool) -> Result<()> {
        let wrap = match self.ast.node(id) {
            Node::Assign { .. } | Node::Func { .. } => true,
            Node::Plus { .. } => !allow_plus,
            Node::Literal { value: LiteralValue::Number(n) } => *n < 0.0,
            _ => false,
        };
        if wrap {
            self.out.push('(');
            self.expression(id)?;
            self.out.push(')');
            Ok(())
        } else {
            self.expression(id)
        }
    }

    fn expressions(&mut self, ids: &[NodeId]) -> Result<()> {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expression(id)?;
        }
        Ok(())
    }

    fn expression(&mut self, id: NodeId) -> Result<()> {
        match self.ast.node(id) {
            Node::Literal { value } => match value {
                LiteralValue::Number(n) => self.out.push_str(&format_number(*n)),
                LiteralValue::String(s) => self.out.push_str(&quote(s)),
                LiteralValue::Null => self.out.push_str("null"),
            },
            Node::Identifier { name } => self.name(name)?,
            Node::Plus { left, right } => {
                let (left, right) = (*left, *right);
                self.operand(left, true)?;
                self.out.push_str(" + ");
                self.operand(right, false)?;
            }
            Node::Assign { left, right } => {
                let (left, right) = (*left, *right);
                self.expression(left)?;
                self.out.push_str(" = ");
                self.expression(right)?;
            }
            Node::Reactive { value } => {
                self.out.push_str(REACTIVE_CALL);
                self.out.push('(');
                self.expression(*value)?;
                self.out.push(')');
            }
            Node::List { value } => {
                self.out.push('[');
                self.expressions(value)?;
                self.out.push(']');
            }
            Node::Call { func, arguments } => {
                self.operand(*func, false)?;
                self.out.push('(');
                self.expressions(arguments)?;
                self.out.push(')');
            }
            Node::Func { params, body } => {
                self.out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.name(param)?;
                }
                self.out.push_str(") => ");
                match self.ast.node(*body) {
                    Node::Return { value: Some(value) } => self.operand(*value, true)?,
                    Node::Block { .. } => self.statement(*body)?,
                    _ => {
                        self.out.push_str("{ ");
                        self.statement(*body)?;
                        self.out.push_str(" }");
                    }
                }
            }
            Node::Element { tag, attributes, children } => {
                self.out.push('<');
                self.out.push_str(tag);
                for &attr in attributes {
                    self.out.push(' ');
                    self.attribute(attr)?;
                }
                if children.is_empty() {
                    self.out.push_str(" />");
                    return Ok(());
                }
                self.out.push('>');
                let mut after_text = false;
                for &child in children {
                    after_text = self.child(child, after_text)?;
                }
                self.out.push_str("</");
                self.out.push_str(tag);
                self.out.push('>');
            }
            other => {
                return Err(Error::NotSupported(format!(
                    "{} is not an expression",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    /// Returns whether the child was printed as bare text, which the next
    /// text child must not run into.
    fn child(&mut self, id: NodeId, after_text: bool) -> Result<bool> {
        match self.ast.node(id) {
            Node::Literal { value: LiteralValue::String(s) } if !after_text && is_plain_text(s) => {
                self.out.push_str(s);
                return Ok(true);
            }
            Node::Element { .. } => self.expression(id)?,
            _ => {
                self.out.push('{');
                self.expression(id)?;
                self.out.push('}');
            }
        }
        Ok(false)
    }

    fn attribute(&mut self, id: NodeId) -> Result<()> {
        match self.ast.node(id) {
            Node::NormalAttribute { key, value } => {
                self.out.push_str(key);
                if let Some(value) = value {
                    self.out.push('=');
                    self.attribute_value(*value)?;
                }
            }
            Node::EventAttribute { event, handler } => {
                self.out.push_str("on:");
                self.out.push_str(event);
                self.out.push('=');
                self.attribute_value(*handler)?;
            }
            other => {
                return Err(Error::NotSupported(format!(
                    "{} is not an attribute",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    fn attribute_value(&mut self, id: NodeId) -> Result<()> {
        match self.ast.node(id) {
            Node::Literal { value: LiteralValue::String(s) }
                if !s.contains(['"', '&', '\n']) =>
            {
                self.out.push('"');
                self.out.push_str(s);
                self.out.push('"');
            }
            _ => {
                self.out.push('{');
                self.expression(id)?;
                self.out.push('}');
            }
        }
        Ok(())
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        // f64 Display already drops a zero fraction: 3.0 prints as "3".
        n.to_string()
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Text that survives as a bare JSX child and trims back to itself.
fn is_plain_text(s: &str) -> bool {
    !s.is_empty() && s.trim() == s && !s.contains(['{', '}', '<', '>', '&'])
}
