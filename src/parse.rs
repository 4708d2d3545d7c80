//! JavaScript front end.
//!
//! Parses source text with oxc and lowers the subset Poly understands into
//! the arena. Anything outside that subset is rejected with
//! [`Error::NotSupported`] rather than silently dropped.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::{AssignmentOperator, BinaryOperator};
use tracing::debug;

use crate::ast::{Ast, Name, NodeId};
use crate::error::{Error, Result};

/// Name of the marker call that makes a read reactive.
pub const REACTIVE_CALL: &str = "reactive";

pub(crate) fn source_type() -> SourceType {
    SourceType::default().with_module(true).with_jsx(true)
}

pub(crate) fn parse_options() -> ParseOptions {
    ParseOptions { allow_return_outside_function: true, ..ParseOptions::default() }
}

/// Parses a whole program into a `Block` holding its statements.
pub fn parse_program(ast: &mut Ast, source: &str) -> Result<NodeId> {
    let body = parse_statements(ast, source)?;
    debug!(statements = body.len(), nodes = ast.len(), "parsed program");
    Ok(ast.block(body))
}

/// Parses source text holding exactly one statement.
pub fn parse_statement(ast: &mut Ast, source: &str) -> Result<NodeId> {
    let mut body = parse_statements(ast, source)?;
    match body.len() {
        1 => Ok(body.remove(0)),
        n => Err(Error::NotSupported(format!("expected one statement, found {}", n))),
    }
}

fn parse_statements(ast: &mut Ast, source: &str) -> Result<Vec<NodeId>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).with_options(parse_options()).parse();
    if let Some(first) = ret.errors.first() {
        return Err(Error::Parse(first.to_string()));
    }
    if ret.panicked {
        return Err(Error::Parse("parser gave up on the input".to_string()));
    }

    let mut lower = Lowerer { ast, source };
    let mut body = Vec::with_capacity(ret.program.directives.len() + ret.program.body.len());
    // A leading string statement parses as a directive.
    for directive in &ret.program.directives {
        let value = lower.ast.string(directive.expression.value.to_string());
        body.push(lower.ast.expression(value));
    }
    for stmt in &ret.program.body {
        if let Some(id) = lower.statement(stmt)? {
            body.push(id);
        }
    }
    Ok(body)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

struct Lowerer<'s, 'p> {
    ast: &'p mut Ast,
    source: &'s str,
}

impl Lowerer<'_, '_> {
    fn unsupported(&self, what: &str, span: Span) -> Error {
        let text = self.source.get(span.start as usize..span.end as usize).unwrap_or("");
        Error::NotSupported(format!("{} `{}`", what, text))
    }

    fn statement(&mut self, stmt: &Statement<'_>) -> Result<Option<NodeId>> {
        let id = match stmt {
            Statement::EmptyStatement(_) => return Ok(None),
            Statement::VariableDeclaration(decl) => {
                if decl.kind != VariableDeclarationKind::Let {
                    return Err(self.unsupported("only `let` declarations are supported:", decl.span));
                }
                if decl.declarations.len() != 1 {
                    return Err(self.unsupported("one binding per declaration:", decl.span));
                }
                let declarator = &decl.declarations[0];
                let name = self.binding(&declarator.id)?;
                let value = match &declarator.init {
                    Some(init) => Some(self.expression(init)?),
                    None => None,
                };
                self.ast.declare(name, value)
            }
            Statement::BlockStatement(block) => {
                let body = self.statements(&block.body)?;
                self.ast.block(body)
            }
            Statement::ReturnStatement(ret) => {
                let value = match &ret.argument {
                    Some(arg) => Some(self.expression(arg)?),
                    None => None,
                };
                self.ast.ret(value)
            }
            Statement::ExpressionStatement(stmt) => {
                let value = self.expression(&stmt.expression)?;
                self.ast.expression(value)
            }
            other => return Err(self.unsupported("unsupported statement", other.span())),
        };
        Ok(Some(id))
    }

    fn statements(&mut self, stmts: &[Statement<'_>]) -> Result<Vec<NodeId>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            if let Some(id) = self.statement(stmt)? {
                out.push(id);
            }
        }
        Ok(out)
    }

    fn binding(&self, pattern: &BindingPattern<'_>) -> Result<Name> {
        match pattern {
            BindingPattern::BindingIdentifier(id) => Ok(Name::ident(id.name.as_str())),
            other => Err(self.unsupported("only identifier bindings are supported:", other.span())),
        }
    }

    fn expression(&mut self, expr: &Expression<'_>) -> Result<NodeId> {
        match expr {
            Expression::NumericLiteral(n) => Ok(self.ast.number(n.value)),
            Expression::StringLiteral(s) => Ok(self.ast.string(s.value.as_str())),
            Expression::NullLiteral(_) => Ok(self.ast.null()),
            Expression::Identifier(id) => Ok(self.ast.ident(id.name.as_str())),
            Expression::ParenthesizedExpression(p) => self.expression(&p.expression),
            Expression::BinaryExpression(bin) => {
                if bin.operator != BinaryOperator::Addition {
                    return Err(self.unsupported("unsupported operator in", bin.span));
                }
                let left = self.expression(&bin.left)?;
                let right = self.expression(&bin.right)?;
                Ok(self.ast.plus(left, right))
            }
            Expression::AssignmentExpression(assign) => {
                if assign.operator != AssignmentOperator::Assign {
                    return Err(self.unsupported("unsupported operator in", assign.span));
                }
                let left = match &assign.left {
                    AssignmentTarget::AssignmentTargetIdentifier(id) => {
                        self.ast.ident(id.name.as_str())
                    }
                    other => {
                        return Err(self.unsupported("only identifiers can be assigned:", other.span()))
                    }
                };
                let right = self.expression(&assign.right)?;
                Ok(self.ast.assign(left, right))
            }
            Expression::ArrayExpression(array) => {
                let mut items = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    let Some(e) = element.as_expression() else {
                        return Err(self.unsupported("unsupported array element in", array.span));
                    };
                    items.push(self.expression(e)?);
                }
                Ok(self.ast.list(items))
            }
            Expression::CallExpression(call) => self.call(call),
            Expression::ArrowFunctionExpression(func) => self.arrow(func),
            Expression::JSXElement(element) => self.element(element),
            other => Err(self.unsupported("unsupported expression", other.span())),
        }
    }

    fn arguments(&mut self, call: &CallExpression<'_>) -> Result<Vec<NodeId>> {
        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            let Some(e) = arg.as_expression() else {
                return Err(self.unsupported("spread arguments are not supported:", call.span));
            };
            args.push(self.expression(e)?);
        }
        Ok(args)
    }

    fn call(&mut self, call: &CallExpression<'_>) -> Result<NodeId> {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name.as_str() == REACTIVE_CALL {
                let mut args = self.arguments(call)?;
                if args.len() != 1 {
                    return Err(self.unsupported("reactive() takes exactly one argument:", call.span));
                }
                let value = args.remove(0);
                return Ok(self.ast.reactive(value));
            }
        }
        if call.optional {
            return Err(self.unsupported("optional calls are not supported:", call.span));
        }
        let func = self.expression(&call.callee)?;
        let args = self.arguments(call)?;
        Ok(self.ast.call(func, args))
    }

    fn arrow(&mut self, func: &ArrowFunctionExpression<'_>) -> Result<NodeId> {
        if func.r#async {
            return Err(self.unsupported("async functions are not supported:", func.span));
        }
        if func.params.rest.is_some() {
            return Err(self.unsupported("rest parameters are not supported:", func.span));
        }
        let mut params = Vec::with_capacity(func.params.items.len());
        for param in &func.params.items {
            params.push(self.binding(&param.pattern)?);
        }

        let body = if func.expression {
            let value = match func.body.statements.first() {
                Some(Statement::ExpressionStatement(stmt)) => self.expression(&stmt.expression)?,
                _ => return Err(self.unsupported("malformed arrow body in", func.span)),
            };
            self.ast.ret(Some(value))
        } else {
            let body = self.statements(&func.body.statements)?;
            self.ast.block(body)
        };
        Ok(self.ast.func(params, body))
    }

    // ─── JSX ────────────────────────────────────────────────────────────────

    fn element(&mut self, element: &JSXElement<'_>) -> Result<NodeId> {
        let opening = &element.opening_element;
        let tag = match &opening.name {
            JSXElementName::Identifier(id) => id.name.to_string(),
            JSXElementName::IdentifierReference(id) => id.name.to_string(),
            other => return Err(self.unsupported("unsupported tag name", other.span())),
        };

        let mut attributes = Vec::with_capacity(opening.attributes.len());
        for item in &opening.attributes {
            let JSXAttributeItem::Attribute(attr) = item else {
                return Err(self.unsupported("spread attributes are not supported:", item.span()));
            };
            attributes.push(self.attribute(attr)?);
        }

        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            match child {
                JSXChild::Text(t) => {
                    let text = t.value.trim();
                    if !text.is_empty() {
                        children.push(self.ast.string(text));
                    }
                }
                JSXChild::Element(el) => children.push(self.element(el)?),
                JSXChild::ExpressionContainer(container) => {
                    if let Some(e) = container.expression.as_expression() {
                        children.push(self.expression(e)?);
                    }
                }
                JSXChild::Fragment(frag) => {
                    return Err(self.unsupported("fragments are not supported:", frag.span))
                }
                JSXChild::Spread(spread) => {
                    return Err(self.unsupported("spread children are not supported:", spread.span))
                }
            }
        }
        Ok(self.ast.element(tag, attributes, children))
    }

    fn attribute(&mut self, attr: &JSXAttribute<'_>) -> Result<NodeId> {
        match &attr.name {
            JSXAttributeName::NamespacedName(ns) if ns.namespace.name.as_str() == "on" => {
                let event = ns.name.name.to_string();
                let handler = match &attr.value {
                    Some(value) => self.attribute_value(value)?,
                    None => None,
                };
                let Some(handler) = handler else {
                    return Err(self.unsupported("event attribute without a handler:", attr.span));
                };
                Ok(self.ast.event(event, handler))
            }
            JSXAttributeName::NamespacedName(ns) => {
                Err(self.unsupported("unsupported attribute namespace", ns.span))
            }
            JSXAttributeName::Identifier(id) => {
                let key = id.name.to_string();
                let value = match &attr.value {
                    Some(value) => self.attribute_value(value)?,
                    None => None,
                };
                Ok(self.ast.attribute(key, value))
            }
        }
    }

    fn attribute_value(&mut self, value: &JSXAttributeValue<'_>) -> Result<Option<NodeId>> {
        match value {
            JSXAttributeValue::StringLiteral(s) => Ok(Some(self.ast.string(s.value.as_str()))),
            JSXAttributeValue::ExpressionContainer(container) => {
                match container.expression.as_expression() {
                    Some(e) => Ok(Some(self.expression(e)?)),
                    None => Ok(None),
                }
            }
            JSXAttributeValue::Element(el) => Ok(Some(self.element(el)?)),
            JSXAttributeValue::Fragment(frag) => {
                Err(self.unsupported("fragments are not supported:", frag.span))
            }
        }
    }
}
