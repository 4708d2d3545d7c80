//! Walker tests: traversal order, cursor paths, and mutation during a walk.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::Value;

    use crate::ast::{Ast, Field, Node, NodeId};
    use crate::error::{Error, Result};
    use crate::parse::{parse_program, parse_statement};
    use crate::walker::{walk, CursorId, Visitor, WalkObject, Walker};

    const TEST_PROGRAM: &str = "
        let x = 1;
        let y = 2;
        let z = 3;
    ";

    struct Hooks<E, L> {
        enter: E,
        leave: L,
    }

    impl<E, L> Visitor for Hooks<E, L>
    where
        E: FnMut(&mut Walker<'_>, CursorId) -> Result<()>,
        L: FnMut(&mut Walker<'_>, CursorId) -> Result<()>,
    {
        fn enter(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
            (self.enter)(walker, cursor)
        }

        fn leave(&mut self, walker: &mut Walker<'_>, cursor: CursorId) -> Result<()> {
            (self.leave)(walker, cursor)
        }
    }

    fn walk_with<E, L>(ast: &mut Ast, root: NodeId, enter: E, leave: L) -> Result<()>
    where
        E: FnMut(&mut Walker<'_>, CursorId) -> Result<()>,
        L: FnMut(&mut Walker<'_>, CursorId) -> Result<()>,
    {
        walk(ast, root, &mut Hooks { enter, leave })
    }

    fn nothing(_: &mut Walker<'_>, _: CursorId) -> Result<()> {
        Ok(())
    }

    fn program(source: &str) -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let root = parse_program(&mut ast, source).unwrap();
        (ast, root)
    }

    fn view_of(source: &str) -> Value {
        let (ast, root) = program(source);
        ast.view(root)
    }

    fn declared(walker: &Walker<'_>, cursor: CursorId) -> Option<String> {
        match walker.get(cursor) {
            Some((_, Node::Declare { name, .. })) => name.as_ident().map(str::to_string),
            _ => None,
        }
    }

    fn statements(walker: &mut Walker<'_>, sources: &[&str]) -> Result<Vec<NodeId>> {
        sources.iter().map(|s| parse_statement(walker.ast_mut(), s)).collect()
    }

    /// Walks the program calling `hook` on entering each declaration. Returns
    /// the declaration names seen on enter and on leave.
    fn walk_declarations(
        ast: &mut Ast,
        root: NodeId,
        mut hook: impl FnMut(&mut Walker<'_>, CursorId, &str) -> Result<()>,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut start = Vec::new();
        let mut end = Vec::new();
        walk_with(
            ast,
            root,
            |walker, cursor| {
                if let Some(name) = declared(walker, cursor) {
                    start.push(name.clone());
                    hook(walker, cursor, &name)?;
                }
                Ok(())
            },
            |walker, cursor| {
                if let Some(name) = declared(walker, cursor) {
                    end.push(name);
                }
                Ok(())
            },
        )?;
        Ok((start, end))
    }

    fn declaration_names(ast: &mut Ast, root: NodeId) -> Vec<String> {
        walk_declarations(ast, root, |_, _, _| Ok(())).unwrap().0
    }

    fn insert_before_declaration(target: &str, sources: &[&str]) -> (Ast, NodeId, Vec<String>) {
        let (mut ast, root) = program(TEST_PROGRAM);
        let mut found = 0;
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == target {
                found += 1;
                let nodes = statements(walker, sources)?;
                walker.insert_before(cursor, nodes)?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(found, 1);
        assert_eq!(start, end);
        (ast, root, start)
    }

    fn replace_declaration(target: &str, source: &str) -> (Ast, NodeId, Vec<String>) {
        let (mut ast, root) = program(TEST_PROGRAM);
        let (start, _) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == target {
                let node = parse_statement(walker.ast_mut(), source)?;
                walker.replace(cursor, node)?;
            }
            Ok(())
        })
        .unwrap();
        (ast, root, start)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRAVERSAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn describe(walker: &Walker<'_>, cursor: CursorId) -> String {
        match walker.object(cursor) {
            WalkObject::Node(id) => walker.ast().node(id).type_name().to_string(),
            WalkObject::Value => format!("{:?}", walker.field(cursor)),
        }
    }

    #[test]
    fn test_event_order() {
        let (mut ast, root) = program("let a = 1; a;");
        let events = RefCell::new(Vec::new());
        walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                events.borrow_mut().push(format!("enter {}", describe(walker, cursor)));
                Ok(())
            },
            |walker, cursor| {
                events.borrow_mut().push(format!("leave {}", describe(walker, cursor)));
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            events.into_inner(),
            [
                "enter Block",
                "enter Declare",
                "enter Some(Name)",
                "leave Some(Name)",
                "enter Literal",
                "enter Some(Value)",
                "leave Some(Value)",
                "leave Literal",
                "leave Declare",
                "enter Expression",
                "enter Identifier",
                "enter Some(Name)",
                "leave Some(Name)",
                "leave Identifier",
                "leave Expression",
                "leave Block",
            ]
        );
    }

    #[test]
    fn test_missing_optional_child_is_a_value_position() {
        let (mut ast, root) = program("let a; return;");
        let mut values = Vec::new();
        walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                if walker.object(cursor) == WalkObject::Value {
                    values.push(walker.field(cursor));
                }
                Ok(())
            },
            nothing,
        )
        .unwrap();
        assert_eq!(values, [Some(Field::Name), Some(Field::Value), Some(Field::Value)]);
    }

    #[test]
    fn test_parent_path() {
        let (mut ast, root) = program(
            "
            let x = a => {
              let y = b => {
                let z = c => {
                  return [a, b, c];
                }
              }
            }
            ",
        );

        let mut path = None;
        walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                let is_c = matches!(
                    walker.get(cursor),
                    Some((_, Node::Identifier { name })) if name.as_ident() == Some("c")
                );
                if is_c && path.is_none() {
                    let mut entries = Vec::new();
                    let mut current = Some(cursor);
                    while let Some(c) = current {
                        let (_, node) = walker.get(c).unwrap();
                        entries.push((node.type_name(), walker.field(c), walker.index(c)));
                        current = walker.parent(c);
                    }
                    path = Some(entries);
                }
                Ok(())
            },
            nothing,
        )
        .unwrap();

        assert_eq!(
            path.unwrap(),
            [
                ("Identifier", Some(Field::Value), Some(2)),
                ("List", Some(Field::Value), None),
                ("Return", Some(Field::Body), Some(0)),
                ("Block", Some(Field::Body), None),
                ("Func", Some(Field::Value), None),
                ("Declare", Some(Field::Body), Some(0)),
                ("Block", Some(Field::Body), None),
                ("Func", Some(Field::Value), None),
                ("Declare", Some(Field::Body), Some(0)),
                ("Block", Some(Field::Body), None),
                ("Func", Some(Field::Value), None),
                ("Declare", Some(Field::Body), Some(0)),
                ("Block", None, None),
            ]
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSERT / REPLACE
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_insert_before_first_statement() {
        let (mut ast, root, seen) = insert_before_declaration("x", &["let a = 0;"]);
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["a", "x", "y", "z"]);
        assert_eq!(ast.view(root), view_of("let a = 0; let x = 1; let y = 2; let z = 3;"));
    }

    #[test]
    fn test_insert_before_second_statement() {
        let (mut ast, root, seen) = insert_before_declaration("y", &["let a = 0;"]);
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["x", "a", "y", "z"]);
    }

    #[test]
    fn test_insert_before_third_statement() {
        let (mut ast, root, seen) = insert_before_declaration("z", &["let a = 0;"]);
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["x", "y", "a", "z"]);
    }

    #[test]
    fn test_insert_twice_before_first_statement() {
        let (mut ast, root, seen) = insert_before_declaration("x", &["let a = 0;", "let b = 0;"]);
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["a", "b", "x", "y", "z"]);
    }

    #[test]
    fn test_insert_twice_before_last_statement() {
        let (mut ast, root, seen) = insert_before_declaration("z", &["let a = 0;", "let b = 0;"]);
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["x", "y", "a", "b", "z"]);
        assert_eq!(
            ast.view(root),
            view_of("let x = 1; let y = 2; let a = 0; let b = 0; let z = 3;")
        );
    }

    #[test]
    fn test_replace_first_statement() {
        let (mut ast, root, seen) = replace_declaration("x", "let a = 0;");
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["a", "y", "z"]);
        assert_eq!(ast.view(root), view_of("let a = 0; let y = 2; let z = 3;"));
    }

    #[test]
    fn test_replace_last_statement() {
        let (mut ast, root, seen) = replace_declaration("z", "let a = 0;");
        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(declaration_names(&mut ast, root), ["x", "y", "a"]);
    }

    #[test]
    fn test_replace_and_insert_complex_1() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => {
                    let before = statements(walker, &["let x1 = 0", "let x2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                    let node = parse_statement(walker.ast_mut(), "let x3 = 0")?;
                    walker.replace(cursor, node)?;
                }
                "z" => {
                    let node = parse_statement(walker.ast_mut(), "let z3 = 0")?;
                    walker.replace(cursor, node)?;
                    let before = statements(walker, &["let z1 = 0", "let z2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                }
                "y" => {}
                other => panic!("unexpected declaration {}", other),
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(
            declaration_names(&mut ast, root),
            ["x1", "x2", "x3", "y", "z1", "z2", "z3"]
        );
    }

    #[test]
    fn test_replace_and_insert_complex_2() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => {
                    let before = statements(walker, &["let x1 = 0"])?;
                    walker.insert_before(cursor, before)?;
                    let node = parse_statement(walker.ast_mut(), "let x2 = 0")?;
                    walker.replace(cursor, node)?;
                    let after = statements(walker, &["let x3 = 0"])?;
                    walker.insert_after(cursor, after)?;
                }
                "y" => {
                    let node = parse_statement(walker.ast_mut(), "let y1 = 0")?;
                    walker.replace(cursor, node)?;
                    let after = statements(walker, &["let y2 = 0"])?;
                    walker.insert_after(cursor, after)?;
                }
                "z" => {
                    let before = statements(walker, &["let zPre = 0"])?;
                    walker.insert_before(cursor, before)?;
                }
                other => panic!("unexpected declaration {}", other),
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(
            declaration_names(&mut ast, root),
            ["x1", "x2", "x3", "y1", "y2", "zPre", "z"]
        );
        assert_eq!(
            ast.view(root),
            view_of(
                "let x1 = 0; let x2 = 0; let x3 = 0; let y1 = 0; let y2 = 0; let zPre = 0; let z = 3;"
            )
        );
    }

    #[test]
    fn test_replace_and_insert_complex_3() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" | "y" => walker.remove(cursor)?,
                "z" => {
                    let before = statements(walker, &["let zPre = 0"])?;
                    walker.insert_before(cursor, before)?;
                }
                other => panic!("unexpected declaration {}", other),
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(declaration_names(&mut ast, root), ["zPre", "z"]);
        assert_eq!(ast.view(root), view_of("let zPre = 0; let z = 3;"));
    }

    #[test]
    fn test_replace_and_insert_complex_5() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => {
                    walker.remove(cursor)?;
                    let before = statements(walker, &["let x1 = 0", "let x2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                }
                "y" => {
                    let before = statements(walker, &["let y1 = 0", "let y2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                    let node = parse_statement(walker.ast_mut(), "let y3 = 0")?;
                    walker.replace(cursor, node)?;
                    let after = statements(walker, &["let y4 = 0"])?;
                    walker.insert_after(cursor, after)?;
                }
                "z" => {
                    let before = statements(walker, &["let z1 = 0", "let z2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                    walker.remove(cursor)?;
                }
                other => panic!("unexpected declaration {}", other),
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(
            declaration_names(&mut ast, root),
            ["x1", "x2", "y1", "y2", "y3", "y4", "z1", "z2"]
        );
    }

    #[test]
    fn test_replace_and_insert_complex_6() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => {
                    walker.remove(cursor)?;
                    let after = statements(walker, &["let x1 = 0", "let x2 = 0"])?;
                    walker.insert_after(cursor, after)?;
                }
                "y" => {
                    let after = statements(walker, &["let y4 = 0", "let y5 = 0"])?;
                    walker.insert_after(cursor, after)?;
                    let after = statements(walker, &["let y6 = 0"])?;
                    walker.insert_after(cursor, after)?;
                    let node = parse_statement(walker.ast_mut(), "let y3 = 0")?;
                    walker.replace(cursor, node)?;
                    let before = statements(walker, &["let y1 = 0", "let y2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                }
                "z" => {
                    let before = statements(walker, &["let z1 = 0"])?;
                    walker.insert_before(cursor, before)?;
                    let before = statements(walker, &["let z2 = 0"])?;
                    walker.insert_before(cursor, before)?;
                    walker.remove(cursor)?;
                    let after = statements(walker, &["let z3 = 0"])?;
                    walker.insert_after(cursor, after)?;
                }
                other => panic!("unexpected declaration {}", other),
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(
            declaration_names(&mut ast, root),
            ["x1", "x2", "y1", "y2", "y3", "y4", "y5", "y6", "z1", "z2", "z3"]
        );
    }

    #[test]
    fn test_multiple_insert_before() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == "x" {
                let groups: [&[&str]; 3] = [&["let a = 0"], &["let b = 0", "let c = 0"], &["let d = 0"]];
                for group in groups {
                    let nodes = statements(walker, group)?;
                    walker.insert_before(cursor, nodes)?;
                }
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(declaration_names(&mut ast, root), ["a", "b", "c", "d", "x", "y", "z"]);
    }

    #[test]
    fn test_multiple_insert_after() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == "z" {
                let groups: [&[&str]; 3] = [&["let a = 0"], &["let b = 0", "let c = 0"], &["let d = 0"]];
                for group in groups {
                    let nodes = statements(walker, group)?;
                    walker.insert_after(cursor, nodes)?;
                }
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(declaration_names(&mut ast, root), ["x", "y", "z", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_multiple_replace() {
        let (mut ast, root) = program(TEST_PROGRAM);
        walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == "z" {
                for source in ["let a = 0", "let b = 0", "let c = 0"] {
                    let node = parse_statement(walker.ast_mut(), source)?;
                    walker.replace(cursor, node)?;
                }
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(ast.view(root), view_of("let x = 1; let y = 2; let c = 0;"));
    }

    #[test]
    fn test_multiple_remove() {
        let (mut ast, root) = program(TEST_PROGRAM);
        let result = walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == "y" {
                walker.remove(cursor)?;
                walker.remove(cursor)?;
            }
            Ok(())
        });
        assert!(matches!(result, Err(Error::Remove(_))));
    }

    #[test]
    fn test_replace_root_fails() {
        let (mut ast, root) = program(TEST_PROGRAM);
        let replacement = ast.block(Vec::new());
        let result = walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                if walker.parent(cursor).is_none() {
                    walker.replace(cursor, replacement)?;
                }
                Ok(())
            },
            nothing,
        );
        assert!(matches!(result, Err(Error::Replace(_))));
    }

    #[test]
    fn test_insert_outside_array_fails() {
        let (mut ast, root) = program("let a = 1;");
        let extra = ast.number(2.0);
        let result = walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                if matches!(walker.get(cursor), Some((_, Node::Literal { .. }))) {
                    walker.insert_after(cursor, vec![extra])?;
                }
                Ok(())
            },
            nothing,
        );
        assert!(matches!(result, Err(Error::InsertAfter(_))));

        let (mut ast, root) = program("let a = 1;");
        let extra = ast.number(2.0);
        let result = walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                if walker.object(cursor) == WalkObject::Value {
                    walker.insert_before(cursor, vec![extra])?;
                }
                Ok(())
            },
            nothing,
        );
        assert!(matches!(result, Err(Error::InsertBefore(_))));
    }

    #[test]
    fn test_replace_in_single_field_is_descended() {
        let (mut ast, root) = program("let a = 1 + 2;");
        let mut literals = Vec::new();
        walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                let is_plus = matches!(walker.get(cursor), Some((_, Node::Plus { .. })));
                if is_plus {
                    let ast = walker.ast_mut();
                    let three = ast.number(3.0);
                    let four = ast.number(4.0);
                    let list = ast.list(vec![three, four]);
                    walker.replace(cursor, list)?;
                } else if let Some((id, Node::Literal { .. })) = walker.get(cursor) {
                    literals.push(id);
                }
                Ok(())
            },
            nothing,
        )
        .unwrap();
        assert_eq!(literals.len(), 2);
        assert_eq!(ast.view(root), view_of("let a = [3, 4];"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SKIP / REMOVE
    // ═══════════════════════════════════════════════════════════════════════════

    const NESTED_PROGRAM: &str = "
        let a = 0;
        let b = () => {
          let c = 0;
        }
        let d = 0;
    ";

    #[test]
    fn test_nested_traversal() {
        let (mut ast, root) = program(NESTED_PROGRAM);
        let (start, end) = walk_declarations(&mut ast, root, |_, _, _| Ok(())).unwrap();
        assert_eq!(start, ["a", "b", "c", "d"]);
        assert_eq!(end, ["a", "c", "b", "d"]);
    }

    #[test]
    fn test_nested_traversal_skip() {
        let (mut ast, root) = program(NESTED_PROGRAM);
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == "b" {
                walker.skip(cursor);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, ["a", "b", "d"]);
        assert_eq!(end, ["a", "b", "d"]);
    }

    #[test]
    fn test_nested_traversal_skip_via_remove() {
        let (mut ast, root) = program(NESTED_PROGRAM);
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            if name == "b" {
                walker.remove(cursor)?;
                assert!(walker.is_removed(cursor));
                assert!(walker.is_skipped(cursor));
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, ["a", "b", "d"]);
        assert_eq!(end, ["a", "b", "d"]);
        assert_eq!(ast.view(root), view_of("let a = 0; let d = 0;"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REACTIVE-STYLE REWRITES
    // ═══════════════════════════════════════════════════════════════════════════

    fn assigns_to(walker: &Walker<'_>, cursor: CursorId, target: &str) -> bool {
        let Some((_, Node::Expression { value })) = walker.get(cursor) else {
            return false;
        };
        let Node::Assign { left, .. } = walker.ast().node(*value) else {
            return false;
        };
        matches!(walker.ast().node(*left), Node::Identifier { name } if name.as_ident() == Some(target))
    }

    #[test]
    fn test_reactive_insertion() {
        let (mut ast, root) = program(
            "
            let a = 0;
            let b = a + 1;
            a = 1;
            ",
        );
        walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                if declared(walker, cursor).as_deref() == Some("b") {
                    let before = statements(walker, &["let b;", "let setB = () => { b = a + 1; }"])?;
                    walker.insert_before(cursor, before)?;
                    let call = parse_statement(walker.ast_mut(), "setB()")?;
                    walker.replace(cursor, call)?;
                }
                if assigns_to(walker, cursor, "a") {
                    let after = statements(walker, &["setB()"])?;
                    walker.insert_after(cursor, after)?;
                }
                Ok(())
            },
            nothing,
        )
        .unwrap();

        assert_eq!(
            ast.view(root),
            view_of(
                "
                let a = 0;
                let b;
                let setB = () => {
                  b = a + 1;
                };
                setB();
                a = 1;
                setB();
                "
            )
        );
    }

    #[test]
    fn test_reactive_insertion_complex() {
        let (mut ast, root) = program(
            "
            let x = 1;
            let getXPlus = () => {
              let a = reactive(x) + 1;
              return a;
            };
            let y = getXPlus();
            x = 2;
            ",
        );
        walk_with(
            &mut ast,
            root,
            |walker, cursor| {
                if matches!(walker.get(cursor), Some((_, Node::Reactive { .. }))) {
                    let declare = walker
                        .ancestor(cursor, |n| matches!(n, Node::Declare { .. }))
                        .unwrap();
                    let before = statements(walker, &["let a;"])?;
                    walker.insert_before(declare, before)?;
                    let setter = parse_statement(walker.ast_mut(), "let setA = () => { a = x + 1; }")?;
                    walker.replace(declare, setter)?;
                    let after = statements(walker, &["setA();"])?;
                    walker.insert_after(declare, after)?;
                }
                Ok(())
            },
            |walker, cursor| {
                let name = declared(walker, cursor);
                if name.as_deref() == Some("getXPlus") {
                    let before = statements(walker, &["let y;"])?;
                    walker.insert_before(cursor, before)?;
                    let inner = walker.node(cursor).unwrap();
                    let ast = walker.ast_mut();
                    let call = parse_statement(ast, "y = getXPlus();")?;
                    let body = ast.block(vec![inner, call]);
                    let func = ast.func(Vec::new(), body);
                    let setter = ast.declare("setY", Some(func));
                    walker.replace(cursor, setter)?;
                    let after = statements(walker, &["setY()"])?;
                    walker.insert_after(cursor, after)?;
                }
                if name.as_deref() == Some("y") {
                    walker.remove(cursor)?;
                }
                if assigns_to(walker, cursor, "x") {
                    let after = statements(walker, &["setY()"])?;
                    walker.insert_after(cursor, after)?;
                }
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            ast.view(root),
            view_of(
                "
                let x = 1;
                let y;
                let setY = () => {
                  let getXPlus = () => {
                    let a;
                    let setA = () => {
                      a = x + 1;
                    }
                    setA();
                    return a;
                  };
                  y = getXPlus();
                };
                setY();
                x = 2;
                setY();
                "
            )
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OUT-OF-ORDER MUTATION THROUGH A STASHED CURSOR
    // ═══════════════════════════════════════════════════════════════════════════

    const XYZ_PROGRAM: &str = "let x = 0; let y = 0; let z = 0;";

    #[test]
    fn test_insert_before_out_of_order() {
        let (mut ast, root) = program(XYZ_PROGRAM);
        let mut x_cursor = None;
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => x_cursor = Some(cursor),
                "y" => {
                    let before = statements(walker, &["let w = 0"])?;
                    walker.insert_before(x_cursor.unwrap(), before)?;
                }
                _ => {}
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, end);
        assert_eq!(start, ["x", "y", "z"]);
        assert_eq!(ast.view(root), view_of("let w = 0; let x = 0; let y = 0; let z = 0;"));
    }

    #[test]
    fn test_insert_after_out_of_order() {
        let (mut ast, root) = program(XYZ_PROGRAM);
        let mut x_cursor = None;
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => x_cursor = Some(cursor),
                "y" => {
                    let after = statements(walker, &["let w = 0"])?;
                    walker.insert_after(x_cursor.unwrap(), after)?;
                }
                _ => {}
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, end);
        assert_eq!(start, ["x", "y", "z"]);
        assert_eq!(ast.view(root), view_of("let x = 0; let w = 0; let y = 0; let z = 0;"));
    }

    #[test]
    fn test_multiple_insert_before_out_of_order() {
        let (mut ast, root) = program(XYZ_PROGRAM);
        let mut x_cursor = None;
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => x_cursor = Some(cursor),
                "y" => {
                    let x = x_cursor.unwrap();
                    let v = statements(walker, &["let v = 0"])?;
                    walker.insert_before(x, v)?;
                    let w = statements(walker, &["let w = 0"])?;
                    walker.insert_before(x, w)?;
                }
                _ => {}
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, end);
        assert_eq!(start, ["x", "y", "z"]);
        assert_eq!(
            ast.view(root),
            view_of("let v = 0; let w = 0; let x = 0; let y = 0; let z = 0;")
        );
    }

    #[test]
    fn test_multiple_insert_after_out_of_order() {
        let (mut ast, root) = program(XYZ_PROGRAM);
        let mut x_cursor = None;
        let (start, end) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => x_cursor = Some(cursor),
                "y" => {
                    let x = x_cursor.unwrap();
                    let v = statements(walker, &["let v = 0"])?;
                    walker.insert_after(x, v)?;
                    let w = statements(walker, &["let w = 0"])?;
                    walker.insert_after(x, w)?;
                }
                _ => {}
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, end);
        assert_eq!(start, ["x", "y", "z"]);
        assert_eq!(
            ast.view(root),
            view_of("let x = 0; let v = 0; let w = 0; let y = 0; let z = 0;")
        );
    }

    #[test]
    fn test_insert_out_of_order_complex() {
        let (mut ast, root) = program(XYZ_PROGRAM);
        let mut x_cursor = None;
        let (start, _) = walk_declarations(&mut ast, root, |walker, cursor, name| {
            match name {
                "x" => {
                    x_cursor = Some(cursor);
                    let f = statements(walker, &["let f = 0"])?;
                    walker.insert_after(cursor, f)?;
                    let node = parse_statement(walker.ast_mut(), "let _x = 0")?;
                    walker.replace(cursor, node)?;
                    let a = statements(walker, &["let a = 0"])?;
                    walker.insert_before(cursor, a)?;
                    let g = statements(walker, &["let g = 0"])?;
                    walker.insert_after(cursor, g)?;
                }
                "y" => {
                    let x = x_cursor.unwrap();
                    let b = statements(walker, &["let b = 0"])?;
                    walker.insert_before(x, b)?;
                    let d = statements(walker, &["let d = 0"])?;
                    walker.insert_after(x, d)?;
                    let node = parse_statement(walker.ast_mut(), "let __x = 0")?;
                    walker.replace(x, node)?;
                    let e = statements(walker, &["let e = 0"])?;
                    walker.insert_after(x, e)?;
                    let c = statements(walker, &["let c = 0"])?;
                    walker.insert_before(x, c)?;
                }
                _ => {}
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(start, ["x", "y", "z"]);
        assert_eq!(
            ast.view(root),
            view_of(
                "let a = 0; let b = 0; let c = 0; let __x = 0; let d = 0; let e = 0; \
                 let f = 0; let g = 0; let y = 0; let z = 0;"
            )
        );
    }
}
