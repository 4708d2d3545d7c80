//! End-to-end tests: parse, analyze, print.

#[cfg(test)]
mod tests {
    use crate::ast::{Ast, Name};
    use crate::compile::{transform_source, CompileOptions, CompileSummary};
    use crate::error::{Diagnostic, Error};
    use crate::namer::{NameOptions, StrategyKind};
    use crate::parse::{parse_program, parse_statement};
    use crate::print::{format_source, program_to_source, statement_to_source};

    const COUNTER: &str = "
        let x = 0;
        let a = reactive(x) + 1;
        x = 3;
    ";

    #[test]
    fn test_transform_source() {
        let result = transform_source(COUNTER, &CompileOptions::default()).unwrap();
        let expected = format_source(
            "let x = 0; let a; let set_a = () => { a = x + 1; }; set_a(); x = 3; set_a();",
        )
        .unwrap();
        assert_eq!(result.code, expected);
        assert_eq!(result.summary, CompileSummary { scopes: 2, placeholders: 1, updates: 1 });
    }

    #[test]
    fn test_transform_source_normalized() {
        let options = CompileOptions {
            naming: NameOptions {
                strategy: StrategyKind::Incremental {
                    first: "abcdefghijklmnopqrstuvwxyz".to_string(),
                    rest: "0123456789".to_string(),
                },
                ..NameOptions::default()
            },
            normalize: true,
        };
        let result = transform_source(COUNTER, &options).unwrap();
        let expected =
            format_source("let a = 0; let b; let c = () => { b = a + 1; }; c(); a = 3; c();")
                .unwrap();
        assert_eq!(result.code, expected);
    }

    #[test]
    fn test_transform_source_errors() {
        let err = transform_source("let a = b;", &CompileOptions::default()).unwrap_err();
        assert_eq!(err, Error::VariableUndeclared { name: "b".to_string() });

        let err = transform_source("let = ;", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(err.code(), "P-ERR-SYNTAX-001");

        let err = transform_source("const a = 1;", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));

        let err = transform_source("let a = 1; a - 1;", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FRONT END AND PRINTER
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_print_round_trip() {
        let source = r#"
            let greeting = "hi";
            let items = [1, "two", null, greeting + 3];
            let handler = (event) => event;
            let view = <div id="main" hidden on:click={handler}>
              hello {greeting}
              <span>{items}</span>
              <br />
            </div>;
            handler(view);
            {
              let inner = (a, b) => {
                return a + (b + 1);
              };
            }
            return greeting;
        "#;
        let mut ast = Ast::new();
        let root = parse_program(&mut ast, source).unwrap();
        let printed = program_to_source(&ast, root).unwrap();

        let mut reparsed = Ast::new();
        let again = parse_program(&mut reparsed, &printed).unwrap();
        assert_eq!(reparsed.view(again), ast.view(root));
    }

    #[test]
    fn test_parse_jsx_children_and_attributes() {
        let mut ast = Ast::new();
        let stmt = parse_statement(&mut ast, r#"<p class="x" on:input={f}>  text  {v}</p>;"#).unwrap();
        let view = ast.view(stmt);
        let element = &view["value"];
        assert_eq!(element["type"], "Element");
        assert_eq!(element["tag"], "p");
        assert_eq!(element["attributes"][0]["type"], "NormalAttribute");
        assert_eq!(element["attributes"][0]["key"], "class");
        assert_eq!(element["attributes"][1]["type"], "EventAttribute");
        assert_eq!(element["attributes"][1]["event"], "input");
        assert_eq!(element["children"][0]["value"]["value"], "text");
        assert_eq!(element["children"][1]["name"], "v");
    }

    #[test]
    fn test_parse_statement_requires_one_statement() {
        let mut ast = Ast::new();
        assert!(matches!(parse_statement(&mut ast, "let a; let b;"), Err(Error::NotSupported(_))));
        assert!(matches!(parse_statement(&mut ast, ""), Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_parse_reactive_arity() {
        let mut ast = Ast::new();
        let err = parse_program(&mut ast, "let a = reactive(x, y);").unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[test]
    fn test_print_statement() {
        let mut ast = Ast::new();
        let stmt = parse_statement(&mut ast, "let a = reactive(x) + 1;").unwrap();
        let printed = statement_to_source(&ast, stmt).unwrap();
        assert_eq!(printed, format_source("let a = reactive(x) + 1;").unwrap());
    }

    #[test]
    fn test_print_nested_assignment() {
        let mut ast = Ast::new();
        let stmt = parse_statement(&mut ast, "let y = (x = 5) + 1;").unwrap();
        let printed = statement_to_source(&ast, stmt).unwrap();

        let mut reparsed = Ast::new();
        let again = parse_statement(&mut reparsed, &printed).unwrap();
        assert_eq!(reparsed.view(again), ast.view(stmt));
    }

    #[test]
    fn test_print_placeholder_fails() {
        let mut ast = Ast::new();
        let p = ast.placeholder(Some("tmp"));
        let decl = ast.declare(Name::Placeholder(p), None);
        let root = ast.block(vec![decl]);
        assert!(matches!(program_to_source(&ast, root), Err(Error::SubName(_))));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPTIONS AND DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_options_from_json() {
        let options = CompileOptions::from_json(
            r#"{ "normalize": true, "naming": { "minimize": true, "strategy": { "kind": "incremental" } } }"#,
        )
        .unwrap();
        assert!(options.normalize);
        assert!(options.naming.minimize);
        assert!(!options.naming.aggressive);
        assert_eq!(
            options.naming.strategy,
            StrategyKind::Incremental {
                first: "abcdefghijklmnopqrstuvwxyz".to_string(),
                rest: "0123456789".to_string(),
            }
        );

        assert_eq!(CompileOptions::from_json("{}").unwrap(), CompileOptions::default());

        let err = CompileOptions::from_json(r#"{ "normalize": "yes" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.code(), "P-ERR-CONFIG-001");
    }

    #[test]
    fn test_diagnostic_from_error() {
        let err = Error::VariableUndeclared { name: "b".to_string() };
        let diagnostic = Diagnostic::from(&err);
        assert_eq!(diagnostic.code, "P-ERR-SCOPE-002");
        assert_eq!(diagnostic.message, "b has not been declared");
        assert_eq!(diagnostic.hints.len(), 1);

        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["errorType"], "COMPILER_INVARIANT_VIOLATION");
        assert_eq!(json["code"], "P-ERR-SCOPE-002");

        let diagnostic = Diagnostic::from(&Error::Remove("cursor was already removed"));
        assert_eq!(diagnostic.code, "P-ERR-WALK-004");
        assert!(diagnostic.hints.is_empty());
    }
}
