//! Tests for parsing whole programs

use trivium_parser::{parse, BinaryOp, Binding, Expr, ParseErrorKind, Token, UnaryOp};

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(BinaryOp::Add, lhs, rhs)
}

#[test]
fn test_sequence_at_top_level() {
    let expr = parse("x := 1; y := 2; x + y").unwrap();
    assert_eq!(
        expr,
        Expr::seq(vec![
            Expr::assign("x", Expr::number(1)),
            Expr::assign("y", Expr::number(2)),
            add(Expr::var("x"), Expr::var("y")),
        ])
    );
}

#[test]
fn test_single_expression_is_not_wrapped() {
    assert_eq!(parse("42").unwrap(), Expr::number(42));
}

#[test]
fn test_local_with_several_bindings() {
    let expr = parse("local a := 1, b := a + 1 in a * b").unwrap();
    assert_eq!(
        expr,
        Expr::Local {
            bindings: vec![
                Binding {
                    name: "a".into(),
                    value: Expr::number(1),
                },
                Binding {
                    name: "b".into(),
                    value: add(Expr::var("a"), Expr::number(1)),
                },
            ],
            body: Box::new(Expr::binary(BinaryOp::Mul, Expr::var("a"), Expr::var("b"))),
        }
    );
}

#[test]
fn test_if_with_and_without_else() {
    let expr = parse("if a then 1 else 2").unwrap();
    assert_eq!(
        expr,
        Expr::if_then(Expr::var("a"), Expr::number(1), Some(Expr::number(2)))
    );

    let expr = parse("if a then b := 1").unwrap();
    assert_eq!(
        expr,
        Expr::if_then(Expr::var("a"), Expr::assign("b", Expr::number(1)), None)
    );
}

#[test]
fn test_loops() {
    let expr = parse("while x > 0 do x := x - 1").unwrap();
    assert!(matches!(expr, Expr::While { .. }));

    let expr = parse("do x := x - 1 while x > 0").unwrap();
    assert_eq!(
        expr,
        Expr::do_while(
            Expr::assign(
                "x",
                Expr::binary(BinaryOp::Sub, Expr::var("x"), Expr::number(1))
            ),
            Expr::binary(BinaryOp::Gt, Expr::var("x"), Expr::number(0)),
        )
    );

    let expr = parse("loop 3 do s := s + 2").unwrap();
    assert_eq!(
        expr,
        Expr::loop_do(
            Expr::number(3),
            Expr::assign("s", add(Expr::var("s"), Expr::number(2)))
        )
    );
}

#[test]
fn test_lambda_forms() {
    assert_eq!(
        parse("x -> x + 1").unwrap(),
        Expr::lambda(&["x"], add(Expr::var("x"), Expr::number(1)))
    );
    assert_eq!(
        parse("(a, b) -> a + b").unwrap(),
        Expr::lambda(&["a", "b"], add(Expr::var("a"), Expr::var("b")))
    );
    assert_eq!(
        parse("() -> 5").unwrap(),
        Expr::lambda(&[], Expr::number(5))
    );
}

#[test]
fn test_parenthesized_expression_is_not_a_lambda() {
    assert_eq!(
        parse("(a) + 1").unwrap(),
        add(Expr::var("a"), Expr::number(1))
    );
}

#[test]
fn test_proc_with_locals() {
    let expr = parse("proc (a) local t, u -> { t := a; t * 2 }").unwrap();
    assert_eq!(
        expr,
        Expr::procedure(
            &["a"],
            &["t", "u"],
            Expr::seq(vec![
                Expr::assign("t", Expr::var("a")),
                Expr::binary(BinaryOp::Mul, Expr::var("t"), Expr::number(2)),
            ])
        )
    );
}

#[test]
fn test_proc_without_locals() {
    let expr = parse("proc () -> 1").unwrap();
    assert_eq!(expr, Expr::procedure(&[], &[], Expr::number(1)));
}

#[test]
fn test_fun_desugars_to_self_binding() {
    let expr = parse("fun fact n -> if n < 2 then 1 else n * fact(n - 1)").unwrap();
    let body = Expr::if_then(
        Expr::binary(BinaryOp::Lt, Expr::var("n"), Expr::number(2)),
        Expr::number(1),
        Some(Expr::binary(
            BinaryOp::Mul,
            Expr::var("n"),
            Expr::call(
                Expr::var("fact"),
                vec![Expr::binary(BinaryOp::Sub, Expr::var("n"), Expr::number(1))],
            ),
        )),
    );
    assert_eq!(expr, Expr::fun("fact", &["n"], body));
}

#[test]
fn test_fun_with_parameter_list() {
    let expr = parse("fun pick(a, b) -> b").unwrap();
    assert_eq!(expr, Expr::fun("pick", &["a", "b"], Expr::var("b")));
}

#[test]
fn test_postfix_calls_chain() {
    let expr = parse("f(1)(2, 3)").unwrap();
    assert_eq!(
        expr,
        Expr::call(
            Expr::call(Expr::var("f"), vec![Expr::number(1)]),
            vec![Expr::number(2), Expr::number(3)],
        )
    );
}

#[test]
fn test_call_without_arguments() {
    assert_eq!(
        parse("get()").unwrap(),
        Expr::call(Expr::var("get"), Vec::new())
    );
}

#[test]
fn test_unary_operators() {
    assert_eq!(
        parse("-2 * 3").unwrap(),
        Expr::binary(
            BinaryOp::Mul,
            Expr::unary(UnaryOp::Neg, Expr::number(2)),
            Expr::number(3)
        )
    );
    assert_eq!(
        parse("not true").unwrap(),
        Expr::unary(UnaryOp::Not, Expr::boolean(true))
    );
}

#[test]
fn test_logical_operators_bind_loosest() {
    let expr = parse("a < b and b < c or d").unwrap();
    assert_eq!(
        expr,
        Expr::binary(
            BinaryOp::Or,
            Expr::binary(
                BinaryOp::And,
                Expr::binary(BinaryOp::Lt, Expr::var("a"), Expr::var("b")),
                Expr::binary(BinaryOp::Lt, Expr::var("b"), Expr::var("c")),
            ),
            Expr::var("d"),
        )
    );
}

#[test]
fn test_braces_group_a_sequence() {
    let expr = parse("{ 1; 2 } + 3").unwrap();
    assert_eq!(
        expr,
        add(
            Expr::seq(vec![Expr::number(1), Expr::number(2)]),
            Expr::number(3)
        )
    );
}

#[test]
fn test_comments_are_ignored() {
    let source = "# setup\nx := 1; # one\n# done\nx";
    assert_eq!(
        parse(source).unwrap(),
        Expr::seq(vec![Expr::assign("x", Expr::number(1)), Expr::var("x")])
    );
}

#[test]
fn test_missing_in_reports_location() {
    let err = parse("local a := 1 b").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::UnexpectedToken {
            expected: "`in`".to_string(),
            found: Token::Ident("b".to_string()),
        }
    );
    assert_eq!((err.span.line, err.span.column), (1, 14));
}

#[test]
fn test_error_on_second_line() {
    let err = parse("x := 1;\ny := )").unwrap_err();
    assert_eq!((err.span.line, err.span.column), (2, 6));
    assert_eq!(err.to_string(), "2:6: expected expression, found `)`");
}

#[test]
fn test_unclosed_paren_is_eof() {
    let err = parse("(1 + 2").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEof { .. }));
    assert!(err.message.ends_with("end of input"));
}

#[test]
fn test_number_too_large() {
    let err = parse("x := 9223372036854775808").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::InvalidNumber {
            text: "9223372036854775808".to_string(),
        }
    );
    assert_eq!(err.span.column, 6);
}

#[test]
fn test_largest_number_parses() {
    assert_eq!(
        parse("9223372036854775807").unwrap(),
        Expr::number(i64::MAX)
    );
}

#[test]
fn test_unexpected_character() {
    let err = parse("a $ b").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter { found: '$' });
}

#[test]
fn test_ast_serializes_with_kind_tags() {
    let expr = parse("1 + x").unwrap();
    let json = serde_json::to_value(&expr).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "kind": "binary",
            "op": "add",
            "lhs": { "kind": "number", "value": 1 },
            "rhs": { "kind": "var", "name": "x" }
        })
    );
}

#[test]
fn test_ast_json_round_trip() {
    let expr = parse("fun f(a) -> do a := a - 1 while a > 0; f(3)").unwrap();
    let text = serde_json::to_string(&expr).unwrap();
    let back: Expr = serde_json::from_str(&text).unwrap();
    assert_eq!(back, expr);
    assert!(text.contains("\"kind\":\"do_while\""));
}
