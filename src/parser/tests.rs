//! Parser tests.

use crate::ast::*;
use crate::error::ParserError;
use crate::lexer::Scanner;
use crate::parser::Parser;

fn parse_stmt(source: &str) -> Node {
    let tokens = Scanner::new(source).scan_tokens().unwrap();
    Parser::new(tokens).parse_single().unwrap()
}

fn parse_expr(source: &str) -> Node {
    match parse_stmt(source).kind {
        NodeKind::DoExpr(expr) => *expr,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

fn parse_err(source: &str) -> ParserError {
    let tokens = Scanner::new(source).scan_tokens().unwrap();
    Parser::new(tokens).parse().unwrap_err()
}

#[test]
fn test_binary_expr() {
    let expr = parse_expr("1 + 2;");
    match expr.kind {
        NodeKind::Binary { op, .. } => assert_eq!(op, BinaryOp::Add),
        _ => panic!("expected binary expression"),
    }
}

#[test]
fn test_precedence() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    let expr = parse_expr("1 + 2 * 3;");
    match expr.kind {
        NodeKind::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => match right.kind {
            NodeKind::Binary {
                op: BinaryOp::Mul, ..
            } => {}
            _ => panic!("expected multiply on right"),
        },
        _ => panic!("expected add at top"),
    }
}

#[test]
fn test_left_associativity() {
    // 1 - 2 - 3 parses as (1 - 2) - 3
    let expr = parse_expr("1 - 2 - 3;");
    match expr.kind {
        NodeKind::Binary {
            op: BinaryOp::Sub,
            left,
            right,
        } => {
            assert!(matches!(
                left.kind,
                NodeKind::Binary {
                    op: BinaryOp::Sub,
                    ..
                }
            ));
            assert!(matches!(right.kind, NodeKind::Number(ref s) if s == "3"));
        }
        _ => panic!("expected sub at top"),
    }
}

#[test]
fn test_comparison_binds_looser_than_arithmetic() {
    // 1 + 2 == 3 parses as (1 + 2) == 3
    let expr = parse_expr("1 + 2 == 3;");
    assert!(matches!(
        expr.kind,
        NodeKind::Binary {
            op: BinaryOp::Equal,
            ..
        }
    ));
}

#[test]
fn test_unary_binds_tighter_than_binary() {
    // -1 + 2 parses as (-1) + 2
    let expr = parse_expr("-1 + 2;");
    match expr.kind {
        NodeKind::Binary {
            op: BinaryOp::Add,
            left,
            ..
        } => assert!(matches!(
            left.kind,
            NodeKind::Unary {
                op: UnaryOp::Neg,
                ..
            }
        )),
        _ => panic!("expected add at top"),
    }
}

#[test]
fn test_stacked_unary() {
    let expr = parse_expr("~~1;");
    match expr.kind {
        NodeKind::Unary {
            op: UnaryOp::BitNot,
            operand,
        } => assert!(matches!(
            operand.kind,
            NodeKind::Unary {
                op: UnaryOp::BitNot,
                ..
            }
        )),
        _ => panic!("expected unary"),
    }
}

#[test]
fn test_assignment_is_binary() {
    let expr = parse_expr("a += 1;");
    match expr.kind {
        NodeKind::Binary { op, .. } => {
            assert_eq!(op, BinaryOp::AddAssign);
            assert!(op.is_assignment());
        }
        _ => panic!("expected binary"),
    }
}

#[test]
fn test_grouping() {
    // (1 + 2) * 3
    let expr = parse_expr("(1 + 2) * 3;");
    match expr.kind {
        NodeKind::Binary {
            op: BinaryOp::Mul,
            left,
            ..
        } => assert!(matches!(
            left.kind,
            NodeKind::Binary {
                op: BinaryOp::Add,
                ..
            }
        )),
        _ => panic!("expected mul at top"),
    }
}

#[test]
fn test_let_declaration() {
    let stmt = parse_stmt("let u32 x = 1;");
    match stmt.kind {
        NodeKind::VarDecl { ty, name, init } => {
            assert_eq!(ty.name, "u32");
            assert!(!ty.locked);
            assert!(!ty.is_ref);
            assert_eq!(name, "x");
            assert!(matches!(init, Some(Initializer::Expr(_))));
        }
        _ => panic!("expected declaration"),
    }
}

#[test]
fn test_let_qualifiers_any_order() {
    for source in ["let lock ref u16 b = a;", "let ref lock u16 b = a;"] {
        let stmt = parse_stmt(source);
        match stmt.kind {
            NodeKind::VarDecl { ty, .. } => {
                assert!(ty.locked);
                assert!(ty.is_ref);
            }
            _ => panic!("expected declaration"),
        }
    }
}

#[test]
fn test_let_without_initializer() {
    let stmt = parse_stmt("let u8 x;");
    match stmt.kind {
        NodeKind::VarDecl { init, .. } => assert!(init.is_none()),
        _ => panic!("expected declaration"),
    }
}

#[test]
fn test_constructor_list() {
    let stmt = parse_stmt("let Pair<u8> p [1, 2];");
    match stmt.kind {
        NodeKind::VarDecl { ty, init, .. } => {
            assert_eq!(ty.name, "Pair");
            assert_eq!(ty.args.len(), 1);
            match init {
                Some(Initializer::Constructor(elems)) => assert_eq!(elems.len(), 2),
                other => panic!("expected constructor list, got {:?}", other),
            }
        }
        _ => panic!("expected declaration"),
    }
}

#[test]
fn test_array_type_suffix() {
    let stmt = parse_stmt("let u8[4] buf;");
    match stmt.kind {
        NodeKind::VarDecl { ty, .. } => {
            assert_eq!(ty.name, "u8");
            assert_eq!(ty.array_size, 4);
        }
        _ => panic!("expected declaration"),
    }
}

#[test]
fn test_if_else() {
    let stmt = parse_stmt("if (1 == 2) r = 9; else r = 4;");
    match stmt.kind {
        NodeKind::IfElse {
            cond, else_branch, ..
        } => {
            assert!(matches!(
                cond.kind,
                NodeKind::Binary {
                    op: BinaryOp::Equal,
                    ..
                }
            ));
            assert!(else_branch.is_some());
        }
        _ => panic!("expected if/else"),
    }
}

#[test]
fn test_if_without_else() {
    let stmt = parse_stmt("if (1) x = 2;");
    match stmt.kind {
        NodeKind::IfElse { else_branch, .. } => assert!(else_branch.is_none()),
        _ => panic!("expected if"),
    }
}

#[test]
fn test_code_block() {
    let stmt = parse_stmt("{ let u8 x = 1; x = 2; }");
    match stmt.kind {
        NodeKind::CodeBlock(statements) => assert_eq!(statements.len(), 2),
        _ => panic!("expected code block"),
    }
}

#[test]
fn test_expression_block_with_yield() {
    let stmt = parse_stmt("let u8 z = u8 : { yield 6; };");
    match stmt.kind {
        NodeKind::VarDecl { init, .. } => {
            let Some(Initializer::Expr(expr)) = init else {
                panic!("expected expression initializer");
            };
            match expr.kind {
                NodeKind::ExprBlock { ty, statements } => {
                    assert_eq!(ty.name, "u8");
                    assert_eq!(statements.len(), 1);
                    assert!(matches!(statements[0].kind, NodeKind::Yield(_)));
                }
                other => panic!("expected expression block, got {:?}", other),
            }
        }
        _ => panic!("expected declaration"),
    }
}

#[test]
fn test_do_statement() {
    let stmt = parse_stmt("do 1 + 2;");
    assert!(matches!(stmt.kind, NodeKind::DoExpr(_)));
}

#[test]
fn test_bare_expression_is_implicit_do() {
    let stmt = parse_stmt("a = 7;");
    assert!(matches!(stmt.kind, NodeKind::DoExpr(_)));
}

#[test]
fn test_missing_semicolon() {
    assert!(matches!(
        parse_err("let u8 x = 1"),
        ParserError::UnexpectedToken { .. }
    ));
}

#[test]
fn test_unterminated_block() {
    assert!(matches!(
        parse_err("{ let u8 x = 1;"),
        ParserError::Unterminated { what: "code block", .. }
    ));
}

#[test]
fn test_unterminated_expression_block() {
    assert!(matches!(
        parse_err("let u8 z = u8 : { yield 6;"),
        ParserError::Unterminated {
            what: "expression block",
            ..
        }
    ));
}

#[test]
fn test_reserved_statements() {
    for source in [
        "while (1) x = 2;",
        "func f() {}",
        "return 1;",
        "const u8 x = 1;",
    ] {
        assert!(
            matches!(parse_err(source), ParserError::Reserved(_, _)),
            "expected reserved-word error for {:?}",
            source
        );
    }
}

#[test]
fn test_error_carries_line() {
    let err = parse_err("let u8 x = 1;\nlet u8 = 2;");
    assert_eq!(err.span().line, 2);
}
