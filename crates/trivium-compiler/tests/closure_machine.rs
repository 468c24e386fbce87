//! Closure machine generation, lowering and simulation

mod common;

use common::{parse, run};
use trivium_compiler::{compile, CompileError, CompiledProgram, Machine};

#[test]
fn test_closures_capture_values_at_creation() {
    let source = "local k := 1 in (local get := () -> k in (k := 41; get()))";
    assert_eq!(run(Machine::Closure, source), 1);
}

#[test]
fn test_higher_order_function() {
    let source = "twice := (f, x) -> f(f(x)); twice(y -> y * 3, 2)";
    assert_eq!(run(Machine::Closure, source), 18);
}

#[test]
fn test_mutually_visible_local_functions() {
    let source = "local even := n -> if n == 0 then true else odd(n - 1), \
                  odd := n -> if n == 0 then false else even(n - 1) \
                  in even(10)";
    assert_eq!(run(Machine::Closure, source), 1);
}

#[test]
fn test_procedure_locals_start_at_zero() {
    let source = "p := proc (a) local t, u -> (u := a; t + u); p(6)";
    assert_eq!(run(Machine::Closure, source), 6);
}

#[test]
fn test_call_marks_before_arguments() {
    let program = compile(&parse("f := x -> x; f(1)"), Machine::Closure).unwrap();
    let CompiledProgram::Closure(ir) = &program else {
        panic!("expected closure IR");
    };
    let code: Vec<String> = ir.code.iter().map(ToString::to_string).collect();
    let mark = code.iter().position(|i| i.starts_with("mark ret_")).unwrap();
    let arg = code.iter().position(|i| i == "loadc 1").unwrap();
    let apply = code.iter().position(|i| i == "apply 1").unwrap();
    assert!(mark < arg && arg < apply);
    assert!(code[apply + 1].starts_with("ret_"));
}

#[test]
fn test_assigning_a_captured_name_is_unsupported() {
    let err = compile(&parse("local n := 0 in (() -> n := 1)"), Machine::Closure).unwrap_err();
    assert!(matches!(
        err,
        CompileError::UnsupportedConstruct {
            machine: Machine::Closure,
            ..
        }
    ));
}

#[test]
fn test_assembly_saves_return_trio() {
    let asm = compile(&parse("(x -> x + 1)(1)"), Machine::Closure)
        .unwrap()
        .assemble();
    assert!(asm.contains("extern malloc"));
    assert!(asm.contains("lea     rax,    [rel ret_"));
    assert!(asm.contains("jmp     qword [rax]"));
}
