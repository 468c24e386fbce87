//! Stack machine generation, lowering and simulation

mod common;

use common::{parse, run};
use trivium_compiler::{compile, CompileError, CompiledProgram, Machine};

fn stack_ir(source: &str) -> Vec<String> {
    match compile(&parse(source), Machine::Stack).unwrap() {
        CompiledProgram::Stack(ir) => ir.code.iter().map(ToString::to_string).collect(),
        other => panic!("expected stack IR, got {:?}", other.machine()),
    }
}

#[test]
fn test_local_block_allocates_and_slides() {
    assert_eq!(
        stack_ir("local a := 5 in a"),
        [
            "alloc 8", "loadc 5", "loadrc 8", "store", "pop", "loadrc 8", "load", "slide 8 8",
        ]
    );
}

#[test]
fn test_nested_local_addresses_follow_depth() {
    let code = stack_ir("local a := 1 in (a + local b := 2 in a * b)");
    // `b` is allocated with `a` and the left operand of `+` below it
    assert!(code.contains(&"loadrc 24".to_string()));
    assert_eq!(run(Machine::Stack, "local a := 1 in (a + local b := 2 in a * b)"), 3);
}

#[test]
fn test_procedure_with_locals() {
    let source = "p := proc (a, b) local t -> (t := a * b; t + 1); p(3, 4)";
    assert_eq!(run(Machine::Stack, source), 13);
}

#[test]
fn test_arguments_are_pushed_right_to_left() {
    let code = stack_ir("f := (a, b) -> a - b; f(10, 1)");
    let ten = code.iter().position(|i| i == "loadc 10").unwrap();
    let one = code.iter().position(|i| i == "loadc 1").unwrap();
    assert!(one < ten);
    assert!(code.contains(&"slide 8 8".to_string()));
    assert_eq!(run(Machine::Stack, "f := (a, b) -> a - b; f(10, 1)"), 9);
}

#[test]
fn test_call_without_arguments_reserves_result_slot() {
    assert_eq!(run(Machine::Stack, "seven := () -> 7; seven() + 1"), 8);
}

#[test]
fn test_procedure_sees_globals_assigned_later() {
    let source = "g := 0; get := () -> g; g := 5; get()";
    assert_eq!(run(Machine::Stack, source), 5);
}

#[test]
fn test_globals_are_allocated_in_generation_order() {
    let err = compile(&parse("get := () -> g; g := 5; get()"), Machine::Stack).unwrap_err();
    assert!(matches!(err, CompileError::UndefinedVariable { ref name } if name == "g"));
}

#[test]
fn test_lambda_capturing_local_is_unsupported() {
    let err = compile(&parse("local k := 1 in (x -> x + k)"), Machine::Stack).unwrap_err();
    assert!(matches!(
        err,
        CompileError::UnsupportedConstruct {
            machine: Machine::Stack,
            ..
        }
    ));
}

#[test]
fn test_assembly_reserves_globals_before_frame_setup() {
    let asm = compile(&parse("a := 1; b := 2; c := 3; a"), Machine::Stack)
        .unwrap()
        .assemble();
    let pushes = asm.find("push    qword 0").unwrap();
    let base = asm.find("lea     rbx").unwrap();
    assert!(pushes < base);
    assert!(asm.contains("rbx,    [rsp + 16]"));
}
