//! Fault paths: every malformed program must end in a structured fault,
//! never a host panic.

mod common;

use common::*;
use memory::Address;
use vm::{Assembler, FaultKind, OpCode, SlotKind, StackEntry, VmConfig, VM};

// ======================================================================
// Stack and call depth
// ======================================================================

#[test]
fn test_unbounded_recursion_overflows_call_stack() {
    let mut asm = Assembler::new();
    let f = asm.function("forever", &[], None);
    asm.call(f).ret();
    let image = asm.finish().unwrap();

    let mut vm = VM::new(VmConfig::default().with_max_call_depth(16));
    let fault = vm.run(image.clone(), &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::StackOverflow);
    assert_eq!(fault.ip, 0);
    assert_eq!(vm.call_depth(), 16);
}

#[test]
fn test_operand_stack_overflow() {
    let image = program(None, |asm| {
        let top = asm.label();
        asm.bind(top).push_int(1).jmp(top);
    });
    let fault = run_with(VmConfig::default().with_max_stack_slots(8), &image, &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::StackOverflow);
}

#[test]
fn test_reserve_past_limit_overflows() {
    let image = program(None, |asm| {
        asm.reserve(100).ret();
    });
    let fault = run_with(VmConfig::default().with_max_stack_slots(64), &image, &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::StackOverflow);
}

#[test]
fn test_pop_empty_stack() {
    let image = program(None, |asm| {
        asm.nop().nop().pop().ret();
    });
    let fault = expect_fault(&image, FaultKind::StackUnderflow);
    assert_eq!(fault.ip, 2);
    assert_eq!(fault.to_string(), "stack underflow at ip 2");
}

#[test]
fn test_callee_cannot_pop_its_arguments() {
    let mut asm = Assembler::new();
    asm.function("main", &[SlotKind::Int], None);
    asm.pop().ret();
    let image = asm.finish().unwrap();
    let fault = run(&image, &[StackEntry::Int(1)]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::StackUnderflow);
}

#[test]
fn test_call_with_missing_arguments() {
    let mut asm = Assembler::new();
    let main = asm.declare("main", &[], None);
    let takes_two = asm.function("takes_two", &[SlotKind::Int, SlotKind::Int], None);
    asm.ret();
    asm.begin(main).push_int(1).call(takes_two).ret();
    asm.entry(main);
    let image = asm.finish().unwrap();
    expect_fault(&image, FaultKind::StackUnderflow);
}

#[test]
fn test_call_with_wrong_argument_kind() {
    let mut asm = Assembler::new();
    let main = asm.declare("main", &[], None);
    let takes_int = asm.function("takes_int", &[SlotKind::Int], None);
    asm.ret();
    asm.begin(main).push_byte(1).call(takes_int).ret();
    asm.entry(main);
    let image = asm.finish().unwrap();
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::TypeMismatch { op: "CALL", .. }));
}

#[test]
fn test_load_outside_the_stack() {
    let image = program(Some(SlotKind::Int), |asm| {
        asm.load(3).ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::OutOfBounds(_)));

    let image = program(Some(SlotKind::Int), |asm| {
        asm.load(-1).ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::OutOfBounds(_)));
}

// ======================================================================
// Malformed code
// ======================================================================

#[test]
fn test_unknown_opcode() {
    let image = program(None, |asm| {
        asm.nop().raw(&[0xEE]);
    });
    let fault = expect_fault(&image, FaultKind::UnknownOpcode(0xEE));
    assert_eq!(fault.ip, 1);
}

#[test]
fn test_truncated_operand() {
    let image = program(None, |asm| {
        asm.raw(&[OpCode::PushInt.as_u8(), 0x01, 0x02]);
    });
    expect_fault(&image, FaultKind::TruncatedInstruction);
}

#[test]
fn test_jump_past_code_end() {
    let image = program(None, |asm| {
        asm.jmp_to(9999).ret();
    });
    expect_fault(&image, FaultKind::MalformedJump(9999));
}

#[test]
fn test_jump_into_operand_bytes() {
    let image = program(None, |asm| {
        asm.push_int(0).pop().jmp_to(2).ret();
    });
    expect_fault(&image, FaultKind::MalformedJump(2));
}

#[test]
fn test_entry_inside_operand_bytes() {
    // Byte 1 is the operand of PUSH_INT and happens to read as RET.
    let mut image = program(None, |asm| {
        asm.push_int(OpCode::Ret.as_u8() as i32).ret();
    });
    image.functions[0].entry = 1;

    let mut vm = VM::default();
    let fault = vm.run(image, &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::MalformedJump(1));
    assert_eq!(fault.ip, 1);
    assert_eq!(vm.steps_executed(), 0);
}

#[test]
fn test_running_off_the_end() {
    let image = program(None, |asm| {
        asm.nop();
    });
    let fault = expect_fault(&image, FaultKind::InvalidInstructionPointer(1));
    assert_eq!(fault.ip, 1);
}

#[test]
fn test_call_unknown_function() {
    let image = program(None, |asm| {
        asm.raw(&[OpCode::Call.as_u8(), 7, 0]).ret();
    });
    expect_fault(&image, FaultKind::InvalidFunction(7));
}

// ======================================================================
// Typing
// ======================================================================

#[test]
fn test_mixed_kind_arithmetic() {
    let image = program(Some(SlotKind::Int), |asm| {
        asm.push_int(1).push_byte(1).add().ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::TypeMismatch { op: "ADD", .. }));
}

#[test]
fn test_ref_is_not_a_condition() {
    let image = program(None, |asm| {
        let end = asm.label();
        asm.reserve(1).addr(0).jz(end);
        asm.bind(end).ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::TypeMismatch { op: "JZ", .. }));
}

#[test]
fn test_return_kind_checked() {
    let image = program(Some(SlotKind::Int), |asm| {
        asm.push_byte(1).ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::expected("RET", SlotKind::Int, SlotKind::Byte)
    );
}

#[test]
fn test_division_by_zero() {
    let image = program(Some(SlotKind::Int), |asm| {
        asm.push_int(10).push_int(0).op(OpCode::Div).ret();
    });
    expect_fault(&image, FaultKind::DivisionByZero);
}

#[test]
fn test_load_at_stack_slot_checks_tag() {
    let image = program(Some(SlotKind::Byte), |asm| {
        asm.reserve(1).addr(0).push_int(0).load_at(SlotKind::Byte).ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::expected("LOAD_AT", SlotKind::Byte, SlotKind::Int)
    );
}

// ======================================================================
// Heap faults
// ======================================================================

#[test]
fn test_free_interior_address_leaves_bitmap_untouched() {
    let image = program(None, |asm| {
        asm.push_int(32).alloc();
        asm.push_int(8).add().free().ret();
    });
    let mut vm = VM::default();
    let fault = vm.run(image.clone(), &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::InvalidFree(Address::heap(8)));
    assert_eq!(vm.heap().live_blocks(), 1);
    assert_eq!(vm.heap().used_cells(), 4);
}

#[test]
fn test_double_free() {
    let image = program(None, |asm| {
        asm.push_int(8).alloc().dup().free().free().ret();
    });
    let mut vm = VM::default();
    let fault = vm.run(image.clone(), &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::InvalidFree(Address::heap(0)));
    assert_eq!(vm.heap().used_cells(), 0);
}

#[test]
fn test_free_stack_address() {
    let image = program(None, |asm| {
        asm.reserve(1).addr(0).free().ret();
    });
    expect_fault(&image, FaultKind::InvalidFree(Address::stack(0)));
}

#[test]
fn test_out_of_memory() {
    let image = program(None, |asm| {
        asm.push_int(128).alloc().ret();
    });
    let fault = run_with(VmConfig::default().with_heap_size(64), &image, &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::OutOfMemory { requested: 128 });
}

#[test]
fn test_negative_allocation_size() {
    let image = program(None, |asm| {
        asm.push_int(-1).alloc().ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::OutOfBounds(_)));
}

#[test]
fn test_heap_access_below_base() {
    let image = program(Some(SlotKind::Int), |asm| {
        asm.push_int(8).alloc().push_int(-1).load_at(SlotKind::Int).ret();
    });
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::OutOfBounds(_)));
}

// ======================================================================
// Run control
// ======================================================================

#[test]
fn test_step_limit() {
    let image = program(None, |asm| {
        let top = asm.label();
        asm.bind(top).nop().jmp(top);
    });
    let mut vm = VM::new(VmConfig::default().with_max_steps(Some(100)));
    let fault = vm.run(image.clone(), &[]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::StepLimitExceeded(100));
    assert_eq!(vm.steps_executed(), 100);
}

#[test]
fn test_fault_is_sticky() {
    let image = program(None, |asm| {
        asm.pop().ret();
    });
    let mut vm = VM::default();
    vm.load(image, &[]).unwrap();
    let first = vm.step().unwrap_err();
    assert_eq!(vm.step().unwrap_err(), first);
    assert!(vm.is_halted());
}

#[test]
fn test_argument_count_mismatch() {
    let image = recursive_fib();
    let fault = run(&image, &[]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::ArgumentMismatch(_)));

    let fault = run(&image, &[StackEntry::Int(1), StackEntry::Int(2)]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::ArgumentMismatch(_)));
}

#[test]
fn test_argument_kind_mismatch() {
    let image = recursive_fib();
    let fault = run(&image, &[StackEntry::Byte(3)]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::ArgumentMismatch(_)));
}

#[test]
fn test_missing_entry_function() {
    let mut image = recursive_fib();
    image.entry_function = 4;
    let fault = run(&image, &[StackEntry::Int(3)]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::InvalidFunction(4));
}
