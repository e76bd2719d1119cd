//! Shared program builders for the integration tests.

#![allow(dead_code)]

use vm::{Assembler, Fault, FaultKind, ProgramImage, SlotKind, StackEntry, VmConfig, VM};

/// `fib(n) = n < 2 ? 1 : fib(n-1) + fib(n-2)`
pub fn recursive_fib() -> ProgramImage {
    let mut asm = Assembler::new();
    let fib = asm.function("fib", &[SlotKind::Int], Some(SlotKind::Int));
    let recurse = asm.label();

    asm.load(-1).push_int(2).lt().jz(recurse);
    asm.push_int(1).ret();

    asm.bind(recurse);
    asm.load(-1).push_int(1).sub().call(fib);
    asm.load(-1).push_int(2).sub().call(fib);
    asm.add().ret();

    asm.finish().expect("recursive fib assembles")
}

/// Loop version with three frame locals: a, b and the counter.
pub fn iterative_fib() -> ProgramImage {
    let mut asm = Assembler::new();
    asm.function("fib", &[SlotKind::Int], Some(SlotKind::Int));
    let head = asm.label();
    let done = asm.label();

    asm.reserve(3);
    asm.push_int(1).store(0);
    asm.push_int(1).store(1);
    asm.push_int(2).store(2);

    asm.bind(head);
    asm.load(2).load(-1).op(vm::OpCode::Le).jz(done);
    asm.load(0).load(1).add();
    asm.load(1).store(0);
    asm.store(1);
    asm.load(2).push_int(1).add().store(2);
    asm.jmp(head);

    asm.bind(done);
    asm.load(1).ret();

    asm.finish().expect("iterative fib assembles")
}

/// Reference values: fib(0) = fib(1) = 1.
pub fn fib_reference(n: u32) -> i32 {
    let (mut a, mut b) = (1i32, 1i32);
    for _ in 2..=n {
        (a, b) = (b, a.wrapping_add(b));
    }
    b
}

pub fn run(image: &ProgramImage, args: &[StackEntry]) -> Result<Option<StackEntry>, Fault> {
    VM::default().run(image.clone(), args)
}

pub fn run_with(
    config: VmConfig,
    image: &ProgramImage,
    args: &[StackEntry],
) -> Result<Option<StackEntry>, Fault> {
    VM::new(config).run(image.clone(), args)
}

/// Assemble a zero-argument program returning `returns`.
pub fn program(returns: Option<SlotKind>, body: impl FnOnce(&mut Assembler)) -> ProgramImage {
    let mut asm = Assembler::new();
    asm.function("main", &[], returns);
    body(&mut asm);
    asm.finish().expect("test program assembles")
}

/// Run and expect a fault of the given kind.
pub fn expect_fault(image: &ProgramImage, kind: FaultKind) -> Fault {
    match run(image, &[]) {
        Err(fault) => {
            assert_eq!(fault.kind, kind, "unexpected fault {fault}");
            fault
        }
        Ok(value) => panic!("expected {kind}, run returned {value:?}"),
    }
}
