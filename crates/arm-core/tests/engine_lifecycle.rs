#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::too_many_lines
)]

//! Engine lifecycle behavior: construction, memory attachment, image
//! loading, halting and resuming, and snapshot transfer.

use arm_core::{
    CoreConfig, HaltReason, ImageError, StepOutcome, Vm, DEFAULT_MEMORY, ENTRY_POINT, REG_SP,
};
use proptest::prelude::*;
use rstest::rstest;
use thiserror as _;

fn bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn fresh_engine_is_runnable_and_seeded() {
    let vm = Vm::new();
    assert!(!vm.halted());
    assert_eq!(vm.pc(), ENTRY_POINT);
    assert_eq!(vm.reg(REG_SP), (DEFAULT_MEMORY - 4) as u32);
    assert_eq!(vm.cycle(), 0);
}

#[rstest]
#[case::tiny(0x100)]
#[case::default_size(DEFAULT_MEMORY)]
#[case::large(0x80_0000)]
fn configured_memory_sets_the_stack_top(#[case] size: usize) {
    let vm = Vm::with_config(CoreConfig {
        memory_size: size,
        trace: false,
    });
    assert_eq!(vm.reg(REG_SP), (size - 4) as u32);
    assert_eq!(vm.ram().bytes().len(), size);
}

#[test]
fn reset_clears_registers_memory_and_halt() {
    let mut vm = Vm::new();
    vm.load_program(&bytes(&[0xE3A0_0005, 0xDEAD_BEEF])).unwrap();
    vm.run(10);
    assert!(vm.halted());

    vm.reset();
    assert!(!vm.halted());
    assert_eq!(vm.halt_reason(), HaltReason::None);
    assert_eq!(vm.reg(0), 0);
    assert_eq!(vm.pc(), ENTRY_POINT);
    assert_eq!(vm.cycle(), 0);
    assert!(vm.ram().bytes().iter().all(|&b| b == 0));
}

#[test]
fn image_that_does_not_fit_is_rejected_whole() {
    let mut vm = Vm::with_config(CoreConfig {
        memory_size: 0x100,
        trace: false,
    });
    let err = vm.load_image(0xF0, &[0u8; 0x20]).unwrap_err();
    assert_eq!(
        err,
        ImageError::OutOfBounds {
            addr: 0xF0,
            len: 0x20,
            memory: 0x100,
        }
    );
    assert!(vm.ram().bytes().iter().all(|&b| b == 0));
}

#[test]
fn fetch_outside_memory_halts_with_abort() {
    let mut vm = Vm::with_config(CoreConfig {
        memory_size: 0x100,
        trace: false,
    });
    // PC seeded at the entry point, which is past this tiny memory.
    assert_eq!(vm.step(), StepOutcome::Halted(HaltReason::Abort));
    assert!(vm.halted());
}

#[test]
fn halted_engine_refuses_to_step_until_cleared() {
    let mut vm = Vm::new();
    vm.load_program(&bytes(&[0xDEAD_BEEF, 0xE3A0_0001, 0xDEAD_BEEF]))
        .unwrap();
    vm.run(10);
    assert_eq!(vm.cycle(), 0);
    assert_eq!(vm.step(), StepOutcome::Halted(HaltReason::SentinelTrap));

    vm.clear_halt();
    vm.set_reg(15, ENTRY_POINT + 4);
    assert_eq!(vm.step(), StepOutcome::Retired);
    assert_eq!(vm.reg(0), 1);
}

#[test]
fn run_counts_suppressed_steps() {
    let mut vm = Vm::new();
    // Two suppressed words, then halt.
    vm.load_program(&bytes(&[0x03A0_0001, 0x03A0_0002, 0xDEAD_BEEF]))
        .unwrap();
    let out = vm.run(100);
    assert_eq!(out.steps, 3);
    assert_eq!(vm.cycle(), 2, "halt step does not retire");
    assert_eq!(vm.reg(0), 0);
}

#[test]
fn zero_step_budget_runs_until_halt() {
    let mut vm = Vm::new();
    vm.load_program(&bytes(&[
        0xE3A0_0005, // mov r0, #5
        0xE280_0003, // add r0, r0, #3
        0xDEAD_BEEF,
    ]))
    .unwrap();
    let out = vm.run(0);
    assert_eq!(out.steps, 3);
    assert_eq!(out.outcome, StepOutcome::Halted(HaltReason::SentinelTrap));
    assert_eq!(vm.reg(0), 8);
    assert_eq!(vm.halt_reason(), HaltReason::SentinelTrap);
}

#[test]
fn snapshot_carries_the_full_execution_position() {
    let mut vm = Vm::new();
    vm.load_program(&bytes(&[
        0xE3A0_0005, // mov r0, #5
        0xE280_0003, // add r0, r0, #3
        0xDEAD_BEEF,
    ]))
    .unwrap();
    vm.step();
    let snap = vm.snapshot();

    // A second engine with the same image resumes mid-program.
    let mut other = Vm::new();
    other
        .load_program(&bytes(&[0xE3A0_0005, 0xE280_0003, 0xDEAD_BEEF]))
        .unwrap();
    other.restore(&snap).unwrap();
    let out = other.run(10);
    assert_eq!(out.outcome, StepOutcome::Halted(HaltReason::SentinelTrap));
    assert_eq!(other.reg(0), 8);
    assert_eq!(other.cycle(), 2);
}

proptest! {
    // Random images either run, suppress, or halt; the engine never gets
    // stuck in an inconsistent state where it is halted with reason None.
    #[test]
    fn halt_reason_is_consistent_with_the_latch(image in proptest::collection::vec(any::<u8>(), 4..256)) {
        let mut vm = Vm::with_config(CoreConfig { memory_size: 0x1000, trace: false });
        vm.load_image(0, &image).unwrap();
        vm.set_reg(15, 0);
        for _ in 0..128 {
            let outcome = vm.step();
            if vm.halted() {
                prop_assert_ne!(vm.halt_reason(), HaltReason::None);
                prop_assert!(!outcome.may_continue());
                break;
            }
        }
    }
}
