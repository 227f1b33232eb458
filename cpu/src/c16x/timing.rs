//! Instruction timing, in CPU clock cycles.
//!
//! These are the minimum state times from the instruction set
//! manual, assuming code and data in internal memory: a two-byte
//! instruction takes 2 cycles and a four-byte one 4.  Multiply and
//! divide take longer; a taken branch pays for refilling the
//! pipeline.
use super::decode::Instruction;

pub(crate) const INTERRUPT_ENTRY_CYCLES: u64 = 8;

const TAKEN_BRANCH_PENALTY: u64 = 2;

pub(crate) fn instruction_cycles(inst: &Instruction, branch_taken: bool) -> u64 {
    let base = match inst.opcode() {
        // MUL, MULU
        0x0B | 0x1B => 10,
        // DIV, DIVU
        0x4B | 0x5B => 20,
        // DIVL, DIVLU
        0x6B | 0x7B => 20,
        _ => u64::from(inst.length()),
    };
    if branch_taken {
        base + TAKEN_BRANCH_PENALTY
    } else {
        base
    }
}

#[test]
fn test_cycle_costs() {
    let nop = Instruction::from_words(0x00CC, 0);
    let mov_imm = Instruction::from_words(0xF0E6, 0x1234);
    let mul = Instruction::from_words(0x120B, 0);
    assert_eq!(instruction_cycles(&nop, false), 2);
    assert_eq!(instruction_cycles(&mov_imm, false), 4);
    assert_eq!(instruction_cycles(&mul, false), 10);
    let jmpr = Instruction::from_words(0x020D, 0);
    assert_eq!(instruction_cycles(&jmpr, true), 4);
}
