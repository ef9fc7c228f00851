//! Instruction execution pipeline for the LC-3 ISA.
//!
//! Each step follows the same sequence:
//! 1. Fetch the word at PC through the device-aware memory read
//! 2. Advance PC (wrapping at 16 bits)
//! 3. Decode into an [`Instruction`]
//! 4. Dispatch to exactly one `execute_*` handler
//!
//! Faults are precise: the register file is restored to its pre-fetch value,
//! so the reported PC is the address of the faulting instruction.

mod flags;
mod helpers;

pub use flags::FlagsUpdate;
pub use helpers::{base_offset_address, operand_value, pc_relative_address};

use crate::api::{Machine, StepOutcome};
use crate::console::Console;
use crate::decoder::{Decoder, Instruction, JsrTarget, Operand};
use crate::encoding::Opcode;
use crate::fault::{Fault, FaultCause};
use crate::memory::Memory;
use crate::state::{Register, RegisterFile, RunState};
use crate::trap::{dispatch_trap, TrapOutcome};

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Instruction retired; execution continues.
    Retired,
    /// `TRAP HALT` retired; the run-flag must be cleared.
    Halted,
}

/// Executes one decoded instruction whose PC has already been advanced.
///
/// `word` is the raw encoding, reported when the opcode is unimplemented.
///
/// # Errors
///
/// Returns a [`FaultCause`] for `RTI`, the reserved opcode, undefined trap
/// vectors and console failures. Registers may be partially updated on error;
/// [`step_one`] restores them.
pub fn execute_instruction(
    instr: Instruction,
    word: u16,
    machine: &mut Machine,
    console: &mut dyn Console,
) -> Result<ExecuteOutcome, FaultCause> {
    let Machine {
        memory, registers, ..
    } = &mut *machine;

    match instr {
        Instruction::Br { mask, offset } => execute_br(registers, mask, offset),
        Instruction::Add { dr, sr1, operand } => {
            execute_alu(registers, Opcode::Add, dr, sr1, operand);
        }
        Instruction::And { dr, sr1, operand } => {
            execute_alu(registers, Opcode::And, dr, sr1, operand);
        }
        Instruction::Not { dr, sr } => execute_not(registers, dr, sr),
        Instruction::Jmp { base } => execute_jmp(registers, base),
        Instruction::Jsr { target } => execute_jsr(registers, target),
        Instruction::Ld { dr, offset } => execute_ld(registers, memory, console, dr, offset)?,
        Instruction::Ldi { dr, offset } => execute_ldi(registers, memory, console, dr, offset)?,
        Instruction::Ldr { dr, base, offset } => {
            execute_ldr(registers, memory, console, dr, base, offset)?;
        }
        Instruction::Lea { dr, offset } => execute_lea(registers, dr, offset),
        Instruction::St { sr, offset } => execute_st(registers, memory, sr, offset),
        Instruction::Sti { sr, offset } => execute_sti(registers, memory, console, sr, offset)?,
        Instruction::Str { sr, base, offset } => execute_str(registers, memory, sr, base, offset),
        Instruction::Trap { vector } => return execute_trap(machine, console, vector),
        Instruction::Rti | Instruction::Reserved => {
            return Err(FaultCause::IllegalOpcode {
                opcode: instr.opcode(),
                word,
            });
        }
    }

    Ok(ExecuteOutcome::Retired)
}

fn execute_br(regs: &mut RegisterFile, mask: u16, offset: u16) {
    if regs.cond().matches(mask) {
        regs.set_pc(pc_relative_address(regs, offset));
    }
}

fn execute_alu(
    regs: &mut RegisterFile,
    opcode: Opcode,
    dr: Register,
    sr1: Register,
    operand: Operand,
) {
    let lhs = regs.get(sr1);
    let rhs = operand_value(regs, operand);
    let result = match opcode {
        Opcode::And => lhs & rhs,
        _ => lhs.wrapping_add(rhs),
    };
    FlagsUpdate::for_opcode(opcode).write(regs, dr, result);
}

fn execute_not(regs: &mut RegisterFile, dr: Register, sr: Register) {
    let result = !regs.get(sr);
    FlagsUpdate::for_opcode(Opcode::Not).write(regs, dr, result);
}

fn execute_jmp(regs: &mut RegisterFile, base: Register) {
    regs.set_pc(regs.get(base));
}

fn execute_jsr(regs: &mut RegisterFile, target: JsrTarget) {
    let return_pc = regs.pc();
    FlagsUpdate::for_opcode(Opcode::Jsr).write(regs, Register::LINK, return_pc);
    // The base register is read after linking, so `JSRR R7` lands on the link.
    let dest = match target {
        JsrTarget::Offset(offset) => return_pc.wrapping_add(offset),
        JsrTarget::Register(base) => regs.get(base),
    };
    regs.set_pc(dest);
}

fn execute_ld(
    regs: &mut RegisterFile,
    memory: &mut Memory,
    console: &mut dyn Console,
    dr: Register,
    offset: u16,
) -> Result<(), FaultCause> {
    let value = memory.read(pc_relative_address(regs, offset), console)?;
    FlagsUpdate::for_opcode(Opcode::Ld).write(regs, dr, value);
    Ok(())
}

fn execute_ldi(
    regs: &mut RegisterFile,
    memory: &mut Memory,
    console: &mut dyn Console,
    dr: Register,
    offset: u16,
) -> Result<(), FaultCause> {
    let pointer = memory.read(pc_relative_address(regs, offset), console)?;
    let value = memory.read(pointer, console)?;
    FlagsUpdate::for_opcode(Opcode::Ldi).write(regs, dr, value);
    Ok(())
}

fn execute_ldr(
    regs: &mut RegisterFile,
    memory: &mut Memory,
    console: &mut dyn Console,
    dr: Register,
    base: Register,
    offset: u16,
) -> Result<(), FaultCause> {
    let value = memory.read(base_offset_address(regs, base, offset), console)?;
    FlagsUpdate::for_opcode(Opcode::Ldr).write(regs, dr, value);
    Ok(())
}

fn execute_lea(regs: &mut RegisterFile, dr: Register, offset: u16) {
    let addr = pc_relative_address(regs, offset);
    FlagsUpdate::for_opcode(Opcode::Lea).write(regs, dr, addr);
}

fn execute_st(regs: &RegisterFile, memory: &mut Memory, sr: Register, offset: u16) {
    memory.write(pc_relative_address(regs, offset), regs.get(sr));
}

fn execute_sti(
    regs: &RegisterFile,
    memory: &mut Memory,
    console: &mut dyn Console,
    sr: Register,
    offset: u16,
) -> Result<(), FaultCause> {
    let pointer = memory.read(pc_relative_address(regs, offset), console)?;
    memory.write(pointer, regs.get(sr));
    Ok(())
}

fn execute_str(
    regs: &RegisterFile,
    memory: &mut Memory,
    sr: Register,
    base: Register,
    offset: u16,
) {
    memory.write(base_offset_address(regs, base, offset), regs.get(sr));
}

fn execute_trap(
    machine: &mut Machine,
    console: &mut dyn Console,
    vector: u8,
) -> Result<ExecuteOutcome, FaultCause> {
    match dispatch_trap(machine, vector, console)? {
        TrapOutcome::Continue => Ok(ExecuteOutcome::Retired),
        TrapOutcome::Halt => Ok(ExecuteOutcome::Halted),
    }
}

/// Executes exactly one instruction.
///
/// A machine that has already halted is left untouched and reports
/// [`StepOutcome::Halted`] again.
///
/// # Errors
///
/// Returns a [`Fault`] carrying the address of the faulting instruction. The
/// register file is restored to its value before the fetch.
pub fn step_one(machine: &mut Machine, console: &mut dyn Console) -> Result<StepOutcome, Fault> {
    if !machine.run_state.is_running() {
        return Ok(StepOutcome::Halted);
    }

    let snapshot = machine.registers;
    match fetch_and_execute(machine, console) {
        Ok(outcome) => {
            machine.instructions_retired = machine.instructions_retired.wrapping_add(1);
            match outcome {
                ExecuteOutcome::Retired => Ok(StepOutcome::Retired),
                ExecuteOutcome::Halted => {
                    machine.run_state = RunState::Halted;
                    Ok(StepOutcome::Halted)
                }
            }
        }
        Err(cause) => {
            machine.registers = snapshot;
            Err(Fault::new(snapshot.pc(), cause))
        }
    }
}

fn fetch_and_execute(
    machine: &mut Machine,
    console: &mut dyn Console,
) -> Result<ExecuteOutcome, FaultCause> {
    let pc = machine.registers.pc();
    let word = machine.memory.read(pc, console)?;
    machine.registers.set_pc(pc.wrapping_add(1));

    let instr = Decoder::decode(word);
    tracing::trace!("x{pc:04X}: x{word:04X}  {instr}");

    execute_instruction(instr, word, machine, console)
}

#[cfg(test)]
mod tests {
    use super::{execute_instruction, step_one, ExecuteOutcome};
    use crate::api::{Machine, StepOutcome};
    use crate::console::{ConsoleError, ScriptedConsole};
    use crate::decoder::Decoder;
    use crate::fault::{FaultCause, FaultClass};
    use crate::memory::{KBDR, KBSR, KBSR_READY};
    use crate::state::{ConditionFlag, Register, RunState};

    fn machine_with_program(program: &[u16]) -> Machine {
        let mut machine = Machine::new();
        for (addr, word) in (0x3000_u16..).zip(program.iter().copied()) {
            machine.memory.write(addr, word);
        }
        machine
    }

    fn run_one(machine: &mut Machine, console: &mut ScriptedConsole) -> StepOutcome {
        step_one(machine, console).expect("instruction should retire")
    }

    #[test]
    fn add_immediate_wraps_and_sets_zero() {
        // ADD R0, R0, #1
        let mut machine = machine_with_program(&[0x1021]);
        machine.registers.set(Register::R0, 0xFFFF);
        let mut console = ScriptedConsole::default();

        assert_eq!(run_one(&mut machine, &mut console), StepOutcome::Retired);

        assert_eq!(machine.registers.get(Register::R0), 0x0000);
        assert_eq!(machine.registers.cond(), ConditionFlag::Zero);
        assert_eq!(machine.registers.pc(), 0x3001);
    }

    #[test]
    fn add_register_form_sets_negative() {
        // ADD R2, R0, R1
        let mut machine = machine_with_program(&[0x1401]);
        machine.registers.set(Register::R0, 0x7FFF);
        machine.registers.set(Register::R1, 0x0001);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);

        assert_eq!(machine.registers.get(Register::R2), 0x8000);
        assert_eq!(machine.registers.cond(), ConditionFlag::Negative);
    }

    #[test]
    fn and_and_not_update_flags() {
        // AND R0, R0, #0 ; NOT R1, R0
        let mut machine = machine_with_program(&[0x5020, 0x923F]);
        machine.registers.set(Register::R0, 0x1234);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.get(Register::R0), 0);
        assert_eq!(machine.registers.cond(), ConditionFlag::Zero);

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.get(Register::R0), 0);
        assert_eq!(machine.registers.get(Register::R1), 0xFFFF);
        assert_eq!(machine.registers.cond(), ConditionFlag::Negative);
    }

    #[test]
    fn branch_taken_only_when_mask_matches() {
        // BRz #4 ; BRnp #4
        let mut machine = machine_with_program(&[0x0404, 0x0A04]);
        machine.registers.set_cond(ConditionFlag::Positive);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.pc(), 0x3001);

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.pc(), 0x3006);
    }

    #[test]
    fn branch_with_empty_mask_never_jumps() {
        let mut machine = machine_with_program(&[0x01FF]);
        let mut console = ScriptedConsole::default();
        for flag in [
            ConditionFlag::Negative,
            ConditionFlag::Zero,
            ConditionFlag::Positive,
        ] {
            machine.registers.set_pc(0x3000);
            machine.registers.set_cond(flag);
            run_one(&mut machine, &mut console);
            assert_eq!(machine.registers.pc(), 0x3001);
        }
    }

    #[test]
    fn jmp_and_ret_load_pc_from_register() {
        // JMP R2
        let mut machine = machine_with_program(&[0xC080]);
        machine.registers.set(Register::R2, 0x4444);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);

        assert_eq!(machine.registers.pc(), 0x4444);
    }

    #[test]
    fn jsr_links_and_jumps_pc_relative() {
        // JSR #-2
        let mut machine = machine_with_program(&[0x4FFE]);
        machine.registers.set_cond(ConditionFlag::Negative);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);

        assert_eq!(machine.registers.get(Register::R7), 0x3001);
        assert_eq!(machine.registers.pc(), 0x2FFF);
        assert_eq!(machine.registers.cond(), ConditionFlag::Negative);
    }

    #[test]
    fn jsrr_links_before_reading_base() {
        // JSRR R3 ; (at x5000) JSRR R7
        let mut machine = machine_with_program(&[0x40C0]);
        machine.memory.write(0x5000, 0x41C0);
        machine.registers.set(Register::R3, 0x5000);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.pc(), 0x5000);
        assert_eq!(machine.registers.get(Register::R7), 0x3001);

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.get(Register::R7), 0x5001);
        assert_eq!(machine.registers.pc(), 0x5001);
    }

    #[test]
    fn loads_read_memory_and_set_flags() {
        // LD R1, #2 ; LDR R2, R1, #1 ; LEA R3, #-3
        let mut machine = machine_with_program(&[0x2202, 0x6441, 0xE7FD, 0x4000]);
        machine.memory.write(0x4001, 0x8001);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.get(Register::R1), 0x4000);
        assert_eq!(machine.registers.cond(), ConditionFlag::Positive);

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.get(Register::R2), 0x8001);
        assert_eq!(machine.registers.cond(), ConditionFlag::Negative);

        run_one(&mut machine, &mut console);
        assert_eq!(machine.registers.get(Register::R3), 0x3000);
        assert_eq!(machine.registers.cond(), ConditionFlag::Positive);
    }

    #[test]
    fn ldi_follows_pointer() {
        // LDI R4, #1
        let mut machine = machine_with_program(&[0xA801, 0x0000, 0x4100]);
        machine.memory.write(0x4100, 0x0000);
        machine.registers.set_cond(ConditionFlag::Negative);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);

        assert_eq!(machine.registers.get(Register::R4), 0);
        assert_eq!(machine.registers.cond(), ConditionFlag::Zero);
    }

    #[test]
    fn stores_write_without_touching_flags() {
        // ST R0, #3 ; STI R0, #3 ; STR R0, R1, #-1
        let mut machine = machine_with_program(&[0x3003, 0xB003, 0x707F, 0x0000, 0x0000, 0x6000]);
        machine.registers.set(Register::R0, 0xABCD);
        machine.registers.set(Register::R1, 0x7001);
        machine.registers.set_cond(ConditionFlag::Positive);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);
        run_one(&mut machine, &mut console);
        run_one(&mut machine, &mut console);

        assert_eq!(machine.memory.peek(0x3004), 0xABCD);
        assert_eq!(machine.memory.peek(0x6000), 0xABCD);
        assert_eq!(machine.memory.peek(0x7000), 0xABCD);
        assert_eq!(machine.registers.cond(), ConditionFlag::Positive);
    }

    #[test]
    fn load_from_status_register_polls_console() {
        // LDI R0, #1 ; (pointer) xFE00
        let mut machine = machine_with_program(&[0xA001, 0x0000, KBSR]);
        let mut console = ScriptedConsole::new("k");

        run_one(&mut machine, &mut console);

        assert_eq!(machine.registers.get(Register::R0), KBSR_READY);
        assert_eq!(machine.memory.peek(KBDR), u16::from(b'k'));
        assert_eq!(machine.registers.cond(), ConditionFlag::Negative);
    }

    #[test]
    fn pc_wraps_at_top_of_memory() {
        let mut machine = Machine::new();
        machine.registers.set_pc(0xFFFF);
        // ADD R0, R0, #0
        machine.memory.write(0xFFFF, 0x1020);
        let mut console = ScriptedConsole::default();

        run_one(&mut machine, &mut console);

        assert_eq!(machine.registers.pc(), 0x0000);
    }

    #[test]
    fn halt_stops_and_further_steps_are_inert() {
        let mut machine = machine_with_program(&[0xF025, 0x1021]);
        let mut console = ScriptedConsole::default();

        assert_eq!(run_one(&mut machine, &mut console), StepOutcome::Halted);
        assert_eq!(machine.run_state, RunState::Halted);
        assert_eq!(machine.instructions_retired(), 1);

        let registers = machine.registers;
        assert_eq!(run_one(&mut machine, &mut console), StepOutcome::Halted);
        assert_eq!(machine.registers, registers);
        assert_eq!(machine.instructions_retired(), 1);
    }

    #[test]
    fn unimplemented_opcodes_fault_precisely() {
        for word in [0x8000, 0xD123] {
            let mut machine = machine_with_program(&[word]);
            machine.registers.set(Register::R7, 0x1111);
            let before = machine.registers;
            let mut console = ScriptedConsole::default();

            let fault = step_one(&mut machine, &mut console).expect_err("illegal opcode");

            assert_eq!(fault.pc, 0x3000);
            assert_eq!(fault.class(), FaultClass::IllegalInstruction);
            assert!(matches!(fault.cause, FaultCause::IllegalOpcode { word: w, .. } if w == word));
            assert_eq!(machine.registers, before);
            assert_eq!(machine.run_state, RunState::Running);
            assert_eq!(machine.instructions_retired(), 0);
        }
    }

    #[test]
    fn console_fault_inside_trap_restores_link_register() {
        // TRAP GETC with no input available
        let mut machine = machine_with_program(&[0xF020]);
        machine.registers.set(Register::R7, 0x2222);
        let mut console = ScriptedConsole::default();

        let fault = step_one(&mut machine, &mut console).expect_err("closed input");

        assert_eq!(fault.pc, 0x3000);
        assert!(matches!(
            fault.cause,
            FaultCause::Console(ConsoleError::Closed)
        ));
        assert_eq!(machine.registers.get(Register::R7), 0x2222);
        assert_eq!(machine.registers.pc(), 0x3000);
    }

    #[test]
    fn execute_instruction_reports_halt_outcome() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::default();
        let outcome = execute_instruction(Decoder::decode(0xF025), 0xF025, &mut machine, &mut console)
            .expect("halt");
        assert_eq!(outcome, ExecuteOutcome::Halted);
        assert_eq!(console.output_text(), "Shutdown\n");
    }
}
