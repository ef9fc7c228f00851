#![no_main]

use lc3_core::{Decoder, Machine, MachineConfig, ScriptedConsole};
use libfuzzer_sys::fuzz_target;

const STEP_LIMIT: u64 = 4096;

fuzz_target!(|data: &[u8]| {
    // First byte selects how much of the tail is keyboard input.
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (input, image) = rest.split_at(split);

    if let [hi, lo, ..] = image {
        let _ = Decoder::decode(u16::from_be_bytes([*hi, *lo])).to_string();
    }

    let mut machine = Machine::with_config(MachineConfig {
        instruction_limit: Some(STEP_LIMIT),
        ..MachineConfig::default()
    });
    let Ok(summary) = machine.load_image(image) else {
        return;
    };
    machine.registers.set_pc(summary.origin);

    let mut console = ScriptedConsole::new(input);
    let _ = machine.run(&mut console);
    let _ = machine.disassemble_around_pc(4, 4);
});
