///
/// ## Design
///
/// * one instruction per tick; the tick rate is the clock speed, and the
///   delay and sound timers count down once per executed instruction
/// * CHIP-8, SUPER-CHIP and a sliver of XO-CHIP, selected by `Mode`; an
///   instruction from a later dialect is just an invalid instruction
/// * the historical disagreements (VF reset on logic ops, sprite clipping,
///   BNNN register, I after FX55/FX65, shift source) are opt-in `Quirks`
/// * abstract display, input, audio and debugger so can plug alternatives;
///   TUI in-console for the real thing, scripted doubles for tests
///
/// Model
///
/// front end (main.rs)
///  |-- config: clock speed, mode, quirks, fonts, palette
///  |-- machine(config)                 -- memory, registers, stack, screen
///  |    |-- opcode table               -- decode + disassembly
///  |    `-- cpu                        -- execute one word, return PC delta
///  |-- interpreter(machine, display, input, audio, debugger)
///  `-- main loop
///       |-- events = input.poll(); apply key transitions
///       |-- if waiting for a key and one went down: deliver it
///       |-- if debugging and (stepping or at a breakpoint): debugger.pause()
///       |-- if running: step(), tick timers, beeper
///       `-- if anything drew: display.draw(screen, palette)
///
/// c8dis and c8as list a ROM from the opcode table and assemble one back.
pub mod asm;
pub mod config;
pub mod cpu;
pub mod debug;
pub mod display;
pub mod error;
pub mod font;
pub mod input;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod opcode;
pub mod screen;
pub mod snapshot;
pub mod sound;

pub use config::{Config, Palette, Quirks};
pub use error::{Chip8Error, ExecError};
pub use machine::{Chip8, RunState};
pub use opcode::Mode;
