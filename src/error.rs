use std::io;
use thiserror::Error;

/// fatal outcomes of executing one instruction; the run loop halts on any of
/// these rather than carrying on with a corrupted machine
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    #[error("invalid instruction {opcode:04x} at {pc:03x}")]
    InvalidInstruction { opcode: u16, pc: u16 },

    #[error("stack overflow at {pc:03x}")]
    StackOverflow { pc: u16 },

    #[error("stack underflow at {pc:03x}")]
    StackUnderflow { pc: u16 },
}

/// everything else that can go wrong, mostly at configuration time
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("unknown quirk '{0}' (expected one of b, d, j, l, s)")]
    InvalidQuirk(char),

    #[error("invalid colour palette: {0}")]
    InvalidPalette(String),

    #[error("unknown interpreter mode '{0}' (expected chip8, schip or xochip)")]
    InvalidMode(String),

    #[error("unknown font '{0}'")]
    UnknownFont(String),

    #[error("corrupt snapshot: {0}")]
    BadSnapshot(&'static str),

    #[error("line {line}: {msg}")]
    Asm { line: usize, msg: String },
}
