/// # opcode
///
/// static description of every instruction the interpreter knows: how to
/// recognise it (mask + pattern), how to print it, and which interpreter mode
/// it first appeared in. the execution engine dispatches on `Op`, the
/// disassembler renders `template`.
use crate::error::Chip8Error;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// which dialect the interpreter speaks; each mode is a superset of the last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Mode {
    Chip8,
    #[default]
    SuperChip,
    XoChip,
}

impl Mode {
    /// capability check, made once before dispatch
    pub fn supports(&self, info: &OpcodeInfo) -> bool {
        *self >= info.mode
    }

    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Mode::Chip8 => 0,
            Mode::SuperChip => 1,
            Mode::XoChip => 2,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Mode::Chip8),
            1 => Some(Mode::SuperChip),
            2 => Some(Mode::XoChip),
            _ => None,
        }
    }
}

impl FromStr for Mode {
    type Err = Chip8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chip8" | "chip-8" => Ok(Mode::Chip8),
            "schip" | "superchip" | "super-chip" => Ok(Mode::SuperChip),
            "xochip" | "xo-chip" => Ok(Mode::XoChip),
            other => Err(Chip8Error::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Chip8 => write!(f, "chip8"),
            Mode::SuperChip => write!(f, "schip"),
            Mode::XoChip => write!(f, "xochip"),
        }
    }
}

/// one tag per instruction handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Cls,
    Ret,
    Scd,
    Scu,
    Scr,
    Scl,
    Exit,
    Low,
    High,
    Jp,
    Call,
    SeImm,
    SneImm,
    SeReg,
    SaveRange,
    LoadRange,
    LdImm,
    AddImm,
    LdReg,
    Or,
    And,
    Xor,
    AddReg,
    Sub,
    Shr,
    Subn,
    Shl,
    SneReg,
    LdI,
    JpV0,
    Rnd,
    Drw,
    Skp,
    Sknp,
    LdVxDt,
    LdVxK,
    LdDtVx,
    LdStVx,
    AddI,
    LdF,
    LdHf,
    LdB,
    StoreRegs,
    LoadRegs,
    StoreFlags,
    LoadFlags,
}

/// a row of the opcode table
#[derive(Debug)]
pub struct OpcodeInfo {
    pub op: Op,
    /// assembly text; `{x}`/`{y}` register nibbles, `{b}` low nibble (hex),
    /// `{n}` low nibble (decimal), `{kk}` low byte, `{nnn}` address
    pub template: &'static str,
    pub mask: u16,
    pub pattern: u16,
    pub mode: Mode,
}

const fn entry(op: Op, template: &'static str, mask: u16, pattern: u16, mode: Mode) -> OpcodeInfo {
    OpcodeInfo {
        op,
        template,
        mask,
        pattern,
        mode,
    }
}

use Mode::{Chip8, SuperChip, XoChip};

#[rustfmt::skip]
pub static OPCODES: [OpcodeInfo; 46] = [
    entry(Op::Cls,        "CLS",                 0xffff, 0x00e0, Chip8),
    entry(Op::Ret,        "RET",                 0xffff, 0x00ee, Chip8),
    entry(Op::Scd,        "SCD {n}",             0xfff0, 0x00c0, SuperChip),
    entry(Op::Scu,        "SCU {n}",             0xfff0, 0x00d0, XoChip),
    entry(Op::Scr,        "SCR",                 0xffff, 0x00fb, SuperChip),
    entry(Op::Scl,        "SCL",                 0xffff, 0x00fc, SuperChip),
    entry(Op::Exit,       "EXIT",                0xffff, 0x00fd, SuperChip),
    entry(Op::Low,        "LOW",                 0xffff, 0x00fe, SuperChip),
    entry(Op::High,       "HIGH",                0xffff, 0x00ff, SuperChip),
    entry(Op::Jp,         "JP {nnn}",            0xf000, 0x1000, Chip8),
    entry(Op::Call,       "CALL {nnn}",          0xf000, 0x2000, Chip8),
    entry(Op::SeImm,      "SE V{x}, {kk}",       0xf000, 0x3000, Chip8),
    entry(Op::SneImm,     "SNE V{x}, {kk}",      0xf000, 0x4000, Chip8),
    entry(Op::SeReg,      "SE V{x}, V{y}",       0xf00f, 0x5000, Chip8),
    entry(Op::SaveRange,  "SAVE V{x}, V{y}",     0xf00f, 0x5002, XoChip),
    entry(Op::LoadRange,  "LOAD V{x}, V{y}",     0xf00f, 0x5003, XoChip),
    entry(Op::LdImm,      "LD V{x}, {kk}",       0xf000, 0x6000, Chip8),
    entry(Op::AddImm,     "ADD V{x}, {kk}",      0xf000, 0x7000, Chip8),
    entry(Op::LdReg,      "LD V{x}, V{y}",       0xf00f, 0x8000, Chip8),
    entry(Op::Or,         "OR V{x}, V{y}",       0xf00f, 0x8001, Chip8),
    entry(Op::And,        "AND V{x}, V{y}",      0xf00f, 0x8002, Chip8),
    entry(Op::Xor,        "XOR V{x}, V{y}",      0xf00f, 0x8003, Chip8),
    entry(Op::AddReg,     "ADD V{x}, V{y}",      0xf00f, 0x8004, Chip8),
    entry(Op::Sub,        "SUB V{x}, V{y}",      0xf00f, 0x8005, Chip8),
    entry(Op::Shr,        "SHR V{x}, V{y}",      0xf00f, 0x8006, Chip8),
    entry(Op::Subn,       "SUBN V{x}, V{y}",     0xf00f, 0x8007, Chip8),
    entry(Op::Shl,        "SHL V{x}, V{y}",      0xf00f, 0x800e, Chip8),
    entry(Op::SneReg,     "SNE V{x}, V{y}",      0xf00f, 0x9000, Chip8),
    entry(Op::LdI,        "LD I, {nnn}",         0xf000, 0xa000, Chip8),
    entry(Op::JpV0,       "JP V0, {nnn}",        0xf000, 0xb000, Chip8),
    entry(Op::Rnd,        "RND V{x}, {kk}",      0xf000, 0xc000, Chip8),
    entry(Op::Drw,        "DRW V{x}, V{y}, {b}", 0xf000, 0xd000, Chip8),
    entry(Op::Skp,        "SKP V{x}",            0xf0ff, 0xe09e, Chip8),
    entry(Op::Sknp,       "SKNP V{x}",           0xf0ff, 0xe0a1, Chip8),
    entry(Op::LdVxDt,     "LD V{x}, DT",         0xf0ff, 0xf007, Chip8),
    entry(Op::LdVxK,      "LD V{x}, K",          0xf0ff, 0xf00a, Chip8),
    entry(Op::LdDtVx,     "LD DT, V{x}",         0xf0ff, 0xf015, Chip8),
    entry(Op::LdStVx,     "LD ST, V{x}",         0xf0ff, 0xf018, Chip8),
    entry(Op::AddI,       "ADD I, V{x}",         0xf0ff, 0xf01e, Chip8),
    entry(Op::LdF,        "LD F, V{x}",          0xf0ff, 0xf029, Chip8),
    entry(Op::LdHf,       "LD HF, V{x}",         0xf0ff, 0xf030, SuperChip),
    entry(Op::LdB,        "LD B, V{x}",          0xf0ff, 0xf033, Chip8),
    entry(Op::StoreRegs,  "LD [I], V{x}",        0xf0ff, 0xf055, Chip8),
    entry(Op::LoadRegs,   "LD V{x}, [I]",        0xf0ff, 0xf065, Chip8),
    entry(Op::StoreFlags, "LD R, V{x}",          0xf0ff, 0xf075, SuperChip),
    entry(Op::LoadFlags,  "LD V{x}, R",          0xf0ff, 0xf085, SuperChip),
];

/// find the table row matching an instruction word, if any
pub fn lookup(word: u16) -> Option<&'static OpcodeInfo> {
    OPCODES.iter().find(|info| word & info.mask == info.pattern)
}

/// an instruction word split into its conventional fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub word: u16,
    /// top nibble; selects the family
    pub a: u8,
    pub x: usize,
    pub y: usize,
    /// bottom nibble
    pub b: u8,
    pub kk: u8,
    pub nnn: u16,
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Opcode {
            word,
            a: (word >> 12) as u8,
            x: ((word >> 8) & 0xf) as usize,
            y: ((word >> 4) & 0xf) as usize,
            b: (word & 0xf) as u8,
            kk: (word & 0xff) as u8,
            nnn: word & 0x0fff,
        }
    }
}

/// address operand of JP / CALL / LD I / JP V0, which the disassembler can
/// replace with a label
pub fn jump_target(word: u16) -> Option<u16> {
    match word >> 12 {
        0x1 | 0x2 | 0xa | 0xb => Some(word & 0x0fff),
        _ => None,
    }
}

/// render a single instruction as assembly text
pub fn disassemble(word: u16) -> String {
    render(word, None)
}

fn render(word: u16, labels: Option<&BTreeMap<u16, usize>>) -> String {
    let info = match lookup(word) {
        Some(info) => info,
        None => return format!(".dw ${:04x}", word),
    };
    let op = Opcode::from(word);
    let nnn = match labels.and_then(|l| l.get(&op.nnn)) {
        Some(n) => format!("label{}", n),
        None => format!("${:03x}", op.nnn),
    };
    info.template
        .replace("{x}", &format!("{:x}", op.x))
        .replace("{y}", &format!("{:x}", op.y))
        .replace("{kk}", &format!("${:02x}", op.kk))
        .replace("{b}", &format!("${:x}", op.b))
        .replace("{n}", &op.b.to_string())
        .replace("{nnn}", &nnn)
}

/// how `disassemble_rom` should lay out its listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingOptions {
    pub addresses: bool,
    pub labels: bool,
}

/// list a whole ROM as it would sit in memory from 0x200
pub fn disassemble_rom(rom: &[u8], options: ListingOptions) -> String {
    let base = crate::memory::PROGRAM_ADDR;
    let words: Vec<(u16, u16)> = rom
        .chunks_exact(2)
        .enumerate()
        .map(|(n, w)| (base + 2 * n as u16, ((w[0] as u16) << 8) | w[1] as u16))
        .collect();

    // only targets that land on a listed word get a label line to point at
    let mut labels = BTreeMap::new();
    if options.labels {
        for (_, word) in &words {
            if let Some(to) = jump_target(*word).filter(|to| words.iter().any(|(a, _)| a == to)) {
                let next = labels.len() + 1;
                labels.entry(to).or_insert(next);
            }
        }
    }

    let mut out = String::new();
    for (addr, word) in &words {
        if let Some(n) = labels.get(addr) {
            out.push_str(&format!("label{}:\n", n));
        }
        if options.addresses {
            out.push_str(&format!("{:03x}: ", addr));
        }
        out.push_str(&render(*word, options.labels.then(|| &labels)));
        out.push('\n');
    }
    // odd trailing byte can't be an instruction
    if rom.len() % 2 == 1 {
        if options.addresses {
            out.push_str(&format!("{:03x}: ", base as usize + rom.len() - 1));
        }
        out.push_str(&format!(".db ${:02x}\n", rom[rom.len() - 1]));
    }
    out
}
