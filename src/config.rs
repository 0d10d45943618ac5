use crate::error::Chip8Error;
use crate::font::FontSelection;
use crate::opcode::Mode;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// default instructions per second (and so timer ticks per second)
pub const DEFAULT_CLOCKSPEED: u32 = 1000;

/// edge-case behaviours that historical interpreters disagreed on; all off
/// is the behaviour of the original COSMAC VIP interpreter as documented by
/// Cowgod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quirks {
    /// `b`: OR/AND/XOR reset VF to 0
    pub bitwise: bool,
    /// `d`: sprites are clipped at the screen edge instead of wrapping
    pub draw: bool,
    /// `j`: BNNN jumps to NNN + VX instead of NNN + V0
    pub jump: bool,
    /// `l`: FX55/FX65 leave I pointing past the last byte touched
    pub loadstore: bool,
    /// `s`: SHR/SHL shift VX in place instead of reading VY
    pub shift: bool,
}

impl Quirks {
    pub(crate) fn to_bits(self) -> u8 {
        (self.bitwise as u8)
            | (self.draw as u8) << 1
            | (self.jump as u8) << 2
            | (self.loadstore as u8) << 3
            | (self.shift as u8) << 4
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        Quirks {
            bitwise: bits & 0x01 != 0,
            draw: bits & 0x02 != 0,
            jump: bits & 0x04 != 0,
            loadstore: bits & 0x08 != 0,
            shift: bits & 0x10 != 0,
        }
    }
}

impl FromStr for Quirks {
    type Err = Chip8Error;

    /// each letter flips its quirk, so "bb" is the same as ""
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut q = Quirks::default();
        for c in s.trim().chars() {
            match c {
                'b' => q.bitwise ^= true,
                'd' => q.draw ^= true,
                'j' => q.jump ^= true,
                'l' => q.loadstore ^= true,
                's' => q.shift ^= true,
                other => return Err(Chip8Error::InvalidQuirk(other)),
            }
        }
        Ok(q)
    }
}

impl fmt::Display for Quirks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, c) in [
            (self.bitwise, 'b'),
            (self.draw, 'd'),
            (self.jump, 'j'),
            (self.loadstore, 'l'),
            (self.shift, 's'),
        ] {
            if on {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// 24 bit colours handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: u32,
    pub foreground: u32,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            background: 0x000000,
            foreground: 0xffffff,
        }
    }
}

const HEX_PREFIXES: [&str; 5] = ["0x", "0X", "$", "x", "#"];

/// decimal, or hex when prefixed with `$`, `x`, `0x` or `#`
pub fn parse_int(s: &str) -> Option<u32> {
    let s = s.trim();
    let hex = HEX_PREFIXES
        .iter()
        .find_map(|prefix| s.strip_prefix(prefix));
    match hex {
        Some(digits) => u32::from_str_radix(digits, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_colour(s: &str) -> Result<u32, Chip8Error> {
    match parse_int(s) {
        Some(c) if c <= 0xffffff => Ok(c),
        _ => Err(Chip8Error::InvalidPalette(format!("bad colour '{}'", s.trim()))),
    }
}

impl FromStr for Palette {
    type Err = Chip8Error;

    /// `background,foreground`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bg, fg) = s
            .split_once(',')
            .ok_or_else(|| Chip8Error::InvalidPalette(format!("expected 'bg,fg', got '{}'", s)))?;
        Ok(Palette {
            background: parse_colour(bg)?,
            foreground: parse_colour(fg)?,
        })
    }
}

impl Palette {
    /// two lines of hex, background first; a prefix is allowed but not needed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Chip8Error> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let mut next = || -> Result<u32, Chip8Error> {
            let line = lines
                .next()
                .ok_or_else(|| Chip8Error::InvalidPalette("expected two colours".to_string()))?
                .trim();
            let digits = HEX_PREFIXES
                .iter()
                .find_map(|prefix| line.strip_prefix(prefix))
                .unwrap_or(line);
            match u32::from_str_radix(digits, 16) {
                Ok(c) if c <= 0xffffff => Ok(c),
                _ => Err(Chip8Error::InvalidPalette(format!("bad colour '{}'", line))),
            }
        };
        let background = next()?;
        let foreground = next()?;
        Ok(Palette {
            background,
            foreground,
        })
    }
}

/// everything needed to set up a run
#[derive(Debug, Clone)]
pub struct Config {
    /// instructions executed per second
    pub clockspeed: u32,
    /// drop into the debugger before the first instruction
    pub debug: bool,
    /// log every instruction as it executes
    pub verbose: bool,
    pub mode: Mode,
    pub quirks: Quirks,
    pub palette: Palette,
    pub fonts: FontSelection,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clockspeed: DEFAULT_CLOCKSPEED,
            debug: false,
            verbose: false,
            mode: Mode::default(),
            quirks: Quirks::default(),
            palette: Palette::default(),
            fonts: FontSelection::default(),
        }
    }
}
