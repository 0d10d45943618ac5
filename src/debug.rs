/// # debug
///
/// the run loop hands the machine to a `Debugger` whenever it stops at a
/// breakpoint or is single-stepping. `Repl` is the line-oriented one: it reads
/// commands until one of them resumes execution or quits.
///
/// ```text
/// break [ADDR]        add a breakpoint at PC or ADDR
/// rmbreak [ADDR]      remove the breakpoint at PC or ADDR
/// continue            run until the next breakpoint
/// next                execute one instruction
/// set ATTR VALUE      change a register, memory byte, colour, quirk or font
/// load PATH / save PATH           whole machine snapshot
/// loadflags PATH / saveflags PATH R0..R7 only
/// print [ATTR]        show ATTR, or everything bar memory
/// help, quit
/// ```
///
/// commands can be shortened to their first letter; where two share one
/// (`set`/`save`, `load`/`loadflags`) the first in the list above wins.
use crate::config::{parse_int, Palette, Quirks};
use crate::font::FontSelection;
use crate::machine::{Chip8, FLAG_REGISTER_COUNT, REGISTER_COUNT, STACK_SIZE};
use crate::opcode::disassemble;
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, Write};

/// what the run loop should do once the debugger lets go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAction {
    /// leave single-step mode and run to the next breakpoint
    Continue,
    /// run exactly one more instruction then pause again
    Step,
    Quit,
}

pub trait Debugger {
    fn pause(&mut self, vm: &mut Chip8) -> DebugAction;
}

const HELP: &str = "\
Available commands:
break [ADDRESS]: Add breakpoint to PC or ADDRESS, if given
rmbreak [ADDRESS]: Remove breakpoint at PC or ADDRESS, if given
continue: Exit debug mode until next breakpoint or completion
next: Step to the next instruction
set ATTRIBUTE VALUE: Set the given attribute to the given value
load PATH: Load program state from PATH
save PATH: Save program state to PATH
loadflags PATH: Load flag registers from PATH
saveflags PATH: Save flag registers to PATH
print [ATTRIBUTE]: Print current value of ATTRIBUTE
help: Print this help string
quit: Terminate the program

Attributes:
PC, SP, DT, ST, I: registers
VK: register to store next keypress
V, Vx, R, Rx: all registers, or just the one given
stack: stack values
$ADDRESS: value at ADDRESS
bg, fg: colours
quirks, sfont, bfont: quirk letters and font names

Without an attribute, print shows everything except memory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attr {
    Pc,
    Sp,
    Dt,
    St,
    I,
    Vk,
    Stack,
    V(Option<usize>),
    R(Option<usize>),
    Addr(u16),
    Quirks,
    Bg,
    Fg,
    SmallFont,
    BigFont,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Break(Option<u16>),
    RmBreak(Option<u16>),
    Continue,
    Next,
    Set(Attr, String),
    Load(String),
    Save(String),
    Print(Option<Attr>),
    Help,
    Quit,
    LoadFlags(String),
    SaveFlags(String),
}

const COMMANDS: [&str; 12] = [
    "break",
    "rmbreak",
    "continue",
    "next",
    "set",
    "load",
    "save",
    "print",
    "help",
    "quit",
    "loadflags",
    "saveflags",
];

fn parse_attr(s: &str) -> Option<Attr> {
    let attr = match s {
        "PC" => Attr::Pc,
        "SP" => Attr::Sp,
        "DT" => Attr::Dt,
        "ST" => Attr::St,
        "I" => Attr::I,
        "VK" | "K" => Attr::Vk,
        "stack" => Attr::Stack,
        "quirks" => Attr::Quirks,
        "bg" => Attr::Bg,
        "fg" => Attr::Fg,
        "sfont" => Attr::SmallFont,
        "bfont" => Attr::BigFont,
        "V" => Attr::V(None),
        "R" => Attr::R(None),
        _ => {
            if let Some(n) = s.strip_prefix('V') {
                let x = usize::from_str_radix(n, 16).ok().filter(|x| *x < REGISTER_COUNT)?;
                Attr::V(Some(x))
            } else if let Some(n) = s.strip_prefix('R') {
                let x = usize::from_str_radix(n, 16).ok().filter(|x| *x < FLAG_REGISTER_COUNT)?;
                Attr::R(Some(x))
            } else if s.starts_with('$') || s.starts_with('x') {
                Attr::Addr(parse_int(s).filter(|a| *a <= 0xfff)? as u16)
            } else {
                return None;
            }
        }
    };
    Some(attr)
}

fn parse_address(arg: &str) -> Result<Option<u16>, String> {
    if arg.is_empty() {
        return Ok(None);
    }
    match parse_int(arg) {
        Some(addr) if addr <= 0xfff => Ok(Some(addr as u16)),
        _ => Err(format!("Invalid address '{}'", arg)),
    }
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let name = COMMANDS
        .iter()
        .find(|c| **c == word)
        .or_else(|| {
            let mut chars = word.chars();
            match (chars.next(), chars.next()) {
                (Some(first), None) => COMMANDS.iter().find(|c| c.starts_with(first)),
                _ => None,
            }
        })
        .ok_or_else(|| "Invalid command".to_string())?;

    let path = || {
        if rest.is_empty() {
            Err("Not enough arguments.".to_string())
        } else {
            Ok(rest.to_string())
        }
    };

    let cmd = match *name {
        "break" => Command::Break(parse_address(rest)?),
        "rmbreak" => Command::RmBreak(parse_address(rest)?),
        "continue" => Command::Continue,
        "next" => Command::Next,
        "set" => {
            let (attr, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Not enough arguments.".to_string())?;
            let attr = parse_attr(attr).ok_or_else(|| "Invalid argument".to_string())?;
            Command::Set(attr, value.trim().to_string())
        }
        "load" => Command::Load(path()?),
        "save" => Command::Save(path()?),
        "print" if rest.is_empty() => Command::Print(None),
        "print" => Command::Print(Some(
            parse_attr(rest).ok_or_else(|| "Invalid argument".to_string())?,
        )),
        "help" => Command::Help,
        "quit" => Command::Quit,
        "loadflags" => Command::LoadFlags(path()?),
        _ => Command::SaveFlags(path()?),
    };
    Ok(cmd)
}

/// interactive debugger over any line source and sink
pub struct Repl<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Repl { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn prompt(&mut self) -> io::Result<Option<String>> {
        write!(self.output, "debug > ")?;
        self.output.flush()?;
        let mut line = String::new();
        match self.input.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }

    fn session(&mut self, vm: &mut Chip8) -> io::Result<DebugAction> {
        self.print_instruction(vm, vm.pc())?;
        while let Some(line) = self.prompt()? {
            if line.trim().is_empty() {
                continue;
            }
            let cmd = match parse_command(&line) {
                Ok(cmd) => cmd,
                Err(msg) => {
                    writeln!(self.output, "{}", msg)?;
                    continue;
                }
            };
            debug!("debugger: {:?}", cmd);
            match cmd {
                Command::Break(addr) => {
                    let addr = addr.unwrap_or(vm.pc());
                    vm.add_breakpoint(addr);
                }
                Command::RmBreak(addr) => {
                    let addr = addr.unwrap_or(vm.pc());
                    vm.remove_breakpoint(addr);
                }
                Command::Continue => return Ok(DebugAction::Continue),
                Command::Next => return Ok(DebugAction::Step),
                Command::Quit => return Ok(DebugAction::Quit),
                Command::Help => writeln!(self.output, "{}", HELP)?,
                Command::Print(None) => self.print_all(vm)?,
                Command::Print(Some(attr)) => self.print_attr(vm, attr)?,
                Command::Set(attr, value) => {
                    if let Err(msg) = set_attr(vm, attr, &value) {
                        writeln!(self.output, "{}", msg)?;
                    }
                }
                Command::Load(path) => {
                    if let Err(e) = vm.load_state_file(&path) {
                        writeln!(self.output, "Invalid file: {}", e)?;
                    }
                }
                Command::Save(path) => {
                    if let Err(e) = vm.save_state_file(&path) {
                        writeln!(self.output, "Invalid file: {}", e)?;
                    }
                }
                Command::LoadFlags(path) => {
                    if let Err(e) = File::open(&path).and_then(|mut f| vm.load_flags(&mut f)) {
                        writeln!(self.output, "Invalid file: {}", e)?;
                    }
                }
                Command::SaveFlags(path) => {
                    if let Err(e) = File::create(&path).and_then(|mut f| vm.save_flags(&mut f)) {
                        writeln!(self.output, "Invalid file: {}", e)?;
                    }
                }
            }
        }
        // input closed
        Ok(DebugAction::Quit)
    }

    fn print_instruction(&mut self, vm: &Chip8, addr: u16) -> io::Result<()> {
        let word = vm.word_at(addr);
        writeln!(self.output, "${:03x}: {:04x}\t{}", addr, word, disassemble(word))
    }

    fn print_all(&mut self, vm: &Chip8) -> io::Result<()> {
        self.print_instruction(vm, vm.pc())?;
        let out = &mut self.output;
        writeln!(out, "PC: {:03x}\t\tSP: {:02x}", vm.pc(), vm.sp())?;
        writeln!(out, "DT: {:02x}\t\tST: {:02x}", vm.dt(), vm.st())?;
        writeln!(out, "I:  {:03x}\t\tK:  {}", vm.i(), vk_text(vm))?;
        let palette = vm.palette();
        writeln!(out, "BG: {:06x}\tFG: {:06x}", palette.background, palette.foreground)?;
        writeln!(out, "Quirks: {}", quirks_text(vm.quirks()))?;
        for x in 0..REGISTER_COUNT / 2 {
            writeln!(out, "V{:x}: {:02x}\t\tV{:x}: {:02x}", x, vm.v(x), x + 8, vm.v(x + 8))?;
        }
        for x in 0..FLAG_REGISTER_COUNT / 2 {
            writeln!(out, "R{:x}: {:02x}\t\tR{:x}: {:02x}", x, vm.r(x), x + 4, vm.r(x + 4))?;
        }
        self.print_stack(vm)
    }

    fn print_stack(&mut self, vm: &Chip8) -> io::Result<()> {
        writeln!(self.output, "Stack:")?;
        let stack = vm.stack();
        for n in 0..STACK_SIZE / 2 {
            let slot = |n: usize| match stack.get(n) {
                Some(addr) => format!("${:03x}", addr),
                None => "-".to_string(),
            };
            writeln!(self.output, "x{:x}: {}\t\tx{:x}: {}", n, slot(n), n + 8, slot(n + 8))?;
        }
        Ok(())
    }

    fn print_attr(&mut self, vm: &Chip8, attr: Attr) -> io::Result<()> {
        let out = &mut self.output;
        match attr {
            Attr::Pc => writeln!(out, "PC: {:03x}", vm.pc()),
            Attr::Sp => writeln!(out, "SP: {:02x}", vm.sp()),
            Attr::Dt => writeln!(out, "DT: {:02x}", vm.dt()),
            Attr::St => writeln!(out, "ST: {:02x}", vm.st()),
            Attr::I => writeln!(out, "I:  {:03x}", vm.i()),
            Attr::Vk => writeln!(out, "VK: {}", vk_text(vm)),
            Attr::Bg => writeln!(out, "BG: {:06x}", vm.palette().background),
            Attr::Fg => writeln!(out, "FG: {:06x}", vm.palette().foreground),
            Attr::Quirks => writeln!(out, "Quirks: {}", quirks_text(vm.quirks())),
            Attr::SmallFont => writeln!(out, "SFONT: {}", vm.fonts().small),
            Attr::BigFont => writeln!(out, "BFONT: {}", vm.fonts().big),
            Attr::V(Some(x)) => writeln!(out, "V{:x}: {:02x}", x, vm.v(x)),
            Attr::R(Some(x)) => writeln!(out, "R{:x}: {:02x}", x, vm.r(x)),
            Attr::V(None) => {
                for x in 0..REGISTER_COUNT {
                    writeln!(out, "V{:x}: {:02x}", x, vm.v(x))?;
                }
                Ok(())
            }
            Attr::R(None) => {
                for x in 0..FLAG_REGISTER_COUNT {
                    writeln!(out, "R{:x}: {:02x}", x, vm.r(x))?;
                }
                Ok(())
            }
            Attr::Addr(addr) => self.print_instruction(vm, addr),
            Attr::Stack => self.print_stack(vm),
        }
    }
}

impl<R: BufRead, W: Write> Debugger for Repl<R, W> {
    fn pause(&mut self, vm: &mut Chip8) -> DebugAction {
        match self.session(vm) {
            Ok(action) => action,
            Err(e) => {
                warn!("debugger i/o failed, quitting: {}", e);
                DebugAction::Quit
            }
        }
    }
}

fn vk_text(vm: &Chip8) -> String {
    match vm.vk() {
        Some(x) => format!("V{:x}", x),
        None => "-".to_string(),
    }
}

fn quirks_text(quirks: Quirks) -> String {
    match quirks.to_string() {
        s if s.is_empty() => "None".to_string(),
        s => s,
    }
}

fn set_attr(vm: &mut Chip8, attr: Attr, value: &str) -> Result<(), String> {
    let number = |max: u32| match parse_int(value) {
        Some(n) if n <= max => Ok(n),
        _ => Err(format!("Invalid value '{}'", value)),
    };
    match attr {
        Attr::Pc => vm.set_pc(number(0xfff)? as u16),
        Attr::I => vm.set_i(number(0xffff)? as u16),
        Attr::Sp => vm.set_sp(number(STACK_SIZE as u32)? as usize),
        Attr::Dt => vm.set_dt(number(0xff)? as u8),
        Attr::St => vm.set_st(number(0xff)? as u8),
        Attr::V(Some(x)) => vm.set_v(x, number(0xff)? as u8),
        Attr::R(Some(x)) => vm.set_r(x, number(0xff)? as u8),
        Attr::Addr(addr) => vm.write_byte(addr, number(0xff)? as u8),
        Attr::Bg => vm.set_palette(Palette {
            background: number(0xffffff)?,
            ..vm.palette()
        }),
        Attr::Fg => vm.set_palette(Palette {
            foreground: number(0xffffff)?,
            ..vm.palette()
        }),
        Attr::Quirks => vm.set_quirks(value.parse().map_err(|e| format!("{}", e))?),
        Attr::SmallFont => {
            let fonts = FontSelection::parse(value).map_err(|e| format!("{}", e))?;
            vm.set_fonts(FontSelection {
                small: fonts.small,
                ..vm.fonts().clone()
            });
        }
        Attr::BigFont => {
            let fonts = FontSelection::parse(&format!(",{}", value)).map_err(|e| format!("{}", e))?;
            vm.set_fonts(FontSelection {
                big: fonts.big,
                ..vm.fonts().clone()
            });
        }
        Attr::Vk | Attr::Stack | Attr::V(None) | Attr::R(None) => {
            return Err("Attribute can't be set".to_string())
        }
    }
    Ok(())
}
