/// # cpu
///
/// fetch, decode and execute. `execute` runs one instruction word against the
/// machine and hands back how far PC should move (0 for anything that set PC
/// itself, 2 otherwise); `step` does the fetch and applies that delta.
///
/// arithmetic follows one rule for VF: work out the flag, store the result,
/// then store the flag. so when VF is also the destination the flag wins.
use crate::error::ExecError;
use crate::font::{BIG_FONT_ADDR, BIG_GLYPH_BYTES, SMALL_FONT_ADDR, SMALL_GLYPH_BYTES};
use crate::machine::{Chip8, FLAG_REGISTER_COUNT, STACK_SIZE};
use crate::memory::MemoryMap;
use crate::opcode::{self, Op, Opcode};
use crate::screen::DisplayMode;
use log::debug;
use rand::Rng;

const VF: usize = 0xf;

impl Chip8 {
    /// run the instruction at PC and advance past it
    pub fn step(&mut self) -> Result<u16, ExecError> {
        let word = self.current_opcode();
        let delta = self.execute(word)?;
        self.pc = self.pc.wrapping_add(delta);
        Ok(delta)
    }

    /// run a single instruction word; returns the PC delta
    pub fn execute(&mut self, word: u16) -> Result<u16, ExecError> {
        let pc = self.pc;
        let info = opcode::lookup(word)
            .filter(|info| self.mode.supports(info))
            .ok_or(ExecError::InvalidInstruction { opcode: word, pc })?;
        let op = Opcode::from(word);
        let (x, y) = (op.x, op.y);

        match info.op {
            Op::Cls => {
                self.screen.clear();
                self.draw = true;
            }
            Op::Ret => {
                if self.sp == 0 {
                    return Err(ExecError::StackUnderflow { pc });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp];
                return Ok(0);
            }
            Op::Scd => {
                self.screen.scroll_down(op.b as usize);
                self.draw = true;
            }
            Op::Scu => {
                self.screen.scroll_up(op.b as usize);
                self.draw = true;
            }
            Op::Scr => {
                self.screen.scroll_right(4);
                self.draw = true;
            }
            Op::Scl => {
                self.screen.scroll_left(4);
                self.draw = true;
            }
            Op::Exit => {
                debug!("EXIT at {:03x}", pc);
                self.running = false;
                return Ok(0);
            }
            Op::Low => {
                self.screen.set_mode(DisplayMode::Standard);
                self.draw = true;
            }
            Op::High => {
                self.screen.set_mode(DisplayMode::Extended);
                self.draw = true;
            }
            Op::Jp => {
                self.pc = op.nnn;
                return Ok(0);
            }
            Op::Call => {
                if self.sp >= STACK_SIZE {
                    return Err(ExecError::StackOverflow { pc });
                }
                self.stack[self.sp] = pc.wrapping_add(2);
                self.sp += 1;
                self.pc = op.nnn;
                return Ok(0);
            }
            Op::SeImm => self.skip_if(self.v[x] == op.kk),
            Op::SneImm => self.skip_if(self.v[x] != op.kk),
            Op::SeReg => self.skip_if(self.v[x] == self.v[y]),
            Op::SneReg => self.skip_if(self.v[x] != self.v[y]),
            Op::SaveRange => {
                for (n, reg) in register_range(x, y).enumerate() {
                    self.memory.write_byte(self.i.wrapping_add(n as u16), self.v[reg]);
                }
            }
            Op::LoadRange => {
                for (n, reg) in register_range(x, y).enumerate() {
                    self.v[reg] = self.memory.read_byte(self.i.wrapping_add(n as u16));
                }
            }
            Op::LdImm => self.v[x] = op.kk,
            Op::AddImm => {
                let (sum, carry) = self.v[x].overflowing_add(op.kk);
                self.set_with_flag(x, sum, carry);
            }
            Op::LdReg => self.v[x] = self.v[y],
            Op::Or => self.bitwise(x, self.v[x] | self.v[y]),
            Op::And => self.bitwise(x, self.v[x] & self.v[y]),
            Op::Xor => self.bitwise(x, self.v[x] ^ self.v[y]),
            Op::AddReg => {
                let (sum, carry) = self.v[x].overflowing_add(self.v[y]);
                self.set_with_flag(x, sum, carry);
            }
            Op::Sub => {
                let (vx, vy) = (self.v[x], self.v[y]);
                self.set_with_flag(x, vx.wrapping_sub(vy), vx >= vy);
            }
            Op::Subn => {
                let (vx, vy) = (self.v[x], self.v[y]);
                self.set_with_flag(x, vy.wrapping_sub(vx), vy >= vx);
            }
            Op::Shr => {
                let src = self.shift_source(x, y);
                self.set_with_flag(x, src >> 1, src & 0x01 != 0);
            }
            Op::Shl => {
                let src = self.shift_source(x, y);
                self.set_with_flag(x, src << 1, src & 0x80 != 0);
            }
            Op::LdI => self.i = op.nnn,
            Op::JpV0 => {
                let reg = if self.quirks.jump { (op.nnn >> 8) as usize & 0xf } else { 0 };
                self.pc = op.nnn.wrapping_add(self.v[reg] as u16);
                return Ok(0);
            }
            Op::Rnd => self.v[x] = self.rng.gen::<u8>() & op.kk,
            Op::Drw => self.draw_sprite(self.v[x], self.v[y], op.b),
            Op::Skp => self.skip_if(self.keys[(self.v[x] & 0xf) as usize]),
            Op::Sknp => self.skip_if(!self.keys[(self.v[x] & 0xf) as usize]),
            Op::LdVxDt => self.v[x] = self.dt,
            Op::LdVxK => match self.pressed_key() {
                Some(key) => self.v[x] = key,
                None => {
                    debug!("waiting for key into V{:x}", x);
                    self.key_wait = Some(x);
                    return Ok(0);
                }
            },
            Op::LdDtVx => self.dt = self.v[x],
            Op::LdStVx => self.st = self.v[x],
            Op::AddI => self.i = self.i.wrapping_add(self.v[x] as u16),
            Op::LdF => {
                self.i = SMALL_FONT_ADDR + (self.v[x] & 0xf) as u16 * SMALL_GLYPH_BYTES;
            }
            Op::LdHf => {
                self.i = BIG_FONT_ADDR + (self.v[x] & 0xf) as u16 * BIG_GLYPH_BYTES;
            }
            Op::LdB => {
                let vx = self.v[x];
                self.memory.write_byte(self.i, vx / 100);
                self.memory.write_byte(self.i.wrapping_add(1), vx / 10 % 10);
                self.memory.write_byte(self.i.wrapping_add(2), vx % 10);
            }
            Op::StoreRegs => {
                for n in 0..x {
                    self.memory.write_byte(self.i.wrapping_add(n as u16), self.v[n]);
                }
                if self.quirks.loadstore {
                    self.i = self.i.wrapping_add(x as u16 + 1);
                }
            }
            Op::LoadRegs => {
                for n in 0..x {
                    self.v[n] = self.memory.read_byte(self.i.wrapping_add(n as u16));
                }
                if self.quirks.loadstore {
                    self.i = self.i.wrapping_add(x as u16 + 1);
                }
            }
            Op::StoreFlags => {
                let n = x.min(FLAG_REGISTER_COUNT);
                self.r[..n].copy_from_slice(&self.v[..n]);
            }
            Op::LoadFlags => {
                let n = x.min(FLAG_REGISTER_COUNT);
                self.v[..n].copy_from_slice(&self.r[..n]);
            }
        }
        Ok(2)
    }

    // skipping moves PC here; the caller's delta covers the instruction itself
    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn set_with_flag(&mut self, x: usize, value: u8, flag: bool) {
        self.v[x] = value;
        self.v[VF] = flag as u8;
    }

    fn bitwise(&mut self, x: usize, value: u8) {
        self.v[x] = value;
        if self.quirks.bitwise {
            self.v[VF] = 0;
        }
    }

    fn shift_source(&self, x: usize, y: usize) -> u8 {
        if self.quirks.shift {
            self.v[x]
        } else {
            self.v[y]
        }
    }

    /// XOR a sprite from I onto the screen at (vx, vy). `n == 0` in extended
    /// mode draws a 16x16 sprite of big-endian words. VF ends up 1 only when
    /// a sprite bit turned off a lit pixel
    fn draw_sprite(&mut self, vx: u8, vy: u8, n: u8) {
        self.v[VF] = 0;
        let (width, height) = (self.screen.width(), self.screen.height());
        let (rows, cols) = if n == 0 && self.screen.mode() == DisplayMode::Extended {
            (16, 16)
        } else {
            (n as usize, 8)
        };
        let x0 = vx as usize % width;
        let y0 = vy as usize % height;

        let mut collision = false;
        for row in 0..rows {
            let bits = if cols == 16 {
                self.memory.get_word(self.i.wrapping_add(2 * row as u16))
            } else {
                (self.memory.read_byte(self.i.wrapping_add(row as u16)) as u16) << 8
            };
            for col in 0..cols {
                if bits & (0x8000 >> col) == 0 {
                    continue;
                }
                let (px, py) = (x0 + col, y0 + row);
                if self.quirks.draw && (px >= width || py >= height) {
                    continue;
                }
                collision |= self.screen.toggle(px % width, py % height);
            }
        }
        self.v[VF] = collision as u8;
        self.draw = true;
    }
}

// XO-CHIP register ranges run either direction, both ends included
fn register_range(x: usize, y: usize) -> impl Iterator<Item = usize> {
    (0..=x.abs_diff(y)).map(move |n| if x <= y { x + n } else { x - n })
}
