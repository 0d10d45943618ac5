/// # snapshot
///
/// raw dump and restore of the whole machine, for the debugger's `save` and
/// `load`. the layout is just the fields in declaration order, big-endian,
/// with no header or version; it is a debugging aid and nothing else.
///
/// the RNG state is not saved.
use crate::config::{Palette, Quirks};
use crate::error::Chip8Error;
use crate::font::{self, FontSelection};
use crate::machine::{Chip8, KEY_COUNT, REGISTER_COUNT, STACK_SIZE};
use crate::opcode::Mode;
use crate::screen::{DisplayMode, PIXEL_COUNT};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::info;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// `key_wait` byte meaning nothing is waiting
const NO_KEY_WAIT: u8 = 0xff;

/// the 8 persistent flag registers, as written by `saveflags`
pub const FLAGS_FILE_BYTES: usize = 8;

impl Chip8 {
    pub fn save_state(&self, w: &mut impl Write) -> Result<(), Chip8Error> {
        w.write_all(self.memory.as_slice())?;
        w.write_all(&self.r)?;
        w.write_all(&self.v)?;
        w.write_u8(self.sp as u8)?;
        w.write_u8(self.dt)?;
        w.write_u8(self.st)?;
        for addr in self.stack.iter() {
            w.write_u16::<BigEndian>(*addr)?;
        }
        w.write_u16::<BigEndian>(self.pc)?;
        w.write_u16::<BigEndian>(self.i)?;
        let keys: Vec<u8> = self.keys.iter().map(|k| *k as u8).collect();
        w.write_all(&keys)?;
        w.write_u8(self.key_wait.map(|x| x as u8).unwrap_or(NO_KEY_WAIT))?;
        w.write_u8(self.running as u8)?;

        let pixels: Vec<u8> = self.screen.raw().iter().map(|p| *p as u8).collect();
        w.write_all(&pixels)?;
        w.write_u8(match self.screen.mode() {
            DisplayMode::Standard => 0,
            DisplayMode::Extended => 1,
        })?;
        let (xoff, yoff) = self.screen.offset();
        w.write_u8(xoff as u8)?;
        w.write_u8(yoff as u8)?;

        w.write_u8(self.quirks.to_bits())?;
        w.write_u8(self.mode.to_byte())?;
        w.write_u8(self.draw as u8)?;
        w.write_u8(font_index(font::SMALL_FONTS.iter().map(|f| f.0), self.fonts.small))?;
        w.write_u8(font_index(font::BIG_FONTS.iter().map(|f| f.0), self.fonts.big))?;
        w.write_u32::<BigEndian>(self.palette.background)?;
        w.write_u32::<BigEndian>(self.palette.foreground)?;

        w.write_u16::<BigEndian>(self.breakpoints.len() as u16)?;
        for addr in self.breakpoints.iter() {
            w.write_u16::<BigEndian>(*addr)?;
        }
        Ok(())
    }

    /// restore a `save_state` dump; on any error the machine is left as it was
    pub fn load_state(&mut self, r: &mut impl Read) -> Result<(), Chip8Error> {
        let mut next = self.clone();

        r.read_exact(next.memory.as_mut_slice())?;
        r.read_exact(&mut next.r)?;
        r.read_exact(&mut next.v)?;
        next.sp = r.read_u8()? as usize;
        if next.sp > STACK_SIZE {
            return Err(Chip8Error::BadSnapshot("stack pointer out of range"));
        }
        next.dt = r.read_u8()?;
        next.st = r.read_u8()?;
        for addr in next.stack.iter_mut() {
            *addr = r.read_u16::<BigEndian>()?;
        }
        next.pc = r.read_u16::<BigEndian>()?;
        next.i = r.read_u16::<BigEndian>()?;
        let mut keys = [0u8; KEY_COUNT];
        r.read_exact(&mut keys)?;
        for (key, byte) in next.keys.iter_mut().zip(keys) {
            *key = byte != 0;
        }
        next.key_wait = match r.read_u8()? {
            NO_KEY_WAIT => None,
            x if (x as usize) < REGISTER_COUNT => Some(x as usize),
            _ => return Err(Chip8Error::BadSnapshot("key wait register out of range")),
        };
        next.running = r.read_u8()? != 0;

        let mut pixels = vec![0u8; PIXEL_COUNT];
        r.read_exact(&mut pixels)?;
        for (p, byte) in next.screen.raw_mut().iter_mut().zip(pixels) {
            *p = byte != 0;
        }
        next.screen.set_mode(match r.read_u8()? {
            0 => DisplayMode::Standard,
            1 => DisplayMode::Extended,
            _ => return Err(Chip8Error::BadSnapshot("unknown display mode")),
        });
        let xoff = r.read_u8()? as usize;
        let yoff = r.read_u8()? as usize;
        next.screen.set_offset(xoff, yoff);

        next.quirks = Quirks::from_bits(r.read_u8()?);
        next.mode = Mode::from_byte(r.read_u8()?)
            .ok_or(Chip8Error::BadSnapshot("unknown interpreter mode"))?;
        // repaint regardless of what was saved
        r.read_u8()?;
        next.draw = true;
        let small = font::SMALL_FONTS
            .get(r.read_u8()? as usize)
            .map(|f| f.0)
            .ok_or(Chip8Error::BadSnapshot("unknown small font"))?;
        let big = font::BIG_FONTS
            .get(r.read_u8()? as usize)
            .map(|f| f.0)
            .ok_or(Chip8Error::BadSnapshot("unknown big font"))?;
        next.fonts = FontSelection { small, big };
        next.palette = Palette {
            background: r.read_u32::<BigEndian>()?,
            foreground: r.read_u32::<BigEndian>()?,
        };

        next.breakpoints.clear();
        let count = r.read_u16::<BigEndian>()?;
        for _ in 0..count {
            next.breakpoints.insert(r.read_u16::<BigEndian>()?);
        }

        *self = next;
        Ok(())
    }

    pub fn save_state_file(&self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let mut w = BufWriter::new(File::create(path.as_ref())?);
        self.save_state(&mut w)?;
        w.flush()?;
        info!("saved state to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_state_file(&mut self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let mut r = BufReader::new(File::open(path.as_ref())?);
        self.load_state(&mut r)?;
        info!("loaded state from {}", path.as_ref().display());
        Ok(())
    }

    /// dump R0..R7 on their own
    pub fn save_flags(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.r)
    }

    pub fn load_flags(&mut self, r: &mut impl Read) -> io::Result<()> {
        r.read_exact(&mut self.r)
    }
}

fn font_index<'a>(mut names: impl Iterator<Item = &'a str>, name: &str) -> u8 {
    names.position(|n| n == name).unwrap_or(0) as u8
}
