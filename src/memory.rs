use crate::error::Chip8Error;
use crate::font::{self, FontSelection};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents memory map, ROM, RAM etc.
pub trait MemoryMap {
    /// write unknown len of data into memory at a particular address; returns
    /// how many bytes were written
    fn write_any(&mut self, reader: &mut impl io::Read, addr: u16) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.write(buf.as_slice(), addr)?;
        Ok(len)
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), Chip8Error> {
        let space = self.size().saturating_sub(addr as usize);
        if data.len() > space {
            return Err(Chip8Error::RomTooLarge {
                size: data.len(),
                max: space,
            });
        }
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
        Ok(())
    }

    /// get a big-endian two-byte word (instructions); wraps at the top of RAM
    fn get_word(&self, addr: u16) -> u16 {
        ((self.read_byte(addr) as u16) << 8) | self.read_byte(addr.wrapping_add(1)) as u16
    }

    /// single byte; the address is masked into range
    fn read_byte(&self, addr: u16) -> u8;

    /// single byte; the address is masked into range
    fn write_byte(&mut self, addr: u16, value: u8);

    /// get a r/w slice of the underlying memory (heap)
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory (heap)
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];

    fn size(&self) -> usize;
}

/// Defines the CHIP-8 memory map
///   0x0000-0x004f  small font (16 glyphs x 5 bytes)
///   0x0050-0x00ef  big font (16 glyphs x 10 bytes)
///   0x00f0-0x01ff  unused
///   0x0200-0x0fff  program
///
/// the stack, registers and display live outside addressable memory
#[derive(Clone)]
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[(addr & ADDR_MASK) as usize]
    }
    fn write_byte(&mut self, addr: u16, value: u8) {
        self.bytes[(addr & ADDR_MASK) as usize] = value;
    }
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
    fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// how much RAM we have
pub const RAM_SIZE_BYTES: usize = 4096;

/// usable address bits
pub const ADDR_MASK: u16 = 0x0fff;

/// where the program is loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// biggest ROM that fits
pub const MAX_PROGRAM_BYTES: usize = RAM_SIZE_BYTES - PROGRAM_ADDR as usize;

impl Chip8MemoryMap {
    /// zeroed memory with the given fonts baked in
    pub fn new(fonts: &FontSelection) -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; RAM_SIZE_BYTES].into_boxed_slice(),
            program_addr: PROGRAM_ADDR,
        };
        mm.set_fonts(fonts);
        mm
    }

    /// (re)write both glyph sets into low memory
    pub fn set_fonts(&mut self, fonts: &FontSelection) {
        let small = fonts.small_glyphs();
        let big = fonts.big_glyphs();
        self.get_rw_slice(font::SMALL_FONT_ADDR, small.len())
            .copy_from_slice(small);
        self.get_rw_slice(font::BIG_FONT_ADDR, big.len())
            .copy_from_slice(big);
    }

    /// load a CHIP-8 program at 0x200; fails without touching memory if it
    /// wouldn't fit
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        self.write_any(reader, self.program_addr)
    }

    /// the whole address space, for snapshots
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new(&FontSelection::default());
        // NB. memory is zeroed from 0x200 because before that we bake in the
        //     fonts
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
    }

    #[test]
    fn test_fonts_baked_in() {
        let m = Chip8MemoryMap::new(&FontSelection::default());
        assert_eq!(m.get_ro_slice(0, 5), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(m.read_byte(0x50), 0x3C);
    }

    #[test]
    fn test_write_any_data_ok() -> Result<(), Chip8Error> {
        let mut dst = Chip8MemoryMap::new(&FontSelection::default());
        let mut src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        let len = dst.write_any(&mut src, 0x300)?;
        assert_eq!(len, 8);
        assert_eq!(dst.bytes[0x2fc..0x30c], [0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_read_word() {
        let mut m = Chip8MemoryMap::new(&FontSelection::default());
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x400).unwrap();
        assert_eq!(m.get_word(0x404), 0x0405);
    }

    #[test]
    fn test_word_wraps_at_top() {
        let mut m = Chip8MemoryMap::new(&FontSelection::default());
        m.write_byte(0xfff, 0x12);
        assert_eq!(m.get_word(0xfff), 0x12f0);
    }

    #[test]
    fn test_byte_address_masked() {
        let mut m = Chip8MemoryMap::new(&FontSelection::default());
        m.write_byte(0x1234, 0xaa);
        assert_eq!(m.read_byte(0x234), 0xaa);
    }

    #[test]
    fn test_write_too_much_fails() {
        let mut dst = Chip8MemoryMap::new(&FontSelection::default());
        let mut src: &[u8] = &[0; 8];
        assert!(matches!(
            dst.write_any(&mut src, 4089),
            Err(Chip8Error::RomTooLarge { size: 8, max: 7 })
        ));
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut dst = Chip8MemoryMap::new(&FontSelection::default());
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        dst.load_program(&mut prog)?;
        assert_eq!(dst.get_ro_slice(0x200, 2), &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_max_size() {
        let mut dst = Chip8MemoryMap::new(&FontSelection::default());
        let full = vec![0xaau8; MAX_PROGRAM_BYTES];
        assert_eq!(dst.load_program(&mut full.as_slice()).unwrap(), 0xe00);
        let over = vec![0xaau8; MAX_PROGRAM_BYTES + 1];
        assert!(dst.load_program(&mut over.as_slice()).is_err());
    }
}
