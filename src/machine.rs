/// # machine
///
/// the single mutable aggregate holding everything a running CHIP-8 program
/// can see: memory, registers, stack, timers, keypad, display and the quirk
/// configuration. the execution engine (`cpu.rs`) mutates it one instruction
/// at a time; the run loop and the debugger only go through the accessors
/// below.
use crate::config::{Config, Palette, Quirks};
use crate::error::Chip8Error;
use crate::font::FontSelection;
use crate::memory::{Chip8MemoryMap, MemoryMap, PROGRAM_ADDR};
use crate::opcode::Mode;
use crate::screen::Screen;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::io;

pub const REGISTER_COUNT: usize = 16;
pub const FLAG_REGISTER_COUNT: usize = 8;
pub const STACK_SIZE: usize = 16;
pub const KEY_COUNT: usize = 16;

/// where the run loop stands with this machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// parked on FX0A until a key goes down
    WaitingForKey,
    Halted,
}

#[derive(Clone)]
pub struct Chip8 {
    pub(crate) memory: Chip8MemoryMap,
    pub(crate) v: [u8; REGISTER_COUNT],
    pub(crate) r: [u8; FLAG_REGISTER_COUNT],
    pub(crate) i: u16,
    pub(crate) pc: u16,
    pub(crate) sp: usize,
    pub(crate) stack: [u16; STACK_SIZE],
    pub(crate) dt: u8,
    pub(crate) st: u8,
    pub(crate) keys: [bool; KEY_COUNT],
    /// register waiting to receive the next keypress
    pub(crate) key_wait: Option<usize>,
    pub(crate) screen: Screen,
    pub(crate) running: bool,
    /// display changed since the renderer last looked
    pub(crate) draw: bool,
    pub(crate) quirks: Quirks,
    pub(crate) mode: Mode,
    pub(crate) fonts: FontSelection,
    pub(crate) palette: Palette,
    pub(crate) breakpoints: BTreeSet<u16>,
    pub(crate) rng: StdRng,
}

impl Default for Chip8 {
    fn default() -> Self {
        Chip8::new()
    }
}

impl Chip8 {
    /// zeroed machine with the default fonts, ready for a program at 0x200
    pub fn new() -> Self {
        Chip8::with_rng(StdRng::from_entropy())
    }

    /// same as `new` but RND is reproducible
    pub fn with_seed(seed: u64) -> Self {
        Chip8::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let fonts = FontSelection::default();
        Chip8 {
            memory: Chip8MemoryMap::new(&fonts),
            v: [0; REGISTER_COUNT],
            r: [0; FLAG_REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_ADDR,
            sp: 0,
            stack: [0; STACK_SIZE],
            dt: 0,
            st: 0,
            keys: [false; KEY_COUNT],
            key_wait: None,
            screen: Screen::new(),
            running: true,
            draw: false,
            quirks: Quirks::default(),
            mode: Mode::default(),
            fonts,
            palette: Palette::default(),
            breakpoints: BTreeSet::new(),
            rng,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut c8 = Chip8::new().with_mode(config.mode).with_quirks(config.quirks);
        c8.set_fonts(config.fonts.clone());
        c8.palette = config.palette;
        c8
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// load a chip8 program at 0x200
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let len = self.memory.load_program(reader)?;
        info!("loaded {} byte program at {:03x}", len, PROGRAM_ADDR);
        Ok(len)
    }

    pub fn run_state(&self) -> RunState {
        if !self.running {
            RunState::Halted
        } else if self.key_wait.is_some() {
            RunState::WaitingForKey
        } else {
            RunState::Running
        }
    }

    pub fn halt(&mut self) {
        self.running = false;
    }

    /// record a key transition from the input source
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.keys[(key & 0xf) as usize] = pressed;
    }

    pub fn key(&self, key: u8) -> bool {
        self.keys[(key & 0xf) as usize]
    }

    /// lowest-numbered key currently held
    pub fn pressed_key(&self) -> Option<u8> {
        self.keys.iter().position(|k| *k).map(|k| k as u8)
    }

    /// hand a keypress to a parked FX0A: the key lands in its register and
    /// execution carries on from the next instruction. returns false if
    /// nothing was waiting
    pub fn deliver_key(&mut self, key: u8) -> bool {
        match self.key_wait.take() {
            Some(x) => {
                self.v[x] = key & 0xf;
                self.pc = self.pc.wrapping_add(2);
                debug!("V{:x} <- key {:x}", x, key & 0xf);
                true
            }
            None => false,
        }
    }

    /// one timer tick; both count down to zero and stop there
    pub fn tick_timers(&mut self) {
        self.dt = self.dt.saturating_sub(1);
        self.st = self.st.saturating_sub(1);
    }

    /// checks and clears the redraw flag
    pub fn take_draw(&mut self) -> bool {
        std::mem::take(&mut self.draw)
    }

    pub fn request_redraw(&mut self) {
        self.draw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.draw
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// the instruction word PC points at
    pub fn current_opcode(&self) -> u16 {
        self.memory.get_word(self.pc)
    }

    pub fn word_at(&self, addr: u16) -> u16 {
        self.memory.get_word(addr)
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn v(&self, x: usize) -> u8 {
        self.v[x & 0xf]
    }

    pub fn set_v(&mut self, x: usize, value: u8) {
        self.v[x & 0xf] = value;
    }

    pub fn r(&self, x: usize) -> u8 {
        self.r[x % FLAG_REGISTER_COUNT]
    }

    pub fn set_r(&mut self, x: usize, value: u8) {
        self.r[x % FLAG_REGISTER_COUNT] = value;
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, i: u16) {
        self.i = i;
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    /// clamped to the stack size
    pub fn set_sp(&mut self, sp: usize) {
        self.sp = sp.min(STACK_SIZE);
    }

    /// return addresses currently on the stack, oldest first
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }

    pub fn dt(&self) -> u8 {
        self.dt
    }

    pub fn set_dt(&mut self, dt: u8) {
        self.dt = dt;
    }

    pub fn st(&self) -> u8 {
        self.st
    }

    pub fn set_st(&mut self, st: u8) {
        self.st = st;
    }

    /// register named by a pending FX0A
    pub fn vk(&self) -> Option<usize> {
        self.key_wait
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.memory.read_byte(addr)
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory.write_byte(addr, value);
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn set_quirks(&mut self, quirks: Quirks) {
        self.quirks = quirks;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn fonts(&self) -> &FontSelection {
        &self.fonts
    }

    /// swap glyph sets; rewrites low memory
    pub fn set_fonts(&mut self, fonts: FontSelection) {
        self.memory.set_fonts(&fonts);
        self.fonts = fonts;
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        self.draw = true;
    }

    pub fn add_breakpoint(&mut self, addr: u16) {
        self.breakpoints.insert(addr);
    }

    pub fn remove_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.remove(&addr)
    }

    pub fn has_breakpoint(&self, addr: u16) -> bool {
        self.breakpoints.contains(&addr)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = u16> + '_ {
        self.breakpoints.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_machine() {
        let c8 = Chip8::new();
        assert_eq!(c8.pc(), 0x200);
        assert_eq!(c8.sp(), 0);
        assert_eq!(c8.run_state(), RunState::Running);
        assert!(!c8.needs_redraw());
        assert_eq!(c8.read_byte(0), 0xF0);
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut c8 = Chip8::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(c8.load_program(&mut prog)?, 2);
        assert_eq!(c8.current_opcode(), 0x00e0);
        Ok(())
    }

    #[test]
    fn test_from_config() -> Result<(), Chip8Error> {
        let config = Config {
            mode: Mode::Chip8,
            quirks: "sj".parse()?,
            fonts: FontSelection::parse("vip")?,
            ..Config::default()
        };
        let c8 = Chip8::from_config(&config);
        assert_eq!(c8.mode(), Mode::Chip8);
        assert!(c8.quirks().shift && c8.quirks().jump);
        assert_eq!(c8.read_byte(5), 0x60);
        Ok(())
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut c8 = Chip8::new();
        c8.set_dt(2);
        c8.set_st(1);
        c8.tick_timers();
        assert_eq!((c8.dt(), c8.st()), (1, 0));
        c8.tick_timers();
        c8.tick_timers();
        assert_eq!((c8.dt(), c8.st()), (0, 0));
    }

    #[test]
    fn test_keys() {
        let mut c8 = Chip8::new();
        assert_eq!(c8.pressed_key(), None);
        c8.set_key(0xb, true);
        c8.set_key(0x4, true);
        assert_eq!(c8.pressed_key(), Some(0x4));
        c8.set_key(0x4, false);
        assert!(c8.key(0xb));
        assert_eq!(c8.pressed_key(), Some(0xb));
    }

    #[test]
    fn test_deliver_key_only_when_waiting() {
        let mut c8 = Chip8::new();
        assert!(!c8.deliver_key(3));
        c8.key_wait = Some(5);
        assert_eq!(c8.run_state(), RunState::WaitingForKey);
        assert!(c8.deliver_key(3));
        assert_eq!(c8.v(5), 3);
        assert_eq!(c8.pc(), 0x202);
        assert_eq!(c8.run_state(), RunState::Running);
    }

    #[test]
    fn test_take_draw_clears() {
        let mut c8 = Chip8::new();
        c8.request_redraw();
        assert!(c8.take_draw());
        assert!(!c8.take_draw());
    }

    #[test]
    fn test_breakpoints() {
        let mut c8 = Chip8::new();
        c8.add_breakpoint(0x210);
        c8.add_breakpoint(0x204);
        assert!(c8.has_breakpoint(0x204));
        assert_eq!(c8.breakpoints().collect::<Vec<_>>(), vec![0x204, 0x210]);
        assert!(c8.remove_breakpoint(0x204));
        assert!(!c8.remove_breakpoint(0x204));
    }

    #[test]
    fn test_sp_clamped() {
        let mut c8 = Chip8::new();
        c8.set_sp(40);
        assert_eq!(c8.sp(), STACK_SIZE);
        assert_eq!(c8.stack().len(), STACK_SIZE);
    }
}
