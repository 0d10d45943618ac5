/// # interpreter
///
/// owns a `Chip8` and drives it against the outside world. each tick:
///
///  1. poll input; apply key transitions; honour quit and debug on/off
///  2. if parked on FX0A, deliver a fresh keypress, which resumes the machine
///  3. if debugging and (single-stepping or sitting on a breakpoint), hand
///     the machine to the debugger until it says continue, step or quit
///  4. if running, execute one instruction, then tick the timers and switch
///     the beeper to match ST
///  5. repaint if anything drew
///
/// `run` calls `tick` at the clock speed until the machine halts. timers tick
/// once per executed instruction, so the clock speed is also the timer rate.
use crate::config::Config;
use crate::debug::{DebugAction, Debugger};
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::Input;
use crate::machine::{Chip8, RunState};
use crate::opcode::disassemble;
use crate::sound::Sound;
use log::{debug, error, info, warn};
use spin_sleep::LoopHelper;

pub struct Chip8Interpreter<'a> {
    vm: Chip8,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    debugger: Option<&'a mut dyn Debugger>,
    /// instructions per second
    clockspeed: u32,
    /// breakpoints are live
    debug: bool,
    /// pause before every instruction
    stepping: bool,
    verbose: bool,
    beeping: bool,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        vm: Chip8,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            vm,
            display,
            input,
            sound,
            debugger: None,
            clockspeed: crate::config::DEFAULT_CLOCKSPEED,
            debug: false,
            stepping: false,
            verbose: false,
            beeping: false,
        }
    }

    pub fn with_debugger(mut self, debugger: &'a mut dyn Debugger) -> Self {
        self.debugger = Some(debugger);
        self
    }

    /// take clock speed, trace and debug-on-start from the config; the
    /// machine itself is configured by `Chip8::from_config`
    pub fn configure(mut self, config: &Config) -> Self {
        self.clockspeed = config.clockspeed.max(1);
        self.verbose = config.verbose;
        if config.debug {
            self.debug = true;
            self.stepping = true;
        }
        self
    }

    pub fn vm(&self) -> &Chip8 {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Chip8 {
        &mut self.vm
    }

    pub fn into_vm(self) -> Chip8 {
        self.vm
    }

    /// one pass of the main loop
    pub fn tick(&mut self) -> Result<RunState, Chip8Error> {
        let events = self.input.poll()?;
        for t in events.transitions.iter() {
            self.vm.set_key(t.key, t.pressed);
        }
        if events.quit {
            info!("quit requested");
            self.halt();
            return Ok(RunState::Halted);
        }
        if events.enter_debug {
            if self.debugger.is_some() {
                debug!("entering debug mode");
                self.debug = true;
                self.stepping = true;
            } else {
                warn!("no debugger attached");
            }
        }
        if events.exit_debug {
            debug!("leaving debug mode");
            self.debug = false;
            self.stepping = false;
        }

        if self.vm.run_state() == RunState::WaitingForKey {
            if let Some(key) = events.first_press() {
                self.vm.deliver_key(key);
            }
        }

        if self.should_pause() {
            if let Some(debugger) = self.debugger.as_deref_mut() {
                debug!("paused at {:03x}", self.vm.pc());
                match debugger.pause(&mut self.vm) {
                    DebugAction::Quit => {
                        info!("quit from debugger");
                        self.halt();
                        return Ok(RunState::Halted);
                    }
                    DebugAction::Step => self.stepping = true,
                    DebugAction::Continue => self.stepping = false,
                }
                self.display.invalidate()?;
                self.vm.request_redraw();
            }
        }

        match self.vm.run_state() {
            RunState::Halted => return Ok(RunState::Halted),
            RunState::WaitingForKey => {}
            RunState::Running => {
                if self.verbose {
                    info!("{:03x}: {}", self.vm.pc(), disassemble(self.vm.current_opcode()));
                }
                if let Err(e) = self.vm.step() {
                    error!("{}", e);
                    self.halt();
                    return Err(e.into());
                }
                self.vm.tick_timers();
                self.update_sound();
            }
        }

        if self.vm.take_draw() {
            self.display.draw(self.vm.screen(), &self.vm.palette())?;
        }
        Ok(self.vm.run_state())
    }

    /// tick at the clock speed until the program halts or the user quits
    pub fn run(&mut self) -> Result<(), Chip8Error> {
        info!(
            "running at {} Hz, mode {}, quirks '{}'",
            self.clockspeed,
            self.vm.mode(),
            self.vm.quirks()
        );
        let mut loop_helper = LoopHelper::builder().build_with_target_rate(self.clockspeed as f64);
        loop {
            loop_helper.loop_start();
            if self.tick()? == RunState::Halted {
                break;
            }
            loop_helper.loop_sleep();
        }
        info!("halted at {:03x}", self.vm.pc());
        Ok(())
    }

    fn should_pause(&self) -> bool {
        self.debug
            && self.vm.run_state() == RunState::Running
            && (self.stepping || self.vm.has_breakpoint(self.vm.pc()))
    }

    fn halt(&mut self) {
        self.vm.halt();
        self.set_beeper(false);
    }

    fn update_sound(&mut self) {
        self.set_beeper(self.vm.st() > 0);
    }

    // beeper trouble never stops the program
    fn set_beeper(&mut self, on: bool) {
        if on == self.beeping {
            return;
        }
        self.beeping = on;
        let result = if on { self.sound.beep() } else { self.sound.stop() };
        if let Err(e) = result {
            warn!("beeper failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::error::ExecError;
    use crate::input::{InputEvents, ScriptedInput};
    use crate::sound::Mute;
    use std::collections::VecDeque;
    use std::error::Error;

    fn vm_with(program: &[u16]) -> Chip8 {
        let bytes: Vec<u8> = program.iter().flat_map(|w| w.to_be_bytes()).collect();
        let mut c8 = Chip8::with_seed(8);
        c8.load_program(&mut bytes.as_slice()).unwrap();
        c8
    }

    #[derive(Default)]
    struct RecordingSound {
        calls: Vec<&'static str>,
    }

    impl Sound for RecordingSound {
        fn beep(&mut self) -> Result<(), Box<dyn Error>> {
            self.calls.push("beep");
            Ok(())
        }

        fn stop(&mut self) -> Result<(), Box<dyn Error>> {
            self.calls.push("stop");
            Ok(())
        }
    }

    struct ScriptedDebugger {
        actions: VecDeque<DebugAction>,
        pauses: Vec<u16>,
    }

    impl ScriptedDebugger {
        fn new(actions: &[DebugAction]) -> Self {
            ScriptedDebugger {
                actions: actions.iter().copied().collect(),
                pauses: Vec::new(),
            }
        }
    }

    impl Debugger for ScriptedDebugger {
        fn pause(&mut self, vm: &mut Chip8) -> DebugAction {
            self.pauses.push(vm.pc());
            self.actions.pop_front().unwrap_or(DebugAction::Continue)
        }
    }

    #[test]
    fn test_draws_on_change_only() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = Mute::new();
        // V0 = 5; I = glyph 5; draw it at (5, 0); spin
        let vm = vm_with(&[0x6005, 0xf029, 0xd015, 0x1206]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound);
        for _ in 0..6 {
            assert_eq!(interpreter.tick()?, RunState::Running);
        }
        assert_eq!(interpreter.vm().pc(), 0x206);
        drop(interpreter);
        assert_eq!(display.frames, 1);
        let frame = display.last.unwrap();
        assert!(frame.pixel(5, 0) && frame.pixel(8, 0));
        Ok(())
    }

    #[test]
    fn test_quit_event_halts() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new([InputEvents::default(), InputEvents::quit()]);
        let mut sound = Mute::new();
        let vm = vm_with(&[0x1200]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound);
        assert_eq!(interpreter.tick()?, RunState::Running);
        assert_eq!(interpreter.tick()?, RunState::Halted);
        interpreter.run()?;
        Ok(())
    }

    #[test]
    fn test_exit_instruction_ends_run() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = Mute::new();
        let config = Config {
            clockspeed: 100_000,
            ..Config::default()
        };
        let vm = vm_with(&[0x6001, 0x00fd]);
        let mut interpreter =
            Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound).configure(&config);
        interpreter.run()?;
        assert_eq!(interpreter.vm().v(0), 1);
        assert_eq!(interpreter.vm().run_state(), RunState::Halted);
        Ok(())
    }

    #[test]
    fn test_fatal_error_stops_run() {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = Mute::new();
        let vm = vm_with(&[0x00ee]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound);
        let result = interpreter.run();
        assert!(matches!(
            result,
            Err(Chip8Error::Exec(ExecError::StackUnderflow { pc: 0x200 }))
        ));
        assert_eq!(interpreter.vm().run_state(), RunState::Halted);
    }

    #[test]
    fn test_key_wait_resumes_on_press() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new([
            InputEvents::default(),
            InputEvents::default(),
            InputEvents::press(7),
        ]);
        let mut sound = Mute::new();
        let vm = vm_with(&[0xf30a, 0x1202]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound);
        assert_eq!(interpreter.tick()?, RunState::WaitingForKey);
        interpreter.vm_mut().set_dt(5);
        assert_eq!(interpreter.tick()?, RunState::WaitingForKey);
        // timers hold still while waiting
        assert_eq!(interpreter.vm().dt(), 5);
        assert_eq!(interpreter.tick()?, RunState::Running);
        assert_eq!(interpreter.vm().v(3), 7);
        assert_eq!(interpreter.vm().pc(), 0x202);
        Ok(())
    }

    #[test]
    fn test_key_press_tick_also_executes_next_instruction() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new([InputEvents::default(), InputEvents::press(7)]);
        let mut sound = Mute::new();
        let vm = vm_with(&[0xf30a, 0x6142, 0x1204]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound);
        assert_eq!(interpreter.tick()?, RunState::WaitingForKey);
        interpreter.vm_mut().set_dt(3);
        assert_eq!(interpreter.tick()?, RunState::Running);
        assert_eq!(interpreter.vm().v(3), 7);
        assert_eq!(interpreter.vm().v(1), 0x42);
        assert_eq!(interpreter.vm().pc(), 0x204);
        assert_eq!(interpreter.vm().dt(), 2);
        Ok(())
    }

    #[test]
    fn test_beeper_follows_sound_timer() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = RecordingSound::default();
        let vm = vm_with(&[0x6103, 0xf118, 0x1204]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound);
        interpreter.tick()?;
        interpreter.tick()?;
        assert_eq!(interpreter.vm().st(), 2);
        interpreter.tick()?;
        interpreter.tick()?;
        assert_eq!(interpreter.vm().st(), 0);
        interpreter.tick()?;
        drop(interpreter);
        assert_eq!(sound.calls, vec!["beep", "stop"]);
        Ok(())
    }

    #[test]
    fn test_debug_on_start_steps_then_continues() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = Mute::new();
        let mut debugger = ScriptedDebugger::new(&[DebugAction::Step, DebugAction::Continue]);
        let config = Config {
            debug: true,
            ..Config::default()
        };
        let vm = vm_with(&[0x6001, 0x6102, 0x6203, 0x1206]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound)
            .with_debugger(&mut debugger)
            .configure(&config);
        for _ in 0..4 {
            interpreter.tick()?;
        }
        assert_eq!(interpreter.vm().v(2), 3);
        drop(interpreter);
        assert_eq!(debugger.pauses, vec![0x200, 0x202]);
        Ok(())
    }

    #[test]
    fn test_breakpoint_then_quit() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new([InputEvents {
            enter_debug: true,
            ..Default::default()
        }]);
        let mut sound = Mute::new();
        let mut debugger = ScriptedDebugger::new(&[DebugAction::Continue, DebugAction::Quit]);
        let mut vm = vm_with(&[0x6001, 0x6102, 0x6203, 0x1206]);
        vm.add_breakpoint(0x204);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound)
            .with_debugger(&mut debugger);
        interpreter.run()?;
        let vm = interpreter.into_vm();
        assert_eq!(vm.pc(), 0x204);
        assert_eq!(vm.v(2), 0);
        assert_eq!(debugger.pauses, vec![0x200, 0x204]);
        Ok(())
    }

    #[test]
    fn test_breakpoints_ignored_outside_debug_mode() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = Mute::new();
        let mut debugger = ScriptedDebugger::new(&[]);
        let mut vm = vm_with(&[0x6001, 0x00fd]);
        vm.add_breakpoint(0x202);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound)
            .with_debugger(&mut debugger);
        interpreter.run()?;
        drop(interpreter);
        assert!(debugger.pauses.is_empty());
        Ok(())
    }

    #[test]
    fn test_debugger_redraws_after_pause() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::default();
        let mut sound = Mute::new();
        let mut debugger = ScriptedDebugger::new(&[DebugAction::Step]);
        let config = Config {
            debug: true,
            ..Config::default()
        };
        let vm = vm_with(&[0x6001]);
        let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound)
            .with_debugger(&mut debugger)
            .configure(&config);
        interpreter.tick()?;
        drop(interpreter);
        assert_eq!(display.frames, 1);
        Ok(())
    }
}
