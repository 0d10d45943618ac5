use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

/// physical keys on the left-hand side of a qwerty keyboard, laid out like
/// the COSMAC VIP hex keypad
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// q w e r  =>  4 5 6 D
/// a s d f      7 8 9 E
/// z x c v      A 0 B F
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// how long a key counts as held after the terminal last reported it;
/// the terminal's own autorepeat keeps a held key alive
pub const DEFAULT_KEY_HOLD: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    pub key: u8,
    pub pressed: bool,
}

/// everything that happened on the input device since the last poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputEvents {
    pub transitions: Vec<KeyTransition>,
    pub quit: bool,
    pub enter_debug: bool,
    pub exit_debug: bool,
}

impl InputEvents {
    pub fn press(key: u8) -> Self {
        InputEvents {
            transitions: vec![KeyTransition { key, pressed: true }],
            ..Default::default()
        }
    }

    pub fn release(key: u8) -> Self {
        InputEvents {
            transitions: vec![KeyTransition {
                key,
                pressed: false,
            }],
            ..Default::default()
        }
    }

    pub fn quit() -> Self {
        InputEvents {
            quit: true,
            ..Default::default()
        }
    }

    /// first key that went down in this batch
    pub fn first_press(&self) -> Option<u8> {
        self.transitions.iter().find(|t| t.pressed).map(|t| t.key)
    }
}

/// reads keypresses
pub trait Input {
    /// collect whatever has happened since the last call, without blocking
    fn poll(&mut self) -> io::Result<InputEvents>;
}

// terminal keys -> keypad transitions, with synthetic releases
struct KeyState {
    keymap: HashMap<char, u8>,
    held: [Option<Instant>; 16],
    hold: Duration,
}

impl KeyState {
    fn new(hold: Duration) -> Self {
        KeyState {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: [None; 16],
            hold,
        }
    }

    fn release_expired(&mut self, now: Instant, events: &mut InputEvents) {
        for (key, since) in self.held.iter_mut().enumerate() {
            if matches!(since, Some(t) if now.duration_since(*t) >= self.hold) {
                *since = None;
                events.transitions.push(KeyTransition {
                    key: key as u8,
                    pressed: false,
                });
            }
        }
    }

    fn translate(&mut self, evt: KeyEvent, now: Instant, events: &mut InputEvents) {
        match evt.code {
            KeyCode::Esc => events.quit = true,
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                events.quit = true
            }
            KeyCode::F(1) => events.enter_debug = true,
            KeyCode::F(2) => events.exit_debug = true,
            KeyCode::Char(c) => match self.keymap.get(&c.to_ascii_lowercase()) {
                Some(key) => {
                    let slot = &mut self.held[*key as usize];
                    if slot.is_none() {
                        events.transitions.push(KeyTransition {
                            key: *key,
                            pressed: true,
                        });
                    }
                    *slot = Some(now);
                }
                None => warn!("can't map {:?} to a COSMAC key", c),
            },
            other => debug!("ignoring key {:?}", other),
        }
    }
}

/// keyboard input from the controlling terminal, in raw mode
pub struct TermInput {
    keys: KeyState,
}

impl TermInput {
    pub fn new() -> io::Result<Self> {
        TermInput::with_hold(DEFAULT_KEY_HOLD)
    }

    pub fn with_hold(hold: Duration) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keys: KeyState::new(hold),
        })
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't restore terminal: {}", e);
        }
    }
}

impl Input for TermInput {
    fn poll(&mut self) -> io::Result<InputEvents> {
        let mut events = InputEvents::default();
        self.keys.release_expired(Instant::now(), &mut events);
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                self.keys.translate(evt, Instant::now(), &mut events);
            }
        }
        Ok(events)
    }
}

/// replays canned input one batch per poll, then goes quiet
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<InputEvents>,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = InputEvents>) -> Self {
        ScriptedInput {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Input for ScriptedInput {
    fn poll(&mut self) -> io::Result<InputEvents> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_keymap_is_complete() {
        let mut seen: Vec<u8> = CHIP8_CONVENTIONAL_KEYMAP.iter().map(|(_, k)| *k).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_press_then_timed_release() {
        let mut ks = KeyState::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let mut events = InputEvents::default();
        ks.translate(key('w'), t0, &mut events);
        assert_eq!(events.transitions, vec![KeyTransition { key: 5, pressed: true }]);

        // autorepeat doesn't re-press
        let mut events = InputEvents::default();
        ks.translate(key('W'), t0 + Duration::from_millis(50), &mut events);
        ks.release_expired(t0 + Duration::from_millis(120), &mut events);
        assert!(events.transitions.is_empty());

        ks.release_expired(t0 + Duration::from_millis(160), &mut events);
        assert_eq!(events.transitions, vec![KeyTransition { key: 5, pressed: false }]);
    }

    #[test]
    fn test_control_keys() {
        let mut ks = KeyState::new(DEFAULT_KEY_HOLD);
        let now = Instant::now();
        let mut events = InputEvents::default();
        ks.translate(KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE), now, &mut events);
        ks.translate(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE), now, &mut events);
        assert!(events.enter_debug && events.exit_debug && !events.quit);
        ks.translate(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now, &mut events);
        assert!(events.quit);
        // plain c is keypad B
        assert_eq!(events.first_press(), None);
        ks.translate(key('c'), now, &mut events);
        assert_eq!(events.first_press(), Some(0xb));
    }

    #[test]
    fn test_unmapped_key_ignored() {
        let mut ks = KeyState::new(DEFAULT_KEY_HOLD);
        let mut events = InputEvents::default();
        ks.translate(key('p'), Instant::now(), &mut events);
        assert_eq!(events, InputEvents::default());
    }

    #[test]
    fn test_scripted_input() -> io::Result<()> {
        let mut input = ScriptedInput::new([
            InputEvents::press(3),
            InputEvents::release(3),
            InputEvents::quit(),
        ]);
        assert_eq!(input.poll()?.first_press(), Some(3));
        assert_eq!(input.poll()?.first_press(), None);
        assert!(input.poll()?.quit);
        assert!(input.is_empty());
        assert_eq!(input.poll()?, InputEvents::default());
        Ok(())
    }
}
