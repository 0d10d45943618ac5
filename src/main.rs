use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chip8::config::{Config, Palette, Quirks, DEFAULT_CLOCKSPEED};
use chip8::debug::{DebugAction, Debugger, Repl};
use chip8::display::MonoTermDisplay;
use chip8::font::FontSelection;
use chip8::input::TermInput;
use chip8::interpreter::Chip8Interpreter;
use chip8::sound::SimpleBeep;
use chip8::{Chip8, Mode};
use clap::Parser;
use crossterm::terminal;
use log::{warn, LevelFilter};

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 / SUPER-CHIP interpreter for the terminal", long_about = None)]
struct Args {
    /// instructions (and timer ticks) per second
    #[arg(short, long, default_value_t = DEFAULT_CLOCKSPEED)]
    clockspeed: u32,

    /// start in the debugger
    #[arg(short, long)]
    debug: bool,

    /// log every instruction as it executes
    #[arg(short, long)]
    verbose: bool,

    /// small and big font names, as `small,big`
    #[arg(short, long)]
    fonts: Option<String>,

    /// palette file: background then foreground, one hex colour per line
    #[arg(short = 'p', long)]
    palette_file: Option<PathBuf>,

    /// palette as `background,foreground`
    #[arg(short = 'P', long)]
    palette: Option<String>,

    /// quirk letters: b (logic ops reset VF), d (clip sprites),
    /// j (BNNN uses VX), l (FX55/FX65 move I), s (shifts use VX)
    #[arg(short, long, default_value = "")]
    quirks: String,

    /// chip8, schip or xochip
    #[arg(short, long, default_value = "schip")]
    mode: String,

    /// ROM to run
    rom: PathBuf,
}

impl Args {
    fn to_config(&self) -> Result<Config, Box<dyn Error>> {
        let palette = match (&self.palette, &self.palette_file) {
            (Some(p), _) => p.parse()?,
            (None, Some(path)) => Palette::from_file(path)?,
            (None, None) => Palette::default(),
        };
        let fonts = match &self.fonts {
            Some(f) => FontSelection::parse(f)?,
            None => FontSelection::default(),
        };
        Ok(Config {
            clockspeed: self.clockspeed,
            debug: self.debug,
            verbose: self.verbose,
            mode: self.mode.parse::<Mode>()?,
            quirks: self.quirks.parse::<Quirks>()?,
            palette,
            fonts,
        })
    }
}

/// the line debugger needs a normal terminal while it has control
struct CookedRepl<R: BufRead, W: Write> {
    repl: Repl<R, W>,
}

impl<R: BufRead, W: Write> Debugger for CookedRepl<R, W> {
    fn pause(&mut self, vm: &mut Chip8) -> DebugAction {
        let cooked = terminal::disable_raw_mode()
            .and_then(|_| crossterm::execute!(io::stdout(), terminal::LeaveAlternateScreen));
        if let Err(e) = cooked {
            warn!("couldn't leave raw mode: {}", e);
        }
        let action = self.repl.pause(vm);
        if let Err(e) = terminal::enable_raw_mode() {
            warn!("couldn't re-enter raw mode: {}", e);
        }
        action
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    // logs go to stderr, out of the way of the display
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        logger.filter_level(LevelFilter::Info);
    }
    logger.init();

    let config = args.to_config()?;
    let mut vm = Chip8::from_config(&config);
    let mut f = File::open(&args.rom)?;
    vm.load_program(&mut f)?;

    // initialise
    let mut display = MonoTermDisplay::new()?;
    let mut input = TermInput::new()?;
    let mut sound = SimpleBeep::new();
    let stdin = io::stdin();
    let mut debugger = CookedRepl {
        repl: Repl::new(stdin.lock(), io::stdout()),
    };
    let mut interpreter = Chip8Interpreter::new(vm, &mut display, &mut input, &mut sound)
        .with_debugger(&mut debugger)
        .configure(&config);

    interpreter.run()?;
    Ok(())
}
