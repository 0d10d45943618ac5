use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chip8::memory::MAX_PROGRAM_BYTES;
use chip8::opcode::{disassemble_rom, ListingOptions};
use chip8::Chip8Error;
use clap::Parser;

/// list a CHIP-8 ROM as assembly
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// replace jump, call and LD I targets with generated labels
    #[arg(short, long)]
    labels: bool,

    /// prefix each line with its address
    #[arg(short, long)]
    addresses: bool,

    /// write the listing here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// ROM to disassemble
    rom: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let rom = fs::read(&args.rom)?;
    if rom.len() > MAX_PROGRAM_BYTES {
        return Err(Chip8Error::RomTooLarge {
            size: rom.len(),
            max: MAX_PROGRAM_BYTES,
        }
        .into());
    }
    let listing = disassemble_rom(
        &rom,
        ListingOptions {
            addresses: args.addresses,
            labels: args.labels,
        },
    );
    match args.output {
        Some(path) => fs::write(path, listing)?,
        None => print!("{}", listing),
    }
    Ok(())
}
