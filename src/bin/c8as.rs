use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chip8::asm::assemble;
use clap::Parser;
use log::{info, LevelFilter};

/// assemble CHIP-8 source into a ROM
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// log every instruction as it is encoded
    #[arg(short, long)]
    verbose: bool,

    /// where to write the ROM
    #[arg(short, long, default_value = "a.c8")]
    output: PathBuf,

    /// assembly source
    file: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        logger.filter_level(LevelFilter::Info);
    }
    logger.init();

    let source = fs::read_to_string(&args.file)?;
    let rom = assemble(&source)?;
    fs::write(&args.output, &rom)?;
    info!("wrote {} bytes to {}", rom.len(), args.output.display());
    Ok(())
}
