use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::ArgAction::Set;
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use cpu::{Pull, SignalLine, Simulation, SimulationConfig};

mod ticker;

use ticker::attach_ticker;

/// Where the demo ticker's registers appear (segment 2).
const TICKER_BASE: u32 = 0x2_0000;

/// Accept decimal, or hex with a 0x prefix.
fn parse_number<T: TryFrom<u64>>(s: &str) -> Result<T, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    }
    .map_err(|e| format!("{s} is not a valid number: {e}"))?;
    T::try_from(value).map_err(|_| format!("{s} is out of range"))
}

/// Simulator for C16x-family microcontrollers
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Raw binary image to load into RAM.
    #[clap(action = Set)]
    image: PathBuf,

    /// Address at which the image is loaded.
    #[clap(long, default_value = "0", value_parser = parse_number::<u32>)]
    load_address: u32,

    /// Initial instruction pointer (in segment 0).
    #[clap(long, default_value = "0", value_parser = parse_number::<u16>)]
    entry: u16,

    /// CPU clock rate in Hz.
    #[clap(long, default_value = "20000000", value_parser = parse_number::<u64>)]
    clock_hz: u64,

    /// Stop after executing this many instructions.
    #[clap(long, default_value = "1000000", value_parser = parse_number::<u64>)]
    max_instructions: u64,

    /// Stop once the clock reaches this many cycles.
    #[clap(long, value_parser = parse_number::<u64>)]
    max_cycles: Option<u64>,

    /// Initial context pointer (where R0 lives).
    #[clap(long, default_value = "0xFC00", value_parser = parse_number::<u16>)]
    cp: u16,

    /// Initial stack pointer.
    #[clap(long, default_value = "0xFC00", value_parser = parse_number::<u16>)]
    sp: u16,

    /// Attach a ticker peripheral at 0x20000 which raises an
    /// interrupt this often (in microseconds of simulated time).
    #[clap(long, value_parser = parse_number::<u64>)]
    ticker_period_us: Option<u64>,

    /// Size of the RAM mapped at address 0.
    #[clap(long, default_value = "0x10000", value_parser = parse_number::<u32>)]
    ram_size: u32,
}

fn run_simulator() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // See
    // https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Box::new(e));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let span = span!(Level::ERROR, "simulate", image=?cli.image);
    let _enter = span.enter();

    let config = SimulationConfig {
        clock_hz: cli.clock_hz,
        ram_size: cli.ram_size,
        reset_ip: cli.entry,
        reset_cp: cli.cp,
        reset_sp: cli.sp,
        ..SimulationConfig::default()
    };
    let image = fs::read(&cli.image)
        .map_err(|e| format!("failed to read {}: {e}", cli.image.display()))?;

    let mut sim = Simulation::new(&config)?;
    sim.load_image(cli.load_address, &image)?;

    let irq = SignalLine::shared("irq", Pull::Up);
    sim.connect_interrupt(irq.clone());
    let ticker = match cli.ticker_period_us {
        Some(us) => {
            let period = sim.clock().cycles_from_microseconds(us);
            Some(attach_ticker(&mut sim, TICKER_BASE, period, irq)?)
        }
        None => None,
    };

    let summary = sim.run(cli.max_instructions, cli.max_cycles.unwrap_or(u64::MAX))?;
    if let Some(ticker) = ticker {
        event!(Level::INFO, "ticker ticked {} times", ticker.borrow().ticks());
    }
    event!(Level::INFO, "faults: {}", sim.faults());
    event!(
        Level::INFO,
        "{} instructions in {:?} of simulated time",
        summary.instructions,
        sim.clock().duration_from_cycles(summary.cycles)
    );

    let snapshot = sim.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn main() {
    match run_simulator() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

#[test]
fn test_parse_number() {
    assert_eq!(parse_number::<u32>("0x20000"), Ok(0x20000));
    assert_eq!(parse_number::<u16>("512"), Ok(512));
    assert!(parse_number::<u16>("0x10000").is_err());
    assert!(parse_number::<u64>("twelve").is_err());
}
