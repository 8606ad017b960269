use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod controller;
mod encoder;
mod error;
mod frame;
mod input;
mod pixel_buffer;
mod pixel_format;
mod session;
mod transport;

use config::Config;
use controller::{Action, Controller};
use pixel_format::Color;
use session::DeviceSession;
use transport::{Bus, DryRunBus, SpiBus};

#[derive(Parser)]
#[command(name = "spi_strip")]
#[command(about = "Drive a WS2812B LED strip from a Linux SPI port", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// spidev node, overrides the config file
    #[arg(long, global = true)]
    device: Option<String>,

    /// Number of LEDs, overrides the config file
    #[arg(long, global = true)]
    led_count: Option<usize>,

    /// SPI clock in Hz, overrides the config file
    #[arg(long, global = true)]
    clock_hz: Option<u32>,

    /// Encode frames but do not open the SPI device
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug output (frame statistics)
    #[arg(long, global = true)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long, global = true)]
    ddebug: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy)]
enum Mode {
    /// Move a single lit LED around and change its color from the keyboard
    Interactive,
    /// Light each LED in turn, pressing Enter to advance
    Walk,
    /// Light the whole strip with one color until interrupted
    Fill {
        /// Color as RRGGBB hex
        #[arg(long, default_value = "ffffff")]
        color: Color,
    },
    /// Turn the strip off and exit
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.ddebug {
        "trace"
    } else if cli.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = load_config(&cli)?;
    config.validate()?;
    let mode = cli.command.unwrap_or(Mode::Interactive);

    // Signals only flip this flag; the session is blanked by whoever owns it
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::Relaxed);
    }) {
        warn!("Could not set signal handler: {}", e);
    }

    if cli.dry_run {
        info!("Dry run: frames for {} are not sent", config.device);
        let session = DeviceSession::with_bus(DryRunBus::new(), config.layout())?;
        run(session, mode, &running)
    } else {
        let session = DeviceSession::open(&config)
            .with_context(|| format!("Failed to start strip on {}", config.device))?;
        run::<SpiBus>(session, mode, &running)
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    if let Some(led_count) = cli.led_count {
        config.led_count = led_count;
    }
    if let Some(clock_hz) = cli.clock_hz {
        config.clock_hz = clock_hz;
    }
    Ok(config)
}

/// Run one mode, then blank the strip however the mode ended.
fn run<B: Bus>(mut session: DeviceSession<B>, mode: Mode, running: &Arc<AtomicBool>) -> Result<()> {
    let result = match mode {
        Mode::Interactive => interactive(&mut session, running),
        Mode::Walk => walk(&mut session, running),
        Mode::Fill { color } => fill(&mut session, color, running),
        Mode::Clear => Ok(()),
    };
    session.close();
    result
}

fn interactive<B: Bus>(session: &mut DeviceSession<B>, running: &Arc<AtomicBool>) -> Result<()> {
    let mut controller = Controller::new(session.led_count());

    println!("SPI WS2812B Controller");
    println!("{}", controller::HELP);

    let _raw = input::RawModeGuard::enable()?;
    let keys = input::spawn_key_reader(Arc::clone(running));

    send_selection(&mut controller, session)?;
    while let Some(key) = input::wait_for(&keys, running) {
        match controller.handle_key(key) {
            Action::Quit => break,
            Action::Ignored => {}
            Action::Update => send_selection(&mut controller, session)?,
        }
    }

    running.store(false, Ordering::Relaxed);
    input::prompt("\r\n");
    info!(
        "Left LED {} at {}",
        controller.index() + 1,
        controller.color()
    );
    Ok(())
}

fn send_selection<B: Bus>(controller: &mut Controller, session: &mut DeviceSession<B>) -> Result<()> {
    for command in controller.frame_commands() {
        if let Err(e) = session.apply(command) {
            if !e.is_transmission() {
                return Err(e.into());
            }
            // Next key press sends a fresh frame
            warn!("{}", e);
        }
    }
    input::prompt(&format!("\r\x1b[K{}", controller.status_line()));
    Ok(())
}

fn walk<B: Bus>(session: &mut DeviceSession<B>, running: &AtomicBool) -> Result<()> {
    println!("Controls: Press ENTER for next LED. Ctrl+C to exit.");
    let lines = input::spawn_line_reader();

    for index in 0..session.led_count() {
        let previous = session.pixel(index).unwrap_or(Color::BLACK);
        session.set_pixel(index, Color::WHITE)?;
        session.show()?;

        input::prompt(&format!("LED {} is ON. Press ENTER...", index + 1));
        if input::wait_for(&lines, running).is_none() {
            println!();
            return Ok(());
        }

        session.set_pixel(index, previous)?;
        session.show()?;
    }

    println!("Done!");
    Ok(())
}

fn fill<B: Bus>(session: &mut DeviceSession<B>, color: Color, running: &AtomicBool) -> Result<()> {
    session.fill(color)?;
    session.show()?;
    info!("Strip set to {}; Ctrl+C to turn off", color);
    input::wait_for_shutdown(running);
    Ok(())
}
