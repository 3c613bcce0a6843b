//! statsplus-rs - live CPU, memory, swap and network graphs
//!
//! Copyright (C) 2026 Trung Le
//! Released under the GNU GPLv2+
//!
//! Headless host: runs the panel's event loop, renders every requested
//! frame into recording canvases and prints readout changes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use log::{debug, info, warn, LevelFilter};

use statsplus::core::{MeterKind, Settings};
use statsplus::platform::default_provider;
use statsplus::ui::{LabelSink, RecordingArea, Repaint, StatsPanel};

/// Static flag for clean shutdown
static RUNNING: AtomicBool = AtomicBool::new(true);

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COPYRIGHT: &str = "(C) 2026 Trung Le.";
const LICENSE_SPDX: &str = env!("CARGO_PKG_LICENSE");

/// Height of the compact indicators, in pixels
const COMPACT_HEIGHT: usize = 22;

/// Convert SPDX license identifier to display string
fn license_display() -> &'static str {
    match LICENSE_SPDX {
        "GPL-2.0-or-later" => "GNU GPLv2+",
        "GPL-2.0" | "GPL-2.0-only" => "GNU GPLv2",
        "MIT" => "MIT License",
        _ => LICENSE_SPDX,
    }
}

fn print_version_full() {
    println!("statsplus-rs {}", VERSION);
    println!("{}", COPYRIGHT);
    println!("Released under the {}.", license_display());
}

fn print_version() {
    println!("statsplus-rs {}", VERSION);
}

fn print_help() {
    print_version_full();
    println!();
    println!("-c --config=PATH                Read settings from PATH");
    println!("-n --max-iterations=NUMBER      Exit after NUMBER frames");
    println!("   --width=PIXELS               Popup graph width (default 200)");
    println!("   --height=PIXELS              Popup graph height (default 80)");
    println!("   --popup=METER                Hover METER (cpu, memory, swap, network) at start");
    println!("   --no-color                   Ignore color overrides from the settings file");
    println!("-v --verbose                    More log output (repeatable); RUST_LOG overrides");
    println!("-h --help                       Print this help screen");
    println!("-V --version                    Print version info");
}

/// statsplus-rs - live system metrics graphs
#[derive(Parser, Debug)]
#[command(name = "statsplus-rs")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
struct Args {
    /// Read settings from PATH
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Exit after NUMBER frames
    #[arg(short = 'n', long = "max-iterations", value_name = "NUMBER")]
    max_iterations: Option<u64>,

    /// Popup graph width
    #[arg(long = "width", value_name = "PIXELS", default_value_t = 200)]
    width: usize,

    /// Popup graph height
    #[arg(long = "height", value_name = "PIXELS", default_value_t = 80)]
    height: usize,

    /// Hover a meter at start
    #[arg(long = "popup", value_name = "METER")]
    popup: Option<String>,

    /// Ignore color overrides
    #[arg(long = "no-color")]
    no_color: bool,

    /// More log output
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Print this help screen
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,

    /// Print version info
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

/// Prints every label change with a timestamp
struct StdoutLabels;

impl LabelSink for StdoutLabels {
    fn set_text(&mut self, label: &str, text: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S%.3f");
        println!("[{}] {:<16} {}", stamp, label, text);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[cfg(unix)]
fn setup_signal_handlers() {
    shutdown::install();
}

#[cfg(not(unix))]
fn setup_signal_handlers() {}

fn load_settings(args: &Args) -> Settings {
    let mut settings = Settings::new();
    if let Some(path) = &args.config {
        settings.filename = Some(path.clone());
    }
    if let Err(e) = settings.load() {
        warn!("Failed to load settings: {}", e);
    }
    if args.no_color {
        settings.colors.clear();
    }
    settings
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.help {
        print_help();
        return Ok(());
    }
    if args.version {
        print_version();
        return Ok(());
    }

    init_logging(args.verbose);

    let popup = match args.popup.as_deref() {
        Some(name) => match MeterKind::from_name(name) {
            Some(kind) => Some(kind),
            None => bail!("unknown meter '{}', expected cpu, memory, swap or network", name),
        },
        None => None,
    };

    setup_signal_handlers();

    let settings = load_settings(&args);
    let mut panel = StatsPanel::new(&settings, default_provider());

    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    let mut compact_areas: Vec<RecordingArea> = panel
        .meters()
        .iter()
        .map(|m| RecordingArea::new(m.layout().width.ceil() as usize, COMPACT_HEIGHT))
        .collect();
    let mut popup_area = RecordingArea::new(args.width, args.height);
    let mut labels = StdoutLabels;

    panel.enable(now_ms());

    if let Some(kind) = popup {
        match panel.find(kind) {
            Some(id) => {
                panel.on_hover(id, true, now_ms());
                if let Some(meter) = panel.meter(id) {
                    let (x, y) = meter.overlay_position(0.0, 0.0);
                    debug!("{}: max overlay at ({}, {})", meter.name(), x, y);
                }
            }
            None => warn!("{} is disabled in the settings", kind.name()),
        }
    }

    let mut frames = 0u64;
    while RUNNING.load(Ordering::SeqCst) {
        let Some(deadline) = panel.next_deadline() else {
            info!("no active timers, exiting");
            break;
        };

        let now = now_ms();
        if deadline > now {
            std::thread::sleep(Duration::from_millis(deadline - now));
        }
        panel.dispatch_due(now_ms());

        let repaints = panel.take_repaints();
        for repaint in &repaints {
            match *repaint {
                Repaint::Compact(id) => {
                    let Some(area) = compact_areas.get_mut(id) else {
                        continue;
                    };
                    if let Some(meter) = panel.meter(id) {
                        area.set_size(meter.layout().width.ceil() as usize, COMPACT_HEIGHT);
                    }
                    area.canvas_mut().clear();
                    panel.draw(id, area);
                }
                Repaint::Popup(id) => {
                    popup_area.canvas_mut().clear();
                    panel.draw_popup(id, &mut popup_area, &mut labels);
                    debug!(
                        "popup {}: {} primitives",
                        id,
                        popup_area.canvas().primitives().len()
                    );
                }
            }
        }
        panel.flush_labels(&mut labels);

        if !repaints.is_empty() {
            frames += 1;
            if args.max_iterations.is_some_and(|max| frames >= max) {
                break;
            }
        }
    }

    panel.destroy();

    Ok(())
}

/// SIGINT and SIGTERM clear `RUNNING`; the loop exits at the next wakeup
#[cfg(unix)]
mod shutdown {
    use std::sync::atomic::Ordering;

    use super::RUNNING;

    const SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

    // Only an atomic store: async-signal-safe
    extern "C" fn on_signal(_: libc::c_int) {
        RUNNING.store(false, Ordering::SeqCst);
    }

    pub fn install() {
        for signal in SIGNALS {
            // SAFETY: on_signal has the C handler signature and touches no
            // non-reentrant state
            unsafe {
                libc::signal(signal, on_signal as *const () as libc::sighandler_t);
            }
        }
    }
}
