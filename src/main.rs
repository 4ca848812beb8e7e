//! tiltwrite - Head-Tilt Dwell Controller
//!
//! Compose sentences and read live captions by holding your head tilted.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tiltwrite::app::runtime::BackgroundTasks;
use tiltwrite::bridge::{SpeechQueue, Transcript};
use tiltwrite::input::SensorSource;
use tiltwrite::config::{DataPaths, ThemeName};
use tiltwrite::render::{LogScene, SceneRenderer, SceneTheme, TerminalScene};
use tiltwrite::{Application, Collaborators, Config, Mode, PredictiveEngine, TiltSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr; RUST_LOG selects the level
    env_logger::init();

    let matches = Command::new("tiltwrite")
        .version(tiltwrite::VERSION)
        .about("Head-tilt dwell controller for writing and reading captions")
        .long_about(
            "tiltwrite turns a head-tilt (roll, pitch) stream into text. Dwell at the \
             centre to commit, tilt sideways to move through the alphabet, hold a \
             diagonal for editing actions. Without --sensor the keyboard simulates \
             tilts: h/j/k/l or arrows, y/u/b/n for diagonals, space for centre, r to \
             restart, q to quit. SIGHUP also restarts and reopens the sensor device.",
        )
        .arg(
            Arg::new("sensor")
                .long("sensor")
                .value_name("PATH|-")
                .help("Read `roll,pitch` lines from a device, FIFO, or stdin (-)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding 1grams_english.csv .. 5grams_english.csv"),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .action(ArgAction::SetTrue)
                .help("Log state changes instead of drawing a terminal scene"),
        )
        .arg(
            Arg::new("theme")
                .long("theme")
                .value_name("NAME")
                .value_parser(ThemeName::NAMES)
                .help("Terminal color scheme"),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .action(ArgAction::SetTrue)
                .help("Start in WRITE mode instead of CAPTION mode"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        let dir = PathBuf::from(dir);
        if !dir.is_dir() {
            anyhow::bail!("Data directory does not exist: {}", dir.display());
        }
        config.data = DataPaths::in_dir(dir);
    }
    if matches.get_flag("write") {
        config.initial_mode = Mode::Write;
    }
    if let Some(name) = matches.get_one::<String>("theme") {
        config.theme = ThemeName::parse(name)
            .with_context(|| format!("unknown theme {name:?}"))?;
    }
    config.validate()?;

    let sensor = matches.get_one::<String>("sensor").map(|arg| SensorSource::from_arg(arg));
    let mut headless = matches.get_flag("headless");
    if !headless && !std::io::stdout().is_terminal() {
        if sensor.is_none() {
            anyhow::bail!("No terminal to draw on and no --sensor to read from");
        }
        log::warn!("stdout is not a terminal, running headless");
        headless = true;
    }
    if headless && sensor.is_none() {
        anyhow::bail!("--headless needs --sensor: there is no keyboard to simulate tilts");
    }

    // Table construction is slow and stays off the tick path
    let data = config.data.clone();
    let engine = tokio::task::spawn_blocking(move || PredictiveEngine::load(&data))
        .await
        .context("loading n-gram tables")?;

    let mut tasks = BackgroundTasks::new();
    let transcript = Transcript::new();
    if let Some(command) = &config.captions.command {
        if let Err(err) = tasks.start_captions(command, transcript.clone()) {
            log::warn!("Captions unavailable: {}", err);
        }
    }

    let source = match &sensor {
        Some(source) => TiltSource::Sensor(tasks.start_sensor(source)?),
        None => TiltSource::Keyboard,
    };

    let speech = Arc::new(SpeechQueue::spawn(config.speech.clone()));
    let collaborators = Collaborators {
        engine: Arc::new(engine),
        transcript,
        speech,
    };

    let renderer: Box<dyn SceneRenderer> = if headless {
        Box::new(LogScene::new())
    } else {
        Box::new(TerminalScene::with_theme(SceneTheme::named(config.theme))?)
    };

    let mut app =
        Application::new(config, collaborators, source, renderer).with_keyboard(!headless);
    // A device node can be reopened after a reconnect; stdin cannot
    if let Some(device @ SensorSource::Device(_)) = sensor {
        app = app.with_sensor_source(device);
    }
    app.run(tasks).await?;

    Ok(())
}
