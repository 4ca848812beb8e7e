//! Application orchestration layer
//!
//! Runs the fixed-rate tick loop: each tick takes the newest tilt sample,
//! advances the controller and hands a snapshot to the renderer. Producers
//! (keyboard, sensor, recognizer) live on their own threads, see [`runtime`].

pub mod runtime;

use crate::bridge::{SpeechSink, Transcript};
use crate::config::Config;
use crate::controller::SelectionStateMachine;
use crate::error::Result;
use crate::input::{InputAction, LatestSample, SensorSource, TiltSample};
use crate::predict::PredictiveEngine;
use crate::render::SceneRenderer;
use runtime::BackgroundTasks;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;

/// How often the keyboard thread polls the terminal.
const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Where the tilt signal comes from.
pub enum TiltSource {
    /// Real sensor: update only on ticks that brought a new sample
    Sensor(LatestSample),
    /// Keyboard simulator: the latched tilt is re-fed every tick
    Keyboard,
}

/// Long-lived collaborators shared by every controller instance.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<PredictiveEngine>,
    pub transcript: Transcript,
    pub speech: Arc<dyn SpeechSink>,
}

impl Collaborators {
    fn build_controller(&self, config: &Config) -> SelectionStateMachine {
        SelectionStateMachine::new(
            config,
            Arc::clone(&self.engine),
            self.transcript.clone(),
            Arc::clone(&self.speech),
        )
    }
}

/// Application orchestrator - owns the controller and drives it from one loop
pub struct Application {
    config: Config,
    collaborators: Collaborators,
    machine: SelectionStateMachine,
    renderer: Box<dyn SceneRenderer>,
    source: TiltSource,
    latched: TiltSample,
    keyboard: bool,
    sensor_closed_logged: bool,
    /// Reopened on restart when set
    sensor_source: Option<SensorSource>,
    reopen_pending: bool,
}

impl Application {
    pub fn new(
        config: Config,
        collaborators: Collaborators,
        source: TiltSource,
        renderer: Box<dyn SceneRenderer>,
    ) -> Self {
        let machine = collaborators.build_controller(&config);
        let keyboard = matches!(source, TiltSource::Keyboard);
        Self {
            config,
            collaborators,
            machine,
            renderer,
            source,
            latched: TiltSample::CENTER,
            keyboard,
            sensor_closed_logged: false,
            sensor_source: None,
            reopen_pending: false,
        }
    }

    /// Reopen `source` whenever the controller restarts
    pub fn with_sensor_source(mut self, source: SensorSource) -> Self {
        self.sensor_source = Some(source);
        self
    }

    /// Also read control keys (and simulated tilts) from the terminal
    pub fn with_keyboard(mut self, enabled: bool) -> Self {
        self.keyboard = enabled || matches!(self.source, TiltSource::Keyboard);
        self
    }

    pub fn controller(&self) -> &SelectionStateMachine {
        &self.machine
    }

    /// Run until quit, Ctrl-C, or the sensor stream ends with no keyboard.
    ///
    /// SIGHUP requests a restart, the only way to get one without a keyboard.
    pub async fn run(&mut self, mut tasks: BackgroundTasks) -> Result<()> {
        self.renderer.initialize()?;

        let mut actions = if self.keyboard {
            Some(tasks.start_keyboard(KEYBOARD_POLL_INTERVAL))
        } else {
            None
        };

        let mut hangup = hangup_listener();
        let mut ticker = tokio::time::interval(self.config.timing.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!(
            "Tick loop running every {:?} in {} mode",
            self.config.timing.tick_interval(),
            self.machine.mode()
        );

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick(Instant::now()) {
                        Ok(true) => {}
                        Ok(false) => break Ok(()),
                        Err(err) => break Err(err),
                    }
                    if self.reopen_pending {
                        self.reopen_sensor(&mut tasks);
                    }
                }
                _ = next_hangup(&mut hangup) => {
                    log::info!("Hangup received, restart requested");
                    self.machine.request_restart();
                }
                Some(action) = next_action(&mut actions) => {
                    if !self.handle_action(action) {
                        break Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Interrupted");
                    break Ok(());
                }
            }
        };

        let cleanup = self.renderer.cleanup();
        tasks.stop();
        result.and(cleanup)
    }

    /// One iteration of the loop. Returns false when there is nothing left to
    /// drive the controller.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        let sample = match &mut self.source {
            TiltSource::Keyboard => Some(self.latched),
            TiltSource::Sensor(latest) => {
                let sample = latest.take();
                if sample.is_none() && latest.is_closed() {
                    if !self.keyboard {
                        log::info!("Sensor stream closed, stopping");
                        return Ok(false);
                    }
                    if !self.sensor_closed_logged {
                        log::warn!("Sensor stream closed; press q to quit");
                        self.sensor_closed_logged = true;
                    }
                }
                sample
            }
        };

        if let Some(sample) = sample {
            self.machine.update(sample.roll, sample.pitch, now);
        }

        if self.machine.take_restart_request() {
            log::info!("Restarting controller");
            self.machine = self.collaborators.build_controller(&self.config);
            self.reopen_pending = self.sensor_source.is_some();
        }

        self.renderer.render(&self.machine.snapshot())?;
        Ok(true)
    }

    /// Swap the sensor reader for a freshly opened one. A failed reopen keeps
    /// the old stream.
    fn reopen_sensor(&mut self, tasks: &mut BackgroundTasks) {
        self.reopen_pending = false;
        let Some(source) = self.sensor_source.clone() else {
            return;
        };
        match tasks.restart_sensor(&source) {
            Ok(latest) => {
                self.source = TiltSource::Sensor(latest);
                self.sensor_closed_logged = false;
            }
            Err(err) => log::warn!("Could not reopen sensor {:?}: {}", source, err),
        }
    }

    /// Apply a keyboard action. Returns false on quit.
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::Quit => return false,
            InputAction::Tilt(sample) => {
                if matches!(self.source, TiltSource::Keyboard) {
                    self.latched = sample;
                }
            }
            InputAction::RequestRestart => self.machine.request_restart(),
            InputAction::Resize { width, height } => {
                log::debug!("Terminal resized to {}x{}", width, height);
            }
            InputAction::NoAction => {}
        }
        true
    }
}

/// Next action from the keyboard thread; pends forever when there is none.
async fn next_action(actions: &mut Option<UnboundedReceiver<InputAction>>) -> Option<InputAction> {
    match actions {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
type Hangup = tokio::signal::unix::Signal;
#[cfg(not(unix))]
type Hangup = ();

fn hangup_listener() -> Option<Hangup> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::hangup()) {
            Ok(listener) => Some(listener),
            Err(err) => {
                log::warn!("Cannot listen for SIGHUP: {}", err);
                None
            }
        }
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Resolves on the next SIGHUP; pends forever where there is none.
async fn next_hangup(hangup: &mut Option<Hangup>) {
    #[cfg(unix)]
    {
        if let Some(listener) = hangup {
            if listener.recv().await.is_some() {
                return;
            }
        }
        *hangup = None;
    }
    #[cfg(not(unix))]
    {
        let _ = hangup;
    }
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Mode;
    use crate::input::{sample_channel, Direction, KeyTiltMapper};
    use crate::render::ui::MockSceneRenderer;
    use crate::render::RenderSnapshot;
    use parking_lot::Mutex;
    use std::io::Write;

    #[derive(Default)]
    struct Silent;

    impl SpeechSink for Silent {
        fn speak(&self, _text: &str) {}
    }

    /// Renderer sharing its last snapshot with the test
    struct Spy(Arc<Mutex<Vec<RenderSnapshot>>>);

    impl SceneRenderer for Spy {
        fn render(&mut self, snapshot: &RenderSnapshot) -> Result<()> {
            self.0.lock().push(snapshot.clone());
            Ok(())
        }
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }
        fn cleanup(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            engine: Arc::new(PredictiveEngine::with_defaults()),
            transcript: Transcript::new(),
            speech: Arc::new(Silent),
        }
    }

    fn write_config() -> Config {
        Config {
            initial_mode: Mode::Write,
            ..Config::default()
        }
    }

    #[test]
    fn keyboard_tilt_is_latched_across_ticks() {
        let mut app = Application::new(
            write_config(),
            collaborators(),
            TiltSource::Keyboard,
            Box::new(MockSceneRenderer::new()),
        );
        let base = Instant::now();

        let tilt = KeyTiltMapper::new().tilt_toward(Direction::SW);
        assert!(app.handle_action(InputAction::Tilt(tilt)));
        app.tick(base).unwrap();
        app.tick(base + Duration::from_secs(1)).unwrap();
        assert_eq!(app.controller().direction(), Direction::SW);
        assert_eq!(app.controller().dwell(), Duration::from_secs(1));
    }

    #[test]
    fn sensor_ticks_without_new_sample_skip_update() {
        let (tx, latest) = sample_channel();
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let mut app = Application::new(
            write_config(),
            collaborators(),
            TiltSource::Sensor(latest),
            Box::new(Spy(Arc::clone(&snapshots))),
        );
        let base = Instant::now();

        let (roll, pitch) = Direction::NE.unit_vector();
        tx.send_replace(Some(TiltSample::new(roll, pitch)));
        assert!(app.tick(base).unwrap());
        assert!(app.tick(base + Duration::from_secs(5)).unwrap());

        // Only one update happened, so no dwell accumulated
        assert_eq!(app.controller().direction(), Direction::NE);
        assert_eq!(app.controller().dwell(), Duration::ZERO);
        assert_eq!(snapshots.lock().len(), 2);

        drop(tx);
        assert!(!app.tick(base + Duration::from_secs(6)).unwrap());
    }

    #[test]
    fn restart_rebuilds_controller() {
        let mut app = Application::new(
            write_config(),
            collaborators(),
            TiltSource::Keyboard,
            Box::new(MockSceneRenderer::new()),
        );
        let base = Instant::now();
        let tilt = KeyTiltMapper::new().tilt_toward(Direction::E);
        app.handle_action(InputAction::Tilt(tilt));
        app.tick(base).unwrap();
        assert_eq!(app.controller().buffer().cursor_index, 1);

        app.handle_action(InputAction::RequestRestart);
        app.tick(base + Duration::from_secs(1)).unwrap();
        assert_eq!(app.controller().buffer().cursor_index, 0);
        assert!(!app.controller().restart_requested());
    }

    #[test]
    fn restart_reopens_the_sensor() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0.0000,0.5000").unwrap();
        file.flush().unwrap();
        let device = SensorSource::Device(file.path().to_path_buf());

        let mut tasks = BackgroundTasks::new();
        let latest = tasks.start_sensor(&device).unwrap();
        let mut app = Application::new(
            write_config(),
            collaborators(),
            TiltSource::Sensor(latest),
            Box::new(MockSceneRenderer::new()),
        )
        .with_sensor_source(device);
        let base = Instant::now();

        let tick_until_north = |app: &mut Application, start: Instant| {
            for step in 0..500u64 {
                let _ = app.tick(start + Duration::from_millis(step)).unwrap();
                if app.controller().direction() == Direction::N {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            false
        };
        assert!(tick_until_north(&mut app, base));

        app.handle_action(InputAction::RequestRestart);
        app.tick(base + Duration::from_secs(1)).unwrap();
        assert_eq!(app.controller().direction(), Direction::Center);
        assert!(app.reopen_pending);

        // The device is read again from the start
        app.reopen_sensor(&mut tasks);
        assert!(!app.reopen_pending);
        assert!(tick_until_north(&mut app, base + Duration::from_secs(2)));
        tasks.stop();
    }

    #[test]
    fn restart_without_sensor_source_does_not_reopen() {
        let mut app = Application::new(
            write_config(),
            collaborators(),
            TiltSource::Keyboard,
            Box::new(MockSceneRenderer::new()),
        );
        app.handle_action(InputAction::RequestRestart);
        app.tick(Instant::now()).unwrap();
        assert!(!app.reopen_pending);
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut app = Application::new(
            Config::default(),
            collaborators(),
            TiltSource::Keyboard,
            Box::new(MockSceneRenderer::new()),
        );
        assert!(!app.handle_action(InputAction::Quit));
        assert!(app.handle_action(InputAction::NoAction));
    }

    #[tokio::test]
    async fn run_ends_when_sensor_stream_closes() {
        let (tx, latest) = sample_channel();
        let config = Config {
            timing: crate::config::TimingConfig {
                tick_interval_ms: 1,
                ..Default::default()
            },
            ..Config::default()
        };
        let mut app = Application::new(
            config,
            collaborators(),
            TiltSource::Sensor(latest),
            Box::new(MockSceneRenderer::new()),
        )
        .with_keyboard(false);

        tx.send_replace(Some(TiltSample::CENTER));
        drop(tx);
        app.run(BackgroundTasks::new()).await.unwrap();
    }
}
