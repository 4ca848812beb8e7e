//! Fire-and-forget speech output.
//!
//! The controller only ever calls [`SpeechSink::speak`], which must return
//! immediately. [`SpeechQueue`] hands the text to a worker thread that
//! synthesises one utterance at a time; a hung synthesizer or player is
//! killed after its timeout so the queue keeps moving.

use crate::config::SpeechConfig;
use crate::error::{Result, TiltError};
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How often a running child is checked against its deadline.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Non-blocking speech output as seen by the controller.
pub trait SpeechSink: Send + Sync {
    fn speak(&self, text: &str);
}

/// Blocking synthesis of a single utterance, run on the queue's worker thread.
pub trait Utterer: Send + 'static {
    fn utter(&mut self, text: &str) -> Result<()>;
}

/// Runs the configured synthesizer (text on stdin), optionally piping its
/// audio into a player process.
#[derive(Debug, Clone)]
pub struct CommandUtterer {
    config: SpeechConfig,
}

impl CommandUtterer {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }
}

impl Utterer for CommandUtterer {
    fn utter(&mut self, text: &str) -> Result<()> {
        let (synth_program, synth_args) = self
            .config
            .synth_command
            .split_first()
            .ok_or_else(|| TiltError::speech("no synthesizer configured"))?;

        let has_player = self.config.player_command.is_some();
        let mut synth = Command::new(synth_program)
            .args(synth_args)
            .stdin(Stdio::piped())
            .stdout(if has_player {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TiltError::speech(format!("failed to start {synth_program}: {e}")))?;

        let mut player = match (&self.config.player_command, synth.stdout.take()) {
            (Some(command), Some(audio)) => {
                let Some((program, args)) = command.split_first() else {
                    let _ = synth.kill();
                    return Err(TiltError::speech("empty player command"));
                };
                match Command::new(program)
                    .args(args)
                    .stdin(Stdio::from(audio))
                    .stderr(Stdio::null())
                    .spawn()
                {
                    Ok(child) => Some(child),
                    Err(e) => {
                        let _ = synth.kill();
                        let _ = synth.wait();
                        return Err(TiltError::speech(format!("failed to start {program}: {e}")));
                    }
                }
            }
            _ => None,
        };

        if let Some(mut stdin) = synth.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                log::warn!("Failed to hand text to synthesizer: {}", e);
            }
        }

        let synth_result = wait_with_deadline(&mut synth, self.config.synth_timeout(), "synthesizer");
        let player_result = match player.as_mut() {
            Some(child) => wait_with_deadline(child, self.config.player_timeout(), "player"),
            None => Ok(()),
        };
        synth_result.and(player_result)
    }
}

/// Wait for `child`, killing it once `timeout` has elapsed.
fn wait_with_deadline(child: &mut Child, timeout: Duration, what: &str) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => {
                return Err(TiltError::speech(format!("{what} exited with {status}")));
            }
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TiltError::speech(format!(
                    "{what} timed out after {:.1}s",
                    timeout.as_secs_f64()
                )));
            }
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(e) => return Err(TiltError::speech(format!("failed to wait for {what}: {e}"))),
        }
    }
}

struct SpeechJob {
    text: String,
    generation: u64,
}

/// Queue of utterances drained by a dedicated worker thread.
pub struct SpeechQueue {
    tx: UnboundedSender<SpeechJob>,
    generation: Arc<AtomicU64>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SpeechQueue {
    /// Start a queue speaking through external processes.
    pub fn spawn(config: SpeechConfig) -> Self {
        log::info!("Speech queue ready ({:?})", config.synth_command.first());
        Self::with_utterer(CommandUtterer::new(config))
    }

    pub fn with_utterer<U: Utterer>(utterer: U) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        let worker = spawn_speech_worker(rx, Arc::clone(&generation), utterer);
        Self {
            tx,
            generation,
            worker: Some(worker),
        }
    }

    /// Drop every phrase still waiting; the one being spoken finishes.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        log::debug!("Speech queue cleared");
    }

    /// Stop accepting text and wait for the worker to finish what is queued.
    pub fn shutdown(mut self) {
        let (closed_tx, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.tx, closed_tx));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl SpeechSink for SpeechQueue {
    fn speak(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        log::info!("Speech enqueue: {:?}", text);
        let job = SpeechJob {
            text: text.to_string(),
            generation: self.generation.load(Ordering::SeqCst),
        };
        if self.tx.send(job).is_err() {
            log::warn!("Speech worker is gone, dropping {:?}", text);
        }
    }
}

fn spawn_speech_worker<U: Utterer>(
    mut rx: UnboundedReceiver<SpeechJob>,
    generation: Arc<AtomicU64>,
    mut utterer: U,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            if job.generation < generation.load(Ordering::SeqCst) {
                continue;
            }
            log::debug!("Speaking {:?}", job.text);
            if let Err(err) = utterer.utter(&job.text) {
                log::error!("Speech worker error: {}", err);
            }
        }
    })
}
