//! Background threads feeding the tick loop.
//!
//! Every producer (keyboard, sensor, caption recognizer) runs on its own
//! blocking thread. Keyboard and captions share one shutdown flag; the sensor
//! reader gets its own so a restart can swap it for a fresh one. Nothing here
//! ever blocks the tick loop; it only receives what the threads publish.

use crate::bridge::{spawn_caption_feed, CaptionFeed, Transcript};
use crate::error::Result;
use crate::input::{
    sample_channel, spawn_input_thread, spawn_sensor_thread, InputAction, LatestSample,
    SensorSource,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Handles to the threads started for one run of the application.
#[derive(Default)]
pub struct BackgroundTasks {
    shutdown: Arc<AtomicBool>,
    keyboard: Option<JoinHandle<()>>,
    sensor: Option<SensorThread>,
    captions: Option<CaptionFeed>,
}

/// The sensor reader has its own stop flag so it can be replaced mid-run.
struct SensorThread {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl SensorThread {
    /// Ask the thread to stop and join it if it already has. A reader blocked
    /// on a quiet device exits after its next line or with the process.
    fn retire(self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.handle.is_finished() {
            let _ = self.handle.join();
        }
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Start translating terminal keys into actions.
    pub fn start_keyboard(&mut self, poll_interval: Duration) -> UnboundedReceiver<InputAction> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.keyboard = Some(spawn_input_thread(tx, self.shutdown_flag(), poll_interval));
        rx
    }

    /// Start reading tilt samples from `source`.
    pub fn start_sensor(&mut self, source: &SensorSource) -> Result<LatestSample> {
        let (tx, latest) = sample_channel();
        let stop = Arc::new(AtomicBool::new(self.shutdown.load(Ordering::SeqCst)));
        let handle = spawn_sensor_thread(source, tx, Arc::clone(&stop))?;
        self.sensor = Some(SensorThread { handle, stop });
        Ok(latest)
    }

    /// Reopen `source`, retiring the current reader once the new one is up.
    ///
    /// On failure the current reader keeps running.
    pub fn restart_sensor(&mut self, source: &SensorSource) -> Result<LatestSample> {
        let previous = self.sensor.take();
        match self.start_sensor(source) {
            Ok(latest) => {
                if let Some(previous) = previous {
                    previous.retire();
                }
                log::info!("Sensor reopened");
                Ok(latest)
            }
            Err(err) => {
                self.sensor = previous;
                Err(err)
            }
        }
    }

    /// Start the caption recognizer feeding `transcript`.
    pub fn start_captions(&mut self, command: &[String], transcript: Transcript) -> Result<()> {
        self.captions = Some(spawn_caption_feed(command, transcript, self.shutdown_flag())?);
        Ok(())
    }

    /// Signal every thread and wait for the ones that can be joined.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Killing the recognizer closes its pipe, which releases the reader
        drop(self.captions.take());
        if let Some(keyboard) = self.keyboard.take() {
            let _ = keyboard.join();
        }
        if let Some(sensor) = self.sensor.take() {
            sensor.retire();
        }
        log::debug!("Background tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_sensor_device_is_reported() {
        let mut tasks = BackgroundTasks::new();
        let result = tasks.start_sensor(&SensorSource::Device("/no/such/tilt-device".into()));
        assert!(result.is_err());
        tasks.stop();
    }

    #[test]
    fn failed_reopen_keeps_current_reader() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0.0000,0.5000").unwrap();
        file.flush().unwrap();
        let source = SensorSource::Device(file.path().to_path_buf());

        let mut tasks = BackgroundTasks::new();
        tasks.start_sensor(&source).unwrap();
        let missing = SensorSource::Device("/no/such/tilt-device".into());
        assert!(tasks.restart_sensor(&missing).is_err());
        assert!(tasks.sensor.is_some());

        let mut latest = tasks.restart_sensor(&source).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut sample = None;
        while sample.is_none() && std::time::Instant::now() < deadline {
            sample = latest.take();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(sample.map(|s| s.pitch), Some(0.5));
        tasks.stop();
    }

    #[test]
    fn stop_sets_shared_flag() {
        let tasks = BackgroundTasks::new();
        let flag = tasks.shutdown_flag();
        assert!(!flag.load(Ordering::SeqCst));
        tasks.stop();
        assert!(flag.load(Ordering::SeqCst));
    }
}
