//! Low-level tilt sample collection: line parsing for the sensor stream and a
//! background reader publishing only the newest sample.
//!
//! The sensor firmware prints `roll,pitch` pairs (`%.4f,%.4f`) many times per
//! tick. Old samples are worthless once a newer one exists, so the reader
//! overwrites a single slot instead of queueing.

use crate::error::{Result, TiltError};
use bstr::ByteSlice;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::watch;

/// One (roll, pitch) reading, nominally within [-1, 1] on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TiltSample {
    pub roll: f64,
    pub pitch: f64,
}

impl TiltSample {
    pub const CENTER: TiltSample = TiltSample {
        roll: 0.0,
        pitch: 0.0,
    };

    pub fn new(roll: f64, pitch: f64) -> Self {
        Self { roll, pitch }
    }
}

/// Parse a `roll,pitch[,...]` line. Anything else is rejected.
pub fn parse_sample_line(line: &str) -> Option<TiltSample> {
    let mut fields = line.trim().split(',');
    let roll = fields.next()?.trim().parse::<f64>().ok()?;
    let pitch = fields.next()?.trim().parse::<f64>().ok()?;
    if !(roll.is_finite() && pitch.is_finite()) {
        return None;
    }
    Some(TiltSample { roll, pitch })
}

/// Where tilt samples come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorSource {
    Stdin,
    /// Serial device node or FIFO
    Device(PathBuf),
}

impl SensorSource {
    /// `-` selects stdin, anything else is treated as a path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            SensorSource::Stdin
        } else {
            SensorSource::Device(PathBuf::from(arg))
        }
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            SensorSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            SensorSource::Device(path) => {
                let file = File::open(path).map_err(|e| {
                    TiltError::file_error(format!("Failed to open sensor: {}", path.display()), e)
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Pulls valid samples out of a line-oriented byte stream.
pub struct SensorReader<R> {
    reader: R,
    line: Vec<u8>,
    rejected: u64,
}

impl<R: BufRead> SensorReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            rejected: 0,
        }
    }

    /// Next well-formed sample, or `None` at end of stream.
    ///
    /// Bytes that are not UTF-8 (serial noise at power-up) only spoil the
    /// line they arrive on.
    pub fn read_sample(&mut self) -> Result<Option<TiltSample>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.line)
                .map_err(|e| TiltError::sensor(format!("read failed: {e}")))?;
            if read == 0 {
                return Ok(None);
            }
            let line = self.line.to_str_lossy();
            match parse_sample_line(&line) {
                Some(sample) => return Ok(Some(sample)),
                None => {
                    self.rejected += 1;
                    log::trace!("Discarding sensor line {:?}", line.trim_end());
                }
            }
        }
    }

    /// Number of malformed lines skipped so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

/// Consumer side of the latest-sample slot.
///
/// Each published sample is handed out at most once; ticks that find nothing
/// new get `None` and the controller simply skips its update.
#[derive(Debug)]
pub struct LatestSample {
    rx: watch::Receiver<Option<TiltSample>>,
}

impl LatestSample {
    pub fn new(rx: watch::Receiver<Option<TiltSample>>) -> Self {
        Self { rx }
    }

    pub fn take(&mut self) -> Option<TiltSample> {
        let latest = self.rx.borrow_and_update();
        if latest.has_changed() {
            *latest
        } else {
            None
        }
    }

    /// True once the producing thread has gone away
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

/// Create an empty latest-sample slot.
pub fn sample_channel() -> (watch::Sender<Option<TiltSample>>, LatestSample) {
    let (tx, rx) = watch::channel(None);
    (tx, LatestSample::new(rx))
}

/// Open `source` and spawn a blocking thread that publishes every parsed sample.
pub fn spawn_sensor_thread(
    source: &SensorSource,
    tx: watch::Sender<Option<TiltSample>>,
    shutdown: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    let reader = source.open()?;
    log::info!("Reading tilt samples from {:?}", source);
    Ok(spawn_reader_thread(reader, tx, shutdown))
}

/// Spawn the publishing loop over an already opened stream.
pub fn spawn_reader_thread<R>(
    reader: R,
    tx: watch::Sender<Option<TiltSample>>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = SensorReader::new(reader);
        while !shutdown.load(Ordering::SeqCst) {
            match reader.read_sample() {
                Ok(Some(sample)) => {
                    tx.send_replace(Some(sample));
                }
                Ok(None) => {
                    log::warn!("Sensor stream ended");
                    break;
                }
                Err(err) => {
                    log::error!("Sensor thread error: {}", err);
                    break;
                }
            }
        }
        log::debug!(
            "Sensor thread exiting ({} malformed lines skipped)",
            reader.rejected()
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_firmware_lines() {
        assert_eq!(
            parse_sample_line("0.1234,-0.5000\n"),
            Some(TiltSample::new(0.1234, -0.5))
        );
        assert_eq!(
            parse_sample_line(" -1.0 , 1.0 ,extra"),
            Some(TiltSample::new(-1.0, 1.0))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_sample_line(""), None);
        assert_eq!(parse_sample_line("0.5"), None);
        assert_eq!(parse_sample_line("ADXL343 ready"), None);
        assert_eq!(parse_sample_line("abc,0.1"), None);
        assert_eq!(parse_sample_line("nan,0.1"), None);
    }

    #[test]
    fn reader_skips_noise_until_valid_sample() {
        let stream = Cursor::new("booting\n\n0.1,0.2\nbad\n0.3,0.4\n");
        let mut reader = SensorReader::new(stream);

        assert_eq!(reader.read_sample().unwrap(), Some(TiltSample::new(0.1, 0.2)));
        assert_eq!(reader.read_sample().unwrap(), Some(TiltSample::new(0.3, 0.4)));
        assert_eq!(reader.read_sample().unwrap(), None);
        assert_eq!(reader.rejected(), 3);
    }

    #[test]
    fn reader_survives_bytes_that_are_not_utf8() {
        let stream = Cursor::new(b"\xff\xfe boot noise\n0.1\xff,0.2\n0.1000,0.2000\n".to_vec());
        let mut reader = SensorReader::new(stream);

        assert_eq!(reader.read_sample().unwrap(), Some(TiltSample::new(0.1, 0.2)));
        assert_eq!(reader.read_sample().unwrap(), None);
        assert_eq!(reader.rejected(), 2);
    }

    #[test]
    fn reader_thread_keeps_going_after_serial_noise() {
        let (tx, mut latest) = sample_channel();
        let stream = Cursor::new(b"\x00\xc3\x28garbage\n-0.5000,0.2500\n".to_vec());

        spawn_reader_thread(stream, tx, Arc::new(AtomicBool::new(false)))
            .join()
            .unwrap();

        assert_eq!(latest.take(), Some(TiltSample::new(-0.5, 0.25)));
    }

    #[test]
    fn latest_sample_is_handed_out_once() {
        let (tx, mut latest) = sample_channel();
        assert_eq!(latest.take(), None);

        tx.send_replace(Some(TiltSample::new(0.1, 0.1)));
        tx.send_replace(Some(TiltSample::new(0.9, 0.9)));
        assert_eq!(latest.take(), Some(TiltSample::new(0.9, 0.9)));
        assert_eq!(latest.take(), None);

        tx.send_replace(Some(TiltSample::new(-0.4, 0.0)));
        drop(tx);
        assert!(latest.is_closed());
        assert_eq!(latest.take(), Some(TiltSample::new(-0.4, 0.0)));
        assert_eq!(latest.take(), None);
    }

    #[test]
    fn reader_thread_publishes_newest_sample() {
        let (tx, mut latest) = sample_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stream = Cursor::new("0.1,0.1\n0.2,0.2\n0.3,0.3\n");

        spawn_reader_thread(stream, tx, shutdown).join().unwrap();

        assert_eq!(latest.take(), Some(TiltSample::new(0.3, 0.3)));
        assert!(latest.is_closed());
    }

    #[test]
    fn missing_device_is_reported() {
        let (tx, _latest) = sample_channel();
        let source = SensorSource::from_arg("/dev/definitely-not-a-tilt-sensor");
        let result = spawn_sensor_thread(&source, tx, Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(TiltError::FileError { .. })));
        assert_eq!(SensorSource::from_arg("-"), SensorSource::Stdin);
    }
}
