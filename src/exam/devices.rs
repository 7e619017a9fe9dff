//! Audio collaborators used by the speaking section.
//!
//! The controller only cares about timing: when instruction audio starts and
//! stops, and when the microphone is held. Releasing a capture stream happens
//! in its `Drop` impl, so dropping the owning `InputLevel` is enough on every
//! exit path.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

pub trait AudioPlayer {
    fn play(&mut self, reference: Option<&str>, total_secs: u32);
    fn stop(&mut self);
}

/// Player for builds without an audio backend. Playback is purely timed.
#[derive(Debug, Default)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&mut self, reference: Option<&str>, total_secs: u32) {
        debug!(reference = reference.unwrap_or("-"), total_secs, "instruction playback started");
    }

    fn stop(&mut self) {
        debug!("instruction playback stopped");
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied")]
    Denied,
    #[error("no capture backend available")]
    Unavailable,
}

/// A held microphone. Implementations release the device when dropped.
pub trait CaptureStream {
    /// Current input level, 0.0 to 100.0.
    fn level(&mut self) -> f64;
}

pub trait CaptureDevice {
    fn request_capture(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// Capture device for builds without a platform microphone backend.
#[derive(Debug, Default)]
pub struct NoCapture;

impl CaptureDevice for NoCapture {
    fn request_capture(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

/// Deterministic stand-in for a live microphone level.
pub struct SyntheticLevel {
    rng: SmallRng,
    step: u32,
}

impl SyntheticLevel {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            step: 0,
        }
    }

    pub fn next_level(&mut self) -> f64 {
        self.step = self.step.wrapping_add(1);
        let base = 30.0 + self.rng.gen_range(0.0..40.0);
        let wave = (self.step as f64 / 2.0).sin() * 15.0;
        let spike = if self.rng.gen_bool(0.1) {
            self.rng.gen_range(0.0..20.0)
        } else {
            0.0
        };
        (base + wave + spike).clamp(10.0, 90.0)
    }
}

pub enum InputLevel {
    Live(Box<dyn CaptureStream>),
    Synthetic(SyntheticLevel),
}

impl InputLevel {
    /// Never fails: a denied or missing device falls back to a synthetic
    /// signal without surfacing anything to the candidate.
    pub fn acquire(device: &mut dyn CaptureDevice, seed: u64) -> Self {
        match device.request_capture() {
            Ok(stream) => InputLevel::Live(stream),
            Err(err) => {
                warn!(%err, "capture unavailable, using synthetic input level");
                InputLevel::Synthetic(SyntheticLevel::new(seed))
            }
        }
    }

    pub fn sample(&mut self) -> f64 {
        match self {
            InputLevel::Live(stream) => stream.level().clamp(0.0, 100.0),
            InputLevel::Synthetic(signal) => signal.next_level(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, InputLevel::Synthetic(_))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    /// Capture device that counts how many streams are currently held.
    pub(crate) struct CountingCapture {
        pub open: Rc<Cell<usize>>,
        pub deny: bool,
    }

    impl CountingCapture {
        pub(crate) fn new(deny: bool) -> (Self, Rc<Cell<usize>>) {
            let open = Rc::new(Cell::new(0));
            (
                Self {
                    open: Rc::clone(&open),
                    deny,
                },
                open,
            )
        }
    }

    struct CountingStream {
        open: Rc<Cell<usize>>,
    }

    impl CaptureStream for CountingStream {
        fn level(&mut self) -> f64 {
            42.0
        }
    }

    impl Drop for CountingStream {
        fn drop(&mut self) {
            self.open.set(self.open.get() - 1);
        }
    }

    impl CaptureDevice for CountingCapture {
        fn request_capture(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
            if self.deny {
                return Err(CaptureError::Denied);
            }
            self.open.set(self.open.get() + 1);
            Ok(Box::new(CountingStream {
                open: Rc::clone(&self.open),
            }))
        }
    }

    #[test]
    fn denied_capture_falls_back_to_synthetic() {
        let (mut device, open) = CountingCapture::new(true);
        let mut input = InputLevel::acquire(&mut device, 7);
        assert!(input.is_synthetic());
        assert_eq!(open.get(), 0);
        let level = input.sample();
        assert!((10.0..=90.0).contains(&level));
    }

    #[test]
    fn live_capture_is_released_on_drop() {
        let (mut device, open) = CountingCapture::new(false);
        let mut input = InputLevel::acquire(&mut device, 7);
        assert!(!input.is_synthetic());
        assert_eq!(open.get(), 1);
        assert_eq!(input.sample(), 42.0);
        drop(input);
        assert_eq!(open.get(), 0);
    }

    #[test]
    fn synthetic_level_is_deterministic_per_seed() {
        let mut a = SyntheticLevel::new(99);
        let mut b = SyntheticLevel::new(99);
        for _ in 0..50 {
            let level = a.next_level();
            assert_eq!(level, b.next_level());
            assert!((10.0..=90.0).contains(&level));
        }
    }

    #[test]
    fn no_capture_backend_reports_unavailable() {
        assert!(matches!(
            NoCapture.request_capture(),
            Err(CaptureError::Unavailable)
        ));
    }
}
