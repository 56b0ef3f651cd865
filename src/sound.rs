//! The sound trigger bus: audio input, beat detection and beat fan-out.
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, info, warn};
use ordermap::OrderMap;
use parking_lot::RwLock;

/// Requested capture rate.
pub const SAMPLE_RATE: u32 = 44_100;
/// Requested capture buffer, in frames.
pub const BUFFER_FRAMES: u32 = 128;
/// Low-pass cutoff applied before thresholding.
pub const CUTOFF_HZ: f32 = 800.;

/// Filtered level a sample must cross to count as a beat, per gain setting.
/// Higher settings are more sensitive.
pub const THRESHOLDS: [f32; 10] = [0.5, 0.4, 0.3, 0.25, 0.2, 0.15, 0.1, 0.075, 0.05, 0.025];

/// Default gain setting.
pub const DEFAULT_GAIN: usize = 4;

struct Subscriber {
    tx: Sender<()>,
    enabled: bool,
}

/// Fan-out of beat events to named subscribers.
///
/// Every subscriber gets a single-slot channel: a beat that arrives while the
/// previous one is still unread is dropped for that subscriber.
#[derive(Clone, Default)]
pub struct SoundBus {
    subscribers: Arc<RwLock<OrderMap<String, Subscriber>>>,
    gain: Arc<AtomicUsize>,
}

impl SoundBus {
    pub fn new() -> Self {
        let bus = Self::default();
        bus.set_gain(DEFAULT_GAIN);
        bus
    }

    /// Subscribe to beats, replacing any existing subscriber with this name.
    pub fn register(&self, name: &str) -> Receiver<()> {
        let (tx, rx) = bounded(1);
        self.subscribers
            .write()
            .insert(name.to_string(), Subscriber { tx, enabled: true });
        debug!("Sound subscriber {name} registered.");
        rx
    }

    pub fn deregister(&self, name: &str) {
        if self.subscribers.write().remove(name).is_some() {
            debug!("Sound subscriber {name} deregistered.");
        }
    }

    /// Pause or resume delivery to a subscriber without dropping its channel.
    pub fn enable(&self, name: &str, enabled: bool) {
        if let Some(sub) = self.subscribers.write().get_mut(name) {
            sub.enabled = enabled;
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.subscribers.read().contains_key(name)
    }

    /// Deliver a beat to every enabled subscriber. Never blocks.
    pub fn beat(&self) {
        for (name, sub) in self.subscribers.read().iter() {
            if sub.enabled && sub.tx.try_send(()).is_err() {
                debug!("Dropped beat for {name}.");
            }
        }
    }

    pub fn set_gain(&self, gain: usize) {
        let gain = gain.min(THRESHOLDS.len() - 1);
        self.gain.store(gain, Ordering::Relaxed);
        info!("Sound trigger gain set to {gain}.");
    }

    pub fn gain(&self) -> usize {
        self.gain.load(Ordering::Relaxed)
    }

    fn threshold(&self) -> f32 {
        THRESHOLDS[self.gain()]
    }
}

/// First-order low-pass filter followed by a rising-edge threshold.
pub struct BeatDetector {
    alpha: f32,
    level: f32,
    above: bool,
}

impl BeatDetector {
    pub fn new(sample_rate: u32) -> Self {
        let dt = 1. / sample_rate as f32;
        let rc = 1. / (std::f32::consts::TAU * CUTOFF_HZ);
        Self {
            alpha: dt / (rc + dt),
            level: 0.,
            above: false,
        }
    }

    /// Feed mono samples; returns how many beats were detected.
    pub fn process(&mut self, samples: &[f32], threshold: f32) -> usize {
        let mut beats = 0;
        for sample in samples {
            self.level += self.alpha * (sample - self.level);
            let above = self.level.abs() > threshold;
            if above && !self.above {
                beats += 1;
            }
            self.above = above;
        }
        beats
    }
}

/// Live audio capture feeding the sound bus.
pub struct AudioInput {
    _stream: cpal::Stream,
}

impl AudioInput {
    /// Open an input device (by name, or the default) and start detecting
    /// beats into the bus.
    pub fn open(device_name: Option<&str>, bus: SoundBus) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| anyhow!("audio input \"{name}\" not found"))?,
            None => host
                .default_input_device()
                .ok_or_else(|| anyhow!("no audio input device available"))?,
        };
        let supported = device.default_input_config()?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            bail!(
                "unsupported audio sample format {:?}",
                supported.sample_format()
            );
        }
        let channels = supported.channels().max(1) as usize;
        let mut config: cpal::StreamConfig = supported.into();
        config.sample_rate = cpal::SampleRate(SAMPLE_RATE);
        config.buffer_size = cpal::BufferSize::Fixed(BUFFER_FRAMES);

        let mut detector = BeatDetector::new(SAMPLE_RATE);
        let mut mono = Vec::with_capacity(BUFFER_FRAMES as usize);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    mono.clear();
                    mono.extend(
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                    );
                    for _ in 0..detector.process(&mono, bus.threshold()) {
                        bus.beat();
                    }
                },
                |err| warn!("Audio input error: {err}."),
                Some(Duration::from_secs(1)),
            )
            .context("opening audio input stream")?;
        stream.play().context("starting audio input stream")?;
        info!(
            "Listening to {} for beats.",
            device.name().unwrap_or_else(|_| "audio input".to_string())
        );
        Ok(Self { _stream: stream })
    }
}
