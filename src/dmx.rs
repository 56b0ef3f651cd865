//! The DMX universe: addresses, the shared frame buffer and the renderer that
//! pushes frames out to the interface.
use std::{
    fmt::Display,
    ops::Add,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use crossbeam_channel::{Receiver, select, tick};
use log::{debug, error, info};
use rust_dmx::DmxPort;
use serde::{Deserialize, Serialize};

use crate::error::DmxStatus;

/// Number of data slots in one universe.
pub const UNIVERSE_SIZE: usize = 512;

/// How often the renderer pushes the frame to the interface.
pub const RENDER_INTERVAL: Duration = Duration::from_millis(30);

/// A DMX address, indexed from 1.
///
/// We don't check that the value is valid at parse time, as this makes
/// the catalogue report less useful. This needs to be validated downstream.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug, PartialOrd, Ord)]
pub struct DmxAddr(pub usize);

impl DmxAddr {
    /// Get the DMX buffer index of this address (indexed from 0).
    pub fn dmx_index(&self) -> usize {
        self.0 - 1
    }

    /// Ensure this address is in range.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=UNIVERSE_SIZE).contains(&self.0),
            "invalid DMX address {}",
            self.0
        );
        Ok(())
    }
}

impl Display for DmxAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<usize> for DmxAddr {
    type Output = DmxAddr;
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// A data buffer for one DMX universe.
pub type DmxBuffer = [u8; UNIVERSE_SIZE];

/// Something the mapper can write channel values into.
pub trait ChannelSink: Send + Sync {
    /// Write one byte at a 1-based address.
    /// Addresses outside the universe are silently dropped.
    fn set_channel(&self, addr: usize, value: u8);
}

/// The single universe all fixtures render into.
///
/// Every slot is an independent atomic so that fixture workers writing
/// disjoint channel ranges never contend and never block.
pub struct FrameBuffer {
    slots: [AtomicU8; UNIVERSE_SIZE],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU8::new(0)),
        }
    }
}

impl FrameBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Read the byte at a 1-based address. Out of range reads as 0.
    pub fn get(&self, addr: usize) -> u8 {
        if !(1..=UNIVERSE_SIZE).contains(&addr) {
            return 0;
        }
        self.slots[addr - 1].load(Ordering::Relaxed)
    }

    /// Copy out the current frame.
    pub fn snapshot(&self) -> DmxBuffer {
        std::array::from_fn(|i| self.slots[i].load(Ordering::Relaxed))
    }

    /// Zero the whole universe.
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
    }
}

impl ChannelSink for FrameBuffer {
    fn set_channel(&self, addr: usize, value: u8) {
        if !(1..=UNIVERSE_SIZE).contains(&addr) {
            return;
        }
        self.slots[addr - 1].store(value, Ordering::Relaxed);
    }
}

/// Where rendered frames go.
pub trait DmxSink {
    fn write(&mut self, frame: &DmxBuffer) -> Result<()>;
}

impl DmxSink for Box<dyn DmxPort> {
    fn write(&mut self, frame: &DmxBuffer) -> Result<()> {
        DmxPort::write(self.as_mut(), frame).map_err(|e| anyhow!("{e}"))
    }
}

/// Sink used when no DMX interface is present.
#[derive(Default)]
pub struct OfflineSink;

impl DmxSink for OfflineSink {
    fn write(&mut self, _frame: &DmxBuffer) -> Result<()> {
        Ok(())
    }
}

/// Owns write access to the sink; pushes the frame buffer at a fixed cadence.
pub struct Renderer {
    frame: Arc<FrameBuffer>,
    status: DmxStatus,
    interval: Duration,
}

impl Renderer {
    pub fn new(frame: Arc<FrameBuffer>, status: DmxStatus) -> Self {
        Self {
            frame,
            status,
            interval: RENDER_INTERVAL,
        }
    }

    /// Copy out the frame and transmit it once.
    ///
    /// A transmit failure is only an error if the interface was reported
    /// present at start-up.
    pub fn render_once(&self, sink: &mut dyn DmxSink) -> Result<()> {
        let frame = self.frame.snapshot();
        match sink.write(&frame) {
            Ok(()) => Ok(()),
            Err(err) => match self.status {
                DmxStatus::Present => Err(err.context("DMX transmit failed")),
                DmxStatus::Absent => {
                    debug!("Ignoring DMX write error with no interface present: {err:#}.");
                    Ok(())
                }
            },
        }
    }

    /// Render forever in the current thread, until shutdown is signalled.
    ///
    /// An optional hook runs after each frame (used by the terminal preview).
    pub fn run(
        &self,
        sink: &mut dyn DmxSink,
        shutdown: &Receiver<()>,
        mut after_frame: impl FnMut(&DmxBuffer),
    ) -> Result<()> {
        info!(
            "Rendering DMX every {} ms (interface {:?}).",
            self.interval.as_millis(),
            self.status
        );
        let ticker = tick(self.interval);
        loop {
            select! {
                recv(shutdown) -> _ => {
                    info!("Renderer shutting down.");
                    return Ok(());
                }
                recv(ticker) -> _ => {
                    if let Err(err) = self.render_once(sink) {
                        error!("{err:#}");
                        return Err(err);
                    }
                    after_frame(&self.frame.snapshot());
                }
            }
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use anyhow::bail;

    struct FailingSink;

    impl DmxSink for FailingSink {
        fn write(&mut self, _frame: &DmxBuffer) -> Result<()> {
            bail!("cable unplugged")
        }
    }

    #[derive(Default)]
    struct CapturingSink(Vec<DmxBuffer>);

    impl DmxSink for CapturingSink {
        fn write(&mut self, frame: &DmxBuffer) -> Result<()> {
            self.0.push(*frame);
            Ok(())
        }
    }

    #[test]
    fn test_out_of_range_writes_are_dropped() {
        let frame = FrameBuffer::new();
        frame.set_channel(0, 10);
        frame.set_channel(513, 10);
        frame.set_channel(1, 11);
        frame.set_channel(512, 12);
        let snapshot = frame.snapshot();
        assert_eq!(11, snapshot[0]);
        assert_eq!(12, snapshot[511]);
        assert_eq!(2, snapshot.iter().filter(|v| **v != 0).count());
        assert_eq!(0, frame.get(0));
        assert_eq!(0, frame.get(600));
    }

    #[test]
    fn test_render_once_copies_frame() -> Result<()> {
        let frame = FrameBuffer::new();
        frame.set_channel(3, 200);
        let renderer = Renderer::new(frame.clone(), DmxStatus::Present);
        let mut sink = CapturingSink::default();
        renderer.render_once(&mut sink)?;
        assert_eq!(1, sink.0.len());
        assert_eq!(200, sink.0[0][2]);
        Ok(())
    }

    #[test]
    fn test_transmit_failure_fatal_only_when_present() {
        let frame = FrameBuffer::new();
        let absent = Renderer::new(frame.clone(), DmxStatus::Absent);
        assert!(absent.render_once(&mut FailingSink).is_ok());
        let present = Renderer::new(frame, DmxStatus::Present);
        let err = present.render_once(&mut FailingSink).unwrap_err();
        assert!(format!("{err:#}").contains("cable unplugged"));
    }

    #[test]
    fn test_addr_validation() {
        assert!(DmxAddr(1).validate().is_ok());
        assert!(DmxAddr(512).validate().is_ok());
        assert!(DmxAddr(0).validate().is_err());
        assert!(DmxAddr(513).validate().is_err());
        assert_eq!(4, (DmxAddr(1) + 4).dmx_index());
    }
}
