//! Host-side test doubles shared by the unit tests

use core::cell::{Cell, RefCell};

use liquidus_hal::{EepromController, FlashCommand, FlashError};

use liquidus_hal::{EepromSize, PartitionSplit};

use crate::storage::{FlashDriver, InitOutcome};
use crate::traits::ThermocoupleProbe;

const SHADOW_BYTES: usize = 4096;

/// EEPROM emulation backed by a RAM array
pub struct MockEeprom {
    shadow: RefCell<[u8; SHADOW_BYTES]>,
    configured: Cell<bool>,
    busy: Cell<u32>,
    commit_polls: Cell<u32>,
    stuck: Cell<bool>,
    pauses: Cell<usize>,
    writes: Cell<usize>,
    commands: Cell<usize>,
    next_write_error: Cell<Option<FlashError>>,
}

impl MockEeprom {
    /// Part fresh from the programmer: not partitioned, erased
    pub fn blank() -> Self {
        Self {
            shadow: RefCell::new([0xFF; SHADOW_BYTES]),
            configured: Cell::new(false),
            busy: Cell::new(0),
            commit_polls: Cell::new(0),
            stuck: Cell::new(false),
            pauses: Cell::new(0),
            writes: Cell::new(0),
            commands: Cell::new(0),
            next_write_error: Cell::new(None),
        }
    }

    /// Part that was partitioned on an earlier boot
    pub fn configured() -> Self {
        let eeprom = Self::blank();
        eeprom.configured.set(true);
        eeprom
    }

    /// Number of polls each commit stays busy for
    pub fn set_commit_polls(&self, polls: u32) {
        self.commit_polls.set(polls);
    }

    /// Never report ready
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.set(stuck);
    }

    pub fn fail_next_write(&self, error: FlashError) {
        self.next_write_error.set(Some(error));
    }

    pub fn pauses(&self) -> usize {
        self.pauses.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn commands(&self) -> usize {
        self.commands.get()
    }
}

impl EepromController for MockEeprom {
    fn read(&self, offset: usize, buf: &mut [u8]) {
        let shadow = self.shadow.borrow();
        buf.copy_from_slice(&shadow[offset..offset + buf.len()]);
    }

    fn write(&self, offset: usize, data: &[u8]) -> Result<(), FlashError> {
        if let Some(error) = self.next_write_error.take() {
            return Err(error);
        }
        if !self.configured.get() {
            return Err(FlashError::NotConfigured);
        }
        self.shadow.borrow_mut()[offset..offset + data.len()].copy_from_slice(data);
        self.writes.set(self.writes.get() + 1);
        self.busy.set(self.commit_polls.get());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.stuck.get() && self.busy.get() == 0
    }

    fn is_configured(&self) -> bool {
        self.configured.get()
    }

    fn execute(&self, command: FlashCommand) -> Result<(), FlashError> {
        self.commands.set(self.commands.get() + 1);
        match command {
            FlashCommand::ProgramPartition { .. } => {
                *self.shadow.borrow_mut() = [0xFF; SHADOW_BYTES];
                self.configured.set(true);
            }
            FlashCommand::EraseAll => self.configured.set(false),
        }
        Ok(())
    }

    fn pause_ms(&self, _ms: u32) {
        self.pauses.set(self.pauses.get() + 1);
        let busy = self.busy.get();
        if busy > 0 {
            self.busy.set(busy - 1);
        }
    }
}

/// Driver over a freshly partitioned 1 KiB window
pub fn fresh_driver() -> FlashDriver<MockEeprom> {
    let mut driver = FlashDriver::new(MockEeprom::blank());
    let outcome = driver
        .initialize(EepromSize::Kib1, PartitionSplit::Half)
        .unwrap();
    assert_eq!(outcome, InitOutcome::FreshlyPartitioned);
    driver
}

/// Build a converter frame from temperatures in °C
pub fn encode_frame(temperature: f32, cold_junction: f32, status: u8) -> [u8; 4] {
    let probe = ((temperature * 4.0) as i16) << 2;
    let cold = (((cold_junction * 16.0) as i16) << 4) as u16 | (status & 0b111) as u16;
    let hi = (probe as u16).to_be_bytes();
    let lo = cold.to_be_bytes();
    [hi[0], hi[1], lo[0], lo[1]]
}

/// Converter that always returns the same frame
pub struct FixedProbe {
    frame: Option<[u8; 4]>,
}

impl FixedProbe {
    pub fn celsius(temperature: f32, cold_junction: f32) -> Self {
        Self {
            frame: Some(encode_frame(temperature, cold_junction, 0)),
        }
    }

    pub fn faulted(status: u8) -> Self {
        Self {
            frame: Some(encode_frame(0.0, 25.0, status)),
        }
    }

    /// Bus transaction always fails
    pub fn failing() -> Self {
        Self { frame: None }
    }
}

impl ThermocoupleProbe for FixedProbe {
    type Error = ();

    fn read_frame(&mut self) -> Result<[u8; 4], ()> {
        self.frame.ok_or(())
    }
}

/// Temperature a test can change while the oven owns the probe
pub struct ProbeState {
    pub temperature: Cell<f32>,
    pub cold_junction: Cell<f32>,
    pub status: Cell<u8>,
}

impl ProbeState {
    pub const fn new(temperature: f32) -> Self {
        Self {
            temperature: Cell::new(temperature),
            cold_junction: Cell::new(25.0),
            status: Cell::new(0),
        }
    }
}

/// Converter reading from a [`ProbeState`]
pub struct LiveProbe<'t> {
    pub state: &'t ProbeState,
}

impl ThermocoupleProbe for LiveProbe<'_> {
    type Error = ();

    fn read_frame(&mut self) -> Result<[u8; 4], ()> {
        Ok(encode_frame(
            self.state.temperature.get(),
            self.state.cold_junction.get(),
            self.state.status.get(),
        ))
    }
}
