//! Hardware backends
//!
//! A device never talks to hardware directly; it drives an [`RfBackend`].
//! The registry obtains one backend per device from a [`BackendFactory`], so
//! a real instrument driver can be swapped in without touching the state
//! machine. [`SimulatedBackend`] models a USRP B200 with a configurable
//! handshake delay and failure rate and all randomness drawn from an injected
//! [`StdRng`].

use std::fmt;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::DeviceSpecs;
use crate::error::{BackendError, ConfigError};

/// Largest accepted per-retune temperature drift, in degrees Celsius
pub const MAX_TEMPERATURE_DRIFT: f64 = 10.0;

/// A validated parameter change to push to the hardware
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    /// Center frequency in Hz
    Frequency(f64),
    /// Gain in dB
    Gain(f64),
    /// Bandwidth in Hz
    Bandwidth(f64),
    /// Antenna port
    Antenna(String),
}

impl Setting {
    /// SCPI-style command text for this setting
    pub fn command(&self) -> String {
        match self {
            Setting::Frequency(hz) => format!("FREQ:CW {}", hz),
            Setting::Gain(db) => format!("POW:AMPL {}", db),
            Setting::Bandwidth(hz) => format!("BAND {}", hz),
            Setting::Antenna(name) => format!("ROUT:ANT {}", name),
        }
    }
}

/// Hardware access for a single device
///
/// Calls are made with the owning device's state lock held, so an
/// implementation never sees concurrent calls.
pub trait RfBackend: Send {
    /// Perform the connection handshake
    fn open(&mut self, device_id: &str) -> Result<(), BackendError>;

    /// Read the hardware's identity and capability ranges
    ///
    /// Called once, when the device is created.
    fn specs(&mut self) -> DeviceSpecs;

    /// Push a validated setting to the hardware
    fn apply(&mut self, setting: &Setting) -> Result<(), BackendError>;

    /// Temperature change in degrees Celsius caused by a retune
    fn thermal_drift(&mut self) -> f64;
}

/// Creates the backend for a newly registered device
pub trait BackendFactory: Send + Sync {
    fn create(&self, device_id: &str) -> Box<dyn RfBackend>;
}

/// Simulator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Probability in `[0, 1]` that a handshake fails
    pub failure_rate: f64,
    /// Simulated handshake latency
    pub handshake_delay_ms: u64,
    /// Maximum temperature change per retune, in degrees Celsius
    pub temperature_drift: f64,
    /// Base seed; `None` seeds every device from OS entropy
    pub seed: Option<u64>,
}

impl SimulatorConfig {
    /// Check that every value is usable by the simulator
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::InvalidFailureRate(self.failure_rate));
        }
        if !(0.0..=MAX_TEMPERATURE_DRIFT).contains(&self.temperature_drift) {
            return Err(ConfigError::InvalidTemperatureDrift {
                value: self.temperature_drift,
                max: MAX_TEMPERATURE_DRIFT,
            });
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.05,
            handshake_delay_ms: 100,
            temperature_drift: 0.5,
            seed: None,
        }
    }
}

/// Simulated USRP-class radio
pub struct SimulatedBackend {
    config: SimulatorConfig,
    rng: StdRng,
}

impl fmt::Debug for SimulatedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SimulatedBackend {
    /// Create a simulator drawing from the given random source
    pub fn new(config: SimulatorConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    /// Create a simulator with a fixed seed
    pub fn seeded(config: SimulatorConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

impl RfBackend for SimulatedBackend {
    fn open(&mut self, device_id: &str) -> Result<(), BackendError> {
        if self.config.handshake_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.handshake_delay_ms));
        }

        if self.rng.gen::<f64>() < self.config.failure_rate {
            debug!("Simulated handshake failure for {}", device_id);
            return Err(BackendError::HandshakeTimeout);
        }

        Ok(())
    }

    fn specs(&mut self) -> DeviceSpecs {
        let serial = format!("SN{}", self.rng.gen_range(100_000..=999_999));
        DeviceSpecs::usrp_b200(serial)
    }

    fn apply(&mut self, setting: &Setting) -> Result<(), BackendError> {
        debug!("Simulated instrument command: {}", setting.command());
        Ok(())
    }

    fn thermal_drift(&mut self) -> f64 {
        let span = self.config.temperature_drift.abs().min(MAX_TEMPERATURE_DRIFT);
        if span == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-span..=span)
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Factory producing one [`SimulatedBackend`] per device
///
/// With a base seed, each device's random source is derived from the seed
/// and the device id, so a given id always behaves the same regardless of
/// creation order.
#[derive(Debug, Clone, Default)]
pub struct SimulatorFactory {
    config: SimulatorConfig,
}

impl SimulatorFactory {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Stable across builds: FNV-1a over the id, mixed with the base by
    /// one splitmix64 round
    fn device_seed(base: u64, device_id: &str) -> u64 {
        let id_hash = device_id.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
        splitmix64(base ^ id_hash)
    }
}

impl BackendFactory for SimulatorFactory {
    fn create(&self, device_id: &str) -> Box<dyn RfBackend> {
        let rng = match self.config.seed {
            Some(base) => StdRng::seed_from_u64(Self::device_seed(base, device_id)),
            None => StdRng::from_entropy(),
        };
        Box::new(SimulatedBackend::new(self.config.clone(), rng))
    }
}
