//! Device registry
//!
//! Maps device ids to [`RfDevice`] instances, creating them on first use.
//!
//! The map mutex is held only long enough to find or insert a per-id
//! [`OnceLock`]. Building the device, including its connection handshake,
//! happens inside that cell: racing first callers for one id all block on
//! the same initializer and receive the same instance, while callers for
//! other ids are not held up by the handshake.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{error, info};

use crate::backend::{BackendFactory, SimulatorConfig, SimulatorFactory};
use crate::device::RfDevice;
use crate::error::DeviceError;

type DeviceCell = Arc<OnceLock<Arc<RfDevice>>>;

/// Process-wide owner of all devices
pub struct DeviceRegistry {
    factory: Box<dyn BackendFactory>,
    entries: Mutex<HashMap<String, DeviceCell>>,
    created: AtomicUsize,
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.device_ids())
            .field("created", &self.created_count())
            .finish()
    }
}

impl DeviceRegistry {
    /// Create a registry whose devices use backends from `factory`
    pub fn new(factory: impl BackendFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            entries: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Create a registry of simulated devices
    pub fn simulated(config: SimulatorConfig) -> Self {
        Self::new(SimulatorFactory::new(config))
    }

    /// Get the device for `id`, creating and connecting it on first use
    ///
    /// A device whose handshake fails is still registered (disconnected).
    pub fn get_or_create(&self, id: &str) -> Result<Arc<RfDevice>, DeviceError> {
        let cell = {
            let mut entries = self.entries.lock().map_err(|_| {
                error!("Device registry lock poisoned");
                DeviceError::Internal("device registry is unavailable".to_string())
            })?;
            Arc::clone(entries.entry(id.to_string()).or_default())
        };

        let device = cell.get_or_init(|| {
            info!("Creating new device instance: {}", id);
            let backend = self.factory.create(id);
            let device = RfDevice::new(id, backend);
            device.connect();
            self.created.fetch_add(1, Ordering::SeqCst);
            Arc::new(device)
        });

        Ok(Arc::clone(device))
    }

    /// Look up an existing device without creating it
    pub fn get(&self, id: &str) -> Option<Arc<RfDevice>> {
        let entries = self.entries.lock().ok()?;
        entries.get(id).and_then(|cell| cell.get()).cloned()
    }

    /// Ids of all created devices, sorted
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.entries.lock() {
            Ok(entries) => entries
                .iter()
                .filter(|(_, cell)| cell.get().is_some())
                .map(|(id, _)| id.clone())
                .collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }

    /// Number of created devices
    pub fn len(&self) -> usize {
        self.device_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of device instances ever built
    ///
    /// Never exceeds the number of distinct ids requested.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}
