//! Explicit execution context: which device tensors live on and which seed
//! drives parameter initialisation and shuffling.

use candle_core::Device;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where to run tensor computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use an accelerator if one was compiled in and is present, else CPU
    #[default]
    Auto,

    /// Always run on the CPU
    Cpu,
}

/// Execution context handed to models and the trainer.
///
/// Nothing in the workspace picks a device on its own; callers build one of
/// these and pass it down.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    device: Device,
    seed: u64,
}

impl ExecutionContext {
    /// Create a context for the requested device preference.
    pub fn new(preference: DevicePreference, seed: u64) -> Self {
        let device = Self::select_device(preference);
        debug!("Using device: {:?}", device);
        Self { device, seed }
    }

    /// CPU-only context. Used by tests and deterministic runs.
    pub fn cpu(seed: u64) -> Self {
        Self {
            device: Device::Cpu,
            seed,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Select the best available device.
    fn select_device(preference: DevicePreference) -> Device {
        if preference == DevicePreference::Cpu {
            return Device::Cpu;
        }

        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("CUDA device available");
                    return device;
                }
                Err(e) => {
                    debug!("CUDA not available: {}, falling back to CPU", e);
                }
            }
        }

        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Metal device available");
                    return device;
                }
                Err(e) => {
                    debug!("Metal not available: {}, falling back to CPU", e);
                }
            }
        }

        info!("Running on CPU");
        Device::Cpu
    }
}
