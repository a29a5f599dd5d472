//! Compute device selection.
//!
//! The device is chosen by an explicit [`DeviceSelector`] handed to the
//! [`Assembler`](crate::assemble::Assembler), so tests can force a backend.

use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use tracing::debug;

use crate::error::GenofuseError;

/// Which compute backend to place tensors on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The fastest available backend: CUDA, then Metal, then CPU.
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl DeviceSelector {
    /// Resolve the selector to a device. This is evaluated on every call.
    ///
    /// `Auto` never fails; an explicitly requested accelerator that is unavailable (or
    /// not compiled in with the `cuda`/`metal` features) is a [`GenofuseError::Device`].
    pub fn select(&self) -> Result<Device, GenofuseError> {
        match self {
            DeviceSelector::Auto => Ok(auto_device()),
            DeviceSelector::Cpu => Ok(Device::Cpu),
            DeviceSelector::Cuda(ordinal) => Device::new_cuda(*ordinal)
                .map_err(|e| GenofuseError::Device(format!("CUDA device {}: {}", ordinal, e))),
            DeviceSelector::Metal(ordinal) => Device::new_metal(*ordinal)
                .map_err(|e| GenofuseError::Device(format!("Metal device {}: {}", ordinal, e))),
        }
    }
}

fn auto_device() -> Device {
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(e) => debug!("CUDA not available: {}, trying next backend", e),
        }
    }
    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return device,
            Err(e) => debug!("Metal not available: {}, falling back to CPU", e),
        }
    }
    Device::Cpu
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Auto => write!(f, "auto"),
            DeviceSelector::Cpu => write!(f, "cpu"),
            DeviceSelector::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
            DeviceSelector::Metal(ordinal) => write!(f, "metal:{}", ordinal),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = GenofuseError;

    /// Parse `auto`, `cpu`, `cuda`, `cuda:<n>`, `metal` or `metal:<n>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (backend, ordinal) = match s.split_once(':') {
            Some((backend, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| GenofuseError::Device(format!("invalid device ordinal in '{}'", s)))?;
                (backend, Some(ordinal))
            }
            None => (s, None),
        };
        match (backend.to_ascii_lowercase().as_str(), ordinal) {
            ("auto", None) => Ok(DeviceSelector::Auto),
            ("cpu", None) => Ok(DeviceSelector::Cpu),
            ("cuda", ordinal) => Ok(DeviceSelector::Cuda(ordinal.unwrap_or(0))),
            ("metal", ordinal) => Ok(DeviceSelector::Metal(ordinal.unwrap_or(0))),
            _ => Err(GenofuseError::Device(format!(
                "unknown device '{}', expected auto, cpu, cuda[:n] or metal[:n]",
                s
            ))),
        }
    }
}
