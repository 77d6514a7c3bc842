use candle_core::Device;

use crate::error::ModelError;

/// Parse a device string into a candle [`Device`].
///
/// Accepted forms (case-insensitive): `cpu`, `cuda` / `gpu` (ordinal 0) and
/// `cuda:N`.
///
/// # Errors
///
/// Returns [`ModelError::UnavailableDevice`] if CUDA is requested but this
/// build has no CUDA support or the device cannot be opened, and
/// [`ModelError::InvalidDevice`] for anything unrecognised.
pub fn parse_device(device: &str) -> Result<Device, ModelError> {
    let normalized = device.trim().to_lowercase();
    match normalized.as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" | "gpu" => open_cuda(device, 0),
        s => {
            let ordinal = s
                .strip_prefix("cuda:")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ModelError::InvalidDevice(device.to_string()))?;
            open_cuda(device, ordinal)
        }
    }
}

fn open_cuda(requested: &str, ordinal: usize) -> Result<Device, ModelError> {
    if !candle_core::utils::cuda_is_available() {
        return Err(ModelError::UnavailableDevice {
            device: requested.to_string(),
            reason: "CUDA support not enabled; rebuild with --features cuda".to_string(),
        });
    }
    let device = Device::new_cuda(ordinal).map_err(|e| ModelError::UnavailableDevice {
        device: requested.to_string(),
        reason: e.to_string(),
    })?;
    tracing::debug!(ordinal, "opened CUDA device");
    Ok(device)
}
