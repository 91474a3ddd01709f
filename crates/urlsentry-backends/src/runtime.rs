//! Tensor plumbing shared by the bundled backends.

use candle_core::Tensor;

use crate::Device;

/// Sparse feature vector: `(column, value)` pairs.
pub type SparseRow = Vec<(usize, f64)>;

/// Maps a requested [`Device`] onto a candle device.
///
/// A gpu request uses CUDA device 0 when the crate is built with the `cuda`
/// feature and a device is present; otherwise it logs and runs on cpu. The
/// returned [`Device`] is the one actually in use.
pub fn select_device(
    backend: &str,
    requested: Device,
) -> anyhow::Result<(Device, candle_core::Device)> {
    match requested {
        Device::Cpu => Ok((Device::Cpu, candle_core::Device::Cpu)),
        Device::Gpu => {
            let device = candle_core::Device::cuda_if_available(0)?;
            if device.is_cuda() {
                Ok((Device::Gpu, device))
            } else {
                tracing::warn!(
                    target: "urlsentry_backends",
                    backend,
                    "gpu requested but cuda is unavailable; using cpu"
                );
                Ok((Device::Cpu, candle_core::Device::Cpu))
            }
        }
    }
}

/// Densifies sparse rows into a `(rows, dims)` f32 matrix.
pub fn dense_rows(
    rows: &[SparseRow],
    dims: usize,
    device: &candle_core::Device,
) -> anyhow::Result<Tensor> {
    let mut data = vec![0f32; rows.len() * dims];
    for (r, row) in rows.iter().enumerate() {
        for &(index, value) in row {
            if index >= dims {
                anyhow::bail!("feature index {index} out of range for {dims} inputs");
            }
            data[r * dims + index] = value as f32;
        }
    }
    Ok(Tensor::from_vec(data, (rows.len(), dims), device)?)
}

/// Reads a `(1, 2)` probability tensor back as `[safe, malicious]`.
pub(crate) fn pair_from(probs: &Tensor) -> anyhow::Result<[f64; 2]> {
    let row = probs.squeeze(0)?.to_vec1::<f32>()?;
    match row.as_slice() {
        [safe, malicious] => Ok([f64::from(*safe), f64::from(*malicious)]),
        other => anyhow::bail!("expected 2 class probabilities, got {}", other.len()),
    }
}
