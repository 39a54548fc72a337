//! `GET /v1/gpu/info` telemetry, per `spec.md` §6 and the concrete-GPU-
//! sampling exclusion in §1/§9. Concrete NVML sampling is a peripheral
//! concern this workspace doesn't implement; `GpuInfoProvider` is the
//! pluggable seam a deployment wires a real collector into.

use async_trait::async_trait;
use smi_protocol::gpu::GpusInfo;

#[async_trait]
pub trait GpuInfoProvider: Send + Sync {
    async fn gpu_info(&self) -> GpusInfo;
}

/// Stand-in implementation returning an explicit "unavailable" error
/// rather than shelling out to `nvidia-smi`/NVML.
#[derive(Debug, Default)]
pub struct UnavailableGpuInfoProvider;

#[async_trait]
impl GpuInfoProvider for UnavailableGpuInfoProvider {
    async fn gpu_info(&self) -> GpusInfo {
        GpusInfo {
            gpus: Vec::new(),
            error: Some("telemetry unavailable".to_string()),
        }
    }
}
