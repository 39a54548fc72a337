//! GPU telemetry types backing `GET /v1/gpu/info`.
//!
//! Mirrors `spt/utils.py`'s `gpu_infos()`/`GPUsInfo` shape. Concrete NVML
//! sampling is out of scope; see `GpuInfoProvider` in the gateway crate for
//! the pluggable collection point.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    pub index: u32,
    pub name: String,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub utilization_pct: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpusInfo {
    pub gpus: Vec<GpuInfo>,
    #[serde(default)]
    pub error: Option<String>,
}
