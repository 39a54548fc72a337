use std::collections::HashMap;
use std::sync::Arc;

use smi_auth::AuthConfig;
use smi_job_store::JobStore;
use smi_object_store::ObjectStore;
use smi_protocol::{JobType, WorkerConfigs};

use crate::config::GatewayConfig;
use crate::gpu::GpuInfoProvider;
use crate::job_manager::JobManager;

/// Shared, explicitly-constructed process state (`spec.md` §9's "global
/// singletons" redesign note): built once in `main` and handed to every
/// handler via axum's `State` extractor, rather than living behind
/// implicit module-level statics.
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub job_store: Arc<dyn JobStore>,
    pub object_store: Arc<dyn ObjectStore>,
    pub worker_configs: Arc<WorkerConfigs>,
    pub job_managers: HashMap<JobType, Arc<JobManager>>,
    pub dispatchers: HashMap<JobType, smi_dispatcher::DispatcherClient>,
    pub gpu_info: Arc<dyn GpuInfoProvider>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn job_manager(&self, job_type: JobType) -> &Arc<JobManager> {
        self.job_managers
            .get(&job_type)
            .expect("every JobType has a registered JobManager at startup")
    }

    pub fn dispatcher(&self, job_type: JobType) -> &smi_dispatcher::DispatcherClient {
        self.dispatchers
            .get(&job_type)
            .expect("every JobType has a connected DispatcherClient at startup")
    }
}
