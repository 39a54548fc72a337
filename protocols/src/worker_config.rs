//! Static worker configuration, loaded once at startup from `workers.json`
//! under `CONFIG_PATH` (mirrors `spt/models/workers.py`'s
//! `WorkerConfigs.get_configs`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::job::JobType;

/// One entry in the static worker roster: which modality it serves, which
/// concrete `Worker` implementation to instantiate, and its resource
/// footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub worker_class: String,
    pub job_type: JobType,
    pub model: Option<String>,
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    #[serde(default)]
    pub gpu_ids: Vec<u32>,
}

fn default_max_workers() -> u32 {
    1
}

/// The full roster, keyed by `worker_class`, loaded once at startup and
/// held behind an `Arc` for the lifetime of the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfigs {
    pub workers: HashMap<String, WorkerConfig>,
}

impl WorkerConfigs {
    pub fn get(&self, worker_class: &str) -> Option<&WorkerConfig> {
        self.workers.get(worker_class)
    }

    pub fn for_job_type(&self, job_type: JobType) -> impl Iterator<Item = &WorkerConfig> {
        self.workers.values().filter(move |w| w.job_type == job_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_job_type_filters_roster_by_modality() {
        let mut workers = HashMap::new();
        workers.insert(
            "echo-chat".to_string(),
            WorkerConfig {
                worker_class: "echo-chat".into(),
                job_type: JobType::TextToText,
                model: None,
                max_workers: 2,
                gpu_ids: vec![],
            },
        );
        workers.insert(
            "echo-image".to_string(),
            WorkerConfig {
                worker_class: "echo-image".into(),
                job_type: JobType::TextToImage,
                model: None,
                max_workers: 1,
                gpu_ids: vec![],
            },
        );
        let configs = WorkerConfigs { workers };
        assert_eq!(configs.for_job_type(JobType::TextToText).count(), 1);
        assert_eq!(configs.for_job_type(JobType::Embeddings).count(), 0);
    }
}
