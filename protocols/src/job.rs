//! Job identity, type classification, and status tracking.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a submitted job.
///
/// Printed as a bare UUID so it can be used directly as a Redis key
/// component and as a broker correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Modality classification for a job. Each variant maps to exactly one
/// broker routing key, one durable queue, and one Service/Worker family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    TextToText,
    TextToImage,
    TextToSpeech,
    SpeechToText,
    Embeddings,
}

impl JobType {
    /// All job types, in priority-of-registration order. Used to spin up
    /// one producer/consumer pair per type at startup.
    pub const ALL: [JobType; 5] = [
        JobType::TextToText,
        JobType::TextToImage,
        JobType::TextToSpeech,
        JobType::SpeechToText,
        JobType::Embeddings,
    ];

    /// Broker routing key / durable queue name for this job type.
    pub fn routing_key(self) -> &'static str {
        match self {
            JobType::TextToText => "text_to_text",
            JobType::TextToImage => "text_to_image",
            JobType::TextToSpeech => "text_to_speech",
            JobType::SpeechToText => "speech_to_text",
            JobType::Embeddings => "embeddings",
        }
    }

    /// Object-store bucket name for this job type's overflow results.
    /// Shared by the write path (Job Manager) and the prune path
    /// (Scheduler) so the two never disagree about where a type's blobs
    /// live.
    pub fn bucket_name(self) -> &'static str {
        match self {
            JobType::TextToText => "smi-text",
            JobType::TextToImage => "smi-images",
            JobType::TextToSpeech => "smi-audio",
            JobType::SpeechToText => "smi-audio",
            JobType::Embeddings => "smi-embeddings",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.routing_key())
    }
}

/// Priority level a job is submitted with. Maps to an AMQP message
/// priority understood by a queue declared with `x-max-priority: 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_amqp_priority(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 5,
            Priority::High => 10,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        // The API Gateway defaults a request's priority header to `Low`
        // when absent (`spec.md` §4.1), not `Normal`.
        Priority::Low
    }
}

impl std::str::FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" | "Low" => Ok(Priority::Low),
            "normal" | "Normal" => Ok(Priority::Normal),
            "high" | "High" => Ok(Priority::High),
            _ => Err(()),
        }
    }
}

/// Where a job's result artifact (if any) is deposited. Mirrors the
/// `x-smi-storage`/`storage` header's two accepted values (`spec.md`
/// §4.1); everything else is rejected as `AuthFailed` before a `Job` is
/// ever constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    Local,
    S3,
}

impl Default for Storage {
    fn default() -> Self {
        Storage::Local
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Local => write!(f, "local"),
            Storage::S3 => write!(f, "s3"),
        }
    }
}

impl std::str::FromStr for Storage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" | "Local" => Ok(Storage::Local),
            "s3" | "S3" => Ok(Storage::S3),
            _ => Err(()),
        }
    }
}

/// Lifecycle status of a job. Transitions are monotonic: once a job
/// reaches `Completed` or `Failed` it never changes status again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    InProgress,
    Completed,
    Failed,
    /// Never persisted; returned to a caller when no status record exists
    /// for the requested id, e.g. after `get_result` has already consumed
    /// it once (`spec.md` §8's idempotence property).
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A submitted unit of work as tracked by the Job Manager and Job Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub priority: Priority,
    pub worker_class: String,
    pub keep_alive: u32,
    pub storage: Storage,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl Job {
    pub fn new(job_type: JobType, worker_class: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            job_type,
            priority: Priority::default(),
            worker_class: worker_class.into(),
            keep_alive: 0,
            storage: Storage::default(),
            submitted_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_terminal_classification() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn priority_ordering_matches_amqp_weight() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
        assert_eq!(Priority::High.as_amqp_priority(), 10);
    }

    #[test]
    fn job_id_round_trips_through_display_and_from_str() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn bucket_name_is_stable_for_write_and_prune_paths() {
        for jt in JobType::ALL {
            assert_eq!(jt.bucket_name(), jt.bucket_name());
        }
        assert_eq!(JobType::TextToSpeech.bucket_name(), JobType::SpeechToText.bucket_name());
    }

    #[test]
    fn priority_defaults_to_low_per_the_header_contract() {
        assert_eq!(Priority::default(), Priority::Low);
    }

    #[test]
    fn priority_header_value_parses_the_three_accepted_levels() {
        assert_eq!("Low".parse::<Priority>(), Ok(Priority::Low));
        assert_eq!("normal".parse::<Priority>(), Ok(Priority::Normal));
        assert_eq!("High".parse::<Priority>(), Ok(Priority::High));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn storage_parses_case_insensitively_and_rejects_anything_else() {
        assert_eq!("local".parse::<Storage>(), Ok(Storage::Local));
        assert_eq!("S3".parse::<Storage>(), Ok(Storage::S3));
        assert!("minio".parse::<Storage>().is_err());
        assert_eq!(Storage::default(), Storage::Local);
    }

    #[test]
    fn new_job_defaults_to_local_storage() {
        let job = Job::new(JobType::TextToText, "echo-chat");
        assert_eq!(job.storage, Storage::Local);
    }
}
