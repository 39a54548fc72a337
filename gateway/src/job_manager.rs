//! Job Manager: per-type broker producer+consumer and Job Store writer,
//! per `spec.md` §4.2.

use std::sync::Arc;
use std::time::Duration;

use smi_broker::{Broker, MessageHeaders, Producer};
use smi_dispatcher::DispatcherClient;
use smi_job_store::{JobRecord, JobStore};
use smi_object_store::ObjectStore;
use smi_protocol::{Envelope, Job, JobId, JobStatus, JobType};
use tracing::{error, info, warn};

const BROKER_RETRY_DELAY: Duration = Duration::from_secs(5);
const MAX_CONSECUTIVE_FAILURES: u32 = 20;
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// What to invoke on the Service once a job's message is pulled off the
/// broker: the `(remote_class, remote_method, request_model_class,
/// response_model_class)` quadruple the Dispatcher needs to build the RPC
/// envelope (`spec.md` §4.3).
#[derive(Debug, Clone)]
pub struct DispatchTarget {
    pub remote_class: String,
    pub remote_method: String,
    pub request_model_class: String,
    pub response_model_class: String,
}

pub struct JobManager {
    job_type: JobType,
    producer: Producer,
    dispatcher: DispatcherClient,
    job_store: Arc<dyn JobStore>,
    object_store: Arc<dyn ObjectStore>,
    storage_ttl_days: u32,
}

impl JobManager {
    pub async fn new(
        broker: &Broker,
        job_type: JobType,
        dispatcher: DispatcherClient,
        job_store: Arc<dyn JobStore>,
        object_store: Arc<dyn ObjectStore>,
        storage_ttl_days: u32,
    ) -> Result<Self, smi_broker::BrokerError> {
        let producer = broker.producer(job_type).await?;
        Ok(Self {
            job_type,
            producer,
            dispatcher,
            job_store,
            object_store,
            storage_ttl_days,
        })
    }

    /// Moves this job type's large binary artifact into the Object Store
    /// when the job was submitted with `storage=S3`, mutating the decoded
    /// envelope payload in place before it is persisted as the job's
    /// result. This is the asynchronous-delivery counterpart of
    /// `handlers::common::StorageAware::store_if_large`: that trait only
    /// runs on the synchronous/poll/direct-fetch paths, which already hold
    /// a typed response, whereas `receive` here only ever sees the raw
    /// JSON envelope off the broker (`spec.md` §8 scenario 2).
    async fn persist_artifact_if_s3(&self, job_id: JobId, storage: &str, payload: &mut serde_json::Value) {
        persist_artifact_if_s3(
            self.object_store.as_ref(),
            self.job_type,
            self.storage_ttl_days,
            job_id,
            storage,
            payload,
        )
        .await
    }

    /// `spec.md` §4.2 `submit`: set `Pending`, publish, then mark
    /// `Queued` on success or `Failed` on a publish error. Never leaves
    /// the job without a status record.
    pub async fn submit(
        &self,
        job: &Job,
        target: &DispatchTarget,
        payload: Vec<u8>,
    ) -> Result<(), smi_job_store::JobStoreError> {
        self.job_store.set_status(job.id, JobRecord::new(JobStatus::Pending)).await?;

        let headers = MessageHeaders {
            job_id: job.id,
            job_type: self.job_type,
            job_model_id: job.worker_class.clone(),
            job_remote_class: target.remote_class.clone(),
            job_remote_method: target.remote_method.clone(),
            job_request_model_class: target.request_model_class.clone(),
            job_response_model_class: target.response_model_class.clone(),
            job_storage: job.storage.to_string(),
            job_keep_alive: job.keep_alive,
        };

        match self.producer.publish(job.priority, headers, &payload).await {
            Ok(()) => {
                self.job_store.set_status(job.id, JobRecord::new(JobStatus::Queued)).await?;
                Ok(())
            }
            Err(e) => {
                self.job_store
                    .set_status(job.id, JobRecord::failed(format!("broker publish failed: {e}")))
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn get_status(&self, id: JobId) -> Result<JobStatus, smi_job_store::JobStoreError> {
        Ok(self
            .job_store
            .get_status(id)
            .await?
            .map(|r| r.status)
            .unwrap_or(JobStatus::Unknown))
    }

    /// Like [`Self::get_status`] but keeps the record's `message`, so a
    /// caller surfacing a `Failed` job to a client can include the
    /// diagnostic rather than just the bare status (`spec.md` §7's
    /// "user-visible failures always carry a non-empty message").
    pub async fn get_record(&self, id: JobId) -> Result<JobRecord, smi_job_store::JobStoreError> {
        Ok(self
            .job_store
            .get_status(id)
            .await?
            .unwrap_or_else(|| JobRecord::new(JobStatus::Unknown)))
    }

    /// `spec.md` §4.2 `get_result`: reads the result record and deletes
    /// both records on success, so a repeated call after the first
    /// success reports `Unknown` (the idempotence property in §8).
    pub async fn get_result(&self, id: JobId) -> Result<Option<Vec<u8>>, smi_job_store::JobStoreError> {
        let result = self.job_store.get_result(id).await?;
        if result.is_some() {
            self.job_store.delete(id).await?;
        }
        Ok(result)
    }

    /// One delivery's worth of `receive` (`spec.md` §4.2): mark
    /// `InProgress`, invoke the Dispatcher, write a terminal status, then
    /// ack. The delivery is acked only after the terminal write lands —
    /// a crash between dispatch and the status write simply redelivers
    /// the message, and a duplicate delivery re-running this is
    /// idempotent because the status write always ends in the same
    /// terminal state for the same input.
    async fn handle_delivery(&self, delivery: &smi_broker::Delivery) {
        let headers = &delivery.headers;
        let job_id = headers.job_id;

        if let Err(e) = self.job_store.set_status(job_id, JobRecord::new(JobStatus::InProgress)).await {
            error!(%job_id, error = %e, "failed to write in-progress status");
            let _ = delivery.reject_requeue().await;
            return;
        }

        let request_envelope = Envelope {
            response_model_class: headers.job_request_model_class.clone(),
            payload: match serde_json::from_slice(delivery.body()) {
                Ok(v) => v,
                Err(e) => {
                    let _ = self
                        .job_store
                        .set_status(job_id, JobRecord::failed(format!("malformed payload: {e}")))
                        .await;
                    let _ = delivery.ack().await;
                    return;
                }
            },
        };

        let outcome = self
            .dispatcher
            .execute_job(
                job_id,
                &headers.job_model_id,
                &headers.job_remote_class,
                &headers.job_remote_method,
                request_envelope,
            )
            .await;

        match outcome {
            Ok(envelope) if envelope.is_error() => {
                let message = envelope
                    .into_error()
                    .map(|e| e.message)
                    .unwrap_or_else(|| "worker failed".to_string());
                let _ = self.job_store.set_status(job_id, JobRecord::failed(message)).await;
            }
            Ok(mut envelope) => {
                self.persist_artifact_if_s3(job_id, &headers.job_storage, &mut envelope.payload).await;
                let encoded = smi_job_store::encode_result(&envelope.payload).unwrap_or_default();
                if self.job_store.set_result(job_id, &encoded).await.is_ok() {
                    let _ = self.job_store.set_status(job_id, JobRecord::new(JobStatus::Completed)).await;
                } else {
                    let _ = self
                        .job_store
                        .set_status(job_id, JobRecord::failed("failed to persist result"))
                        .await;
                }
            }
            Err(e) => {
                let _ = self
                    .job_store
                    .set_status(job_id, JobRecord::failed(format!("dispatch failed: {e}")))
                    .await;
            }
        }

        let _ = delivery.ack().await;
    }

    async fn run_consumer_once(&self, broker: &Broker) -> Result<(), smi_broker::BrokerError> {
        let mut consumer = broker.consumer(self.job_type, &format!("smi-gateway-{}", self.job_type)).await?;
        loop {
            match consumer.next().await? {
                Some(delivery) => self.handle_delivery(&delivery).await,
                None => return Ok(()),
            }
        }
    }
}

/// Free-function core of [`JobManager::persist_artifact_if_s3`], split out
/// so it can be exercised against an [`ObjectStore`] directly in tests
/// without standing up a full `JobManager` (producer/dispatcher require a
/// live broker/RPC connection).
async fn persist_artifact_if_s3(
    object_store: &dyn ObjectStore,
    job_type: JobType,
    storage_ttl_days: u32,
    job_id: JobId,
    storage: &str,
    payload: &mut serde_json::Value,
) {
    if storage != "s3" {
        return;
    }
    let (field, extension) = match job_type {
        JobType::TextToImage => ("image_base64", "png"),
        JobType::TextToSpeech => ("audio", "wav"),
        _ => return,
    };
    let Some(encoded) = payload.get(field).and_then(|v| v.as_str()).map(str::to_string) else {
        return;
    };

    use base64::Engine;
    let bytes = match base64::engine::general_purpose::STANDARD.decode(&encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%job_id, error = %e, "failed to decode artifact for object-store upload");
            return;
        }
    };

    let bucket = job_type.bucket_name();
    let key = format!("{job_id}.{extension}");
    if let Err(e) = object_store.put(bucket, &key, bytes::Bytes::from(bytes)).await {
        warn!(%job_id, error = %e, "failed to upload artifact to object store");
        return;
    }

    // `TextToImageResponse`'s wire shape is an untagged `{image_base64}` /
    // `{url}` pair, so the inline field is replaced with the signed URL.
    // `TextToSpeechResponse` has no URL variant; the upload exists purely
    // so `fetch_raw_bytes`'s `Accept: audio/wav` path has something to
    // read, and the inline bytes are left in place.
    if job_type == JobType::TextToImage {
        match object_store.signed_url(bucket, &key, storage_ttl_days).await {
            Ok(url) => {
                if let Some(obj) = payload.as_object_mut() {
                    obj.remove(field);
                    obj.insert("url".to_string(), serde_json::Value::String(url));
                }
            }
            Err(e) => warn!(%job_id, error = %e, "failed to presign uploaded artifact"),
        }
    }
}

/// Drives one type's consumer for the lifetime of the process, restarting
/// it with a bounded backoff whenever the broker connection drops — the
/// "supervisor loop that polls liveness every 10 s" from `spec.md` §4.2.
/// After 20 consecutive failures the connection is logged as fatal but the
/// loop keeps retrying, since a human operator restarting the broker is
/// the only recovery path at that point.
pub fn spawn_consumer_supervisor(manager: Arc<JobManager>, broker: Arc<Broker>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut consecutive_failures: u32 = 0;
        loop {
            match manager.run_consumer_once(&broker).await {
                Ok(()) => {
                    warn!(job_type = %manager.job_type, "consumer channel closed, restarting");
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    error!(
                        job_type = %manager.job_type,
                        error = %e,
                        consecutive_failures,
                        "consumer failed"
                    );
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        error!(job_type = %manager.job_type, "broker connection considered fatal");
                    }
                }
            }
            tokio::time::sleep(BROKER_RETRY_DELAY).await;
            tokio::time::sleep(LIVENESS_POLL_INTERVAL.saturating_sub(BROKER_RETRY_DELAY)).await;
            info!(job_type = %manager.job_type, "restarting consumer");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smi_object_store::LocalObjectStore;

    #[tokio::test]
    async fn local_storage_leaves_the_payload_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let mut payload = serde_json::json!({"model": "echo-image", "image_base64": "eA=="});
        persist_artifact_if_s3(&store, JobType::TextToImage, 7, JobId::new(), "local", &mut payload).await;
        assert_eq!(payload["image_base64"], "eA==");
        assert!(payload.get("url").is_none());
    }

    #[tokio::test]
    async fn s3_storage_uploads_the_image_and_rewrites_the_inline_field_to_a_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let job_id = JobId::new();
        let mut payload = serde_json::json!({"model": "echo-image", "image_base64": "eA=="});

        persist_artifact_if_s3(&store, JobType::TextToImage, 7, job_id, "s3", &mut payload).await;

        assert!(payload.get("image_base64").is_none());
        let url = payload["url"].as_str().unwrap();
        assert!(url.ends_with(&format!("{job_id}.png")));
        let stored = store.get(JobType::TextToImage.bucket_name(), &format!("{job_id}.png")).await.unwrap();
        assert_eq!(&stored[..], b"x");
    }

    #[tokio::test]
    async fn s3_storage_uploads_audio_but_keeps_the_inline_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let job_id = JobId::new();
        let mut payload = serde_json::json!({"model": "echo-tts", "audio": "eA==", "sample_rate_hz": 16000});

        persist_artifact_if_s3(&store, JobType::TextToSpeech, 7, job_id, "s3", &mut payload).await;

        assert_eq!(payload["audio"], "eA==");
        let stored = store.get(JobType::TextToSpeech.bucket_name(), &format!("{job_id}.wav")).await.unwrap();
        assert_eq!(&stored[..], b"x");
    }

    #[tokio::test]
    async fn job_types_without_an_artifact_field_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let mut payload = serde_json::json!({"message": {"role": "assistant", "content": "hi"}});
        persist_artifact_if_s3(&store, JobType::TextToText, 7, JobId::new(), "s3", &mut payload).await;
        assert_eq!(payload["message"]["content"], "hi");
    }
}
