//! Service entrypoint: one process per job type, owning a [`WorkerPool`]
//! of in-process model Workers and exposing them to the Dispatcher over
//! gRPC (`spec.md` §3, §4.4).
//!
//! Which `worker_class`es this process serves is read from the same
//! `workers.json` roster the Gateway loads, filtered to the job type this
//! process was started for (`--job-type`); each matching entry gets a
//! deterministic reference Worker constructor registered under its
//! `worker_class` name (see [`smi_worker_service::workers`]).

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use smi_dispatcher::proto::generic_service_server::GenericServiceServer;
use smi_protocol::{JobType, WorkerConfigs};
use smi_worker_service::workers::{EchoChatWorker, EchoEmbeddingsWorker, EchoImageWorker, EchoSpeechWorker};
use smi_worker_service::{reaper, GenericServiceImpl, WorkerPool, WorkerPoolConfig};
use tonic::codec::CompressionEncoding;
use tonic::transport::Server;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "smi-worker-service", about = "Per-modality model Worker pool, served over gRPC")]
struct ServiceArgs {
    /// Which modality this process serves: one of `text_to_text`,
    /// `text_to_image`, `text_to_speech`, `speech_to_text`, `embeddings`.
    #[arg(long, env = "SERVICE_JOB_TYPE")]
    job_type: String,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9001")]
    listen_addr: String,

    #[arg(long, env = "CONFIG_PATH", default_value = "./config")]
    config_path: PathBuf,

    #[arg(long, env = "MAX_WORKERS_PER_CLASS", default_value_t = 4)]
    max_workers_per_class: usize,

    #[arg(long, env = "DEFAULT_KEEP_ALIVE_MINUTES", default_value_t = 5)]
    default_keep_alive_minutes: u32,
}

fn parse_job_type(raw: &str) -> JobType {
    JobType::ALL
        .into_iter()
        .find(|jt| jt.routing_key() == raw)
        .unwrap_or_else(|| panic!("unknown job type: {raw}"))
}

fn register_worker(pool: &mut WorkerPool, job_type: JobType, worker_class: String, model: String) {
    match job_type {
        JobType::TextToText => pool.register(worker_class, move || Box::new(EchoChatWorker::new(model.clone()))),
        JobType::TextToImage => pool.register(worker_class, move || Box::new(EchoImageWorker::new(model.clone()))),
        JobType::TextToSpeech | JobType::SpeechToText => {
            pool.register(worker_class, move || Box::new(EchoSpeechWorker::new(model.clone())))
        }
        JobType::Embeddings => pool.register(worker_class, move || Box::new(EchoEmbeddingsWorker::new(model.clone()))),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let args = ServiceArgs::parse();
    let job_type = parse_job_type(&args.job_type);

    let workers_path = args.config_path.join("workers.json");
    let raw = fs::read_to_string(&workers_path).unwrap_or_else(|e| panic!("failed to read {}: {e}", workers_path.display()));
    let worker_configs: WorkerConfigs =
        serde_json::from_str(&raw).unwrap_or_else(|e| panic!("failed to parse {}: {e}", workers_path.display()));

    let mut pool = WorkerPool::new(WorkerPoolConfig {
        max_workers_per_class: args.max_workers_per_class,
        default_keep_alive_minutes: args.default_keep_alive_minutes,
    });
    for config in worker_configs.for_job_type(job_type) {
        let model = config.model.clone().unwrap_or_else(|| config.worker_class.clone());
        register_worker(&mut pool, job_type, config.worker_class.clone(), model);
        tracing::info!(worker_class = %config.worker_class, %job_type, "registered worker class");
    }
    let pool = Arc::new(pool);

    reaper::spawn_reaper(pool.clone());

    let listen_addr: SocketAddr = args.listen_addr.parse().expect("LISTEN_ADDR must be a valid socket address");
    tracing::info!(%listen_addr, %job_type, "starting smi-worker-service");

    let service = GenericServiceServer::new(GenericServiceImpl::new(pool))
        .send_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Gzip);

    Server::builder()
        .add_service(service)
        .serve(listen_addr)
        .await
        .expect("gRPC server exited unexpectedly");
}
