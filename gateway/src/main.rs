//! API Gateway entrypoint: loads configuration, wires up the Job Store,
//! Object Store, Broker, and per-type Job Managers/Dispatcher clients into
//! an [`AppState`], spawns the consumer supervisors and the pruning
//! Scheduler, then serves the HTTP/WebSocket router (`spec.md` §3, §9).

mod config;
mod error;
mod gpu;
mod handlers;
mod job_manager;
mod routes;
mod scheduler;
mod state;
mod ws;

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use smi_auth::{AuditLogger, AuthConfig, AuthState};
use smi_broker::{Broker, BrokerConfig};
use smi_job_store::{JobStore, RedisJobStore};
use smi_object_store::{LocalObjectStore, ObjectStore, S3ObjectStore};
use smi_protocol::{JobType, WorkerConfigs};
use tracing_subscriber::EnvFilter;

use config::GatewayConfig;
use gpu::UnavailableGpuInfoProvider;
use job_manager::JobManager;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = GatewayConfig::parse();

    let worker_configs = load_worker_configs(&config);
    let auth = load_auth_config(&config);

    let job_store: Arc<dyn JobStore> = Arc::new(
        RedisJobStore::new(&config.redis_url(), 16, None).expect("failed to build redis job store pool"),
    );

    let object_store: Arc<dyn ObjectStore> = if config.storage_endpoint.is_empty() {
        Arc::new(LocalObjectStore::new(config.temp_dir.join("objects")))
    } else {
        Arc::new(S3ObjectStore::from_env().await)
    };

    let broker = Arc::new(
        Broker::connect(BrokerConfig::new(config.amqp_url()))
            .await
            .expect("failed to connect to the broker"),
    );

    let mut job_managers = HashMap::new();
    let mut dispatchers = HashMap::new();
    for job_type in JobType::ALL {
        let dispatcher = smi_dispatcher::DispatcherClient::connect(config.service_address(job_type).to_string())
            .await
            .unwrap_or_else(|e| panic!("failed to connect to the {job_type} service: {e}"));
        let manager = Arc::new(
            JobManager::new(
                &broker,
                job_type,
                dispatcher.clone(),
                job_store.clone(),
                object_store.clone(),
                config.storage_ttl_days,
            )
            .await
            .unwrap_or_else(|e| panic!("failed to build the {job_type} job manager: {e}")),
        );
        job_manager::spawn_consumer_supervisor(manager.clone(), broker.clone());
        job_managers.insert(job_type, manager);
        dispatchers.insert(job_type, dispatcher);
    }

    let config = Arc::new(config);
    let state = Arc::new(AppState {
        config: config.clone(),
        job_store,
        object_store,
        worker_configs: Arc::new(worker_configs),
        job_managers,
        dispatchers,
        gpu_info: Arc::new(UnavailableGpuInfoProvider),
        auth: auth.clone(),
    });

    scheduler::spawn_scheduler(state.clone());

    let auth_state = AuthState { config: auth, audit: Arc::new(AuditLogger::default()) };
    let app = routes::build_router(state, auth_state).layer((
        tower_http::trace::TraceLayer::new_for_http(),
        tower_http::request_id::SetRequestIdLayer::x_request_id(tower_http::request_id::MakeRequestUuid),
        tower_http::cors::CorsLayer::permissive(),
    ));

    let listen_addr: SocketAddr = config.listen_addr.parse().expect("LISTEN_ADDR must be a valid socket address");
    tracing::info!(%listen_addr, "starting smi-gateway");
    let listener = tokio::net::TcpListener::bind(listen_addr).await.expect("failed to bind listen address");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server exited unexpectedly");
}

/// Loads the static worker roster from `workers.json` under `CONFIG_PATH`.
/// Missing or malformed config is a startup failure, not a degraded mode:
/// an empty roster would silently 404 every request.
fn load_worker_configs(config: &GatewayConfig) -> WorkerConfigs {
    let path = config.workers_json_path();
    let raw = fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

/// Loads the API key roster from `CONFIG_PATH/auth_keys.json` if present,
/// falling back to the single `SMI_API_KEYS` environment value otherwise
/// (mirroring the original's single shared `API_KEY` variable).
fn load_auth_config(config: &GatewayConfig) -> Arc<AuthConfig> {
    let path = config.config_path.join("auth_keys.json");
    if let Ok(raw) = fs::read_to_string(&path) {
        return Arc::new(serde_json::from_str(&raw).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display())));
    }
    Arc::new(AuthConfig::single_key(config.api_keys.clone()))
}
