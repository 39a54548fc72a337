//! Environment configuration, per `spec.md` §6's enumerated variable list.
//! Every field is overridable via CLI flag or environment variable
//! (`clap`'s `env` feature), matching the original's `.env`-driven
//! settings module.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "smi-gateway", about = "Inference gateway and dispatcher")]
pub struct GatewayConfig {
    #[arg(long, env = "ROOT_DOMAIN", default_value = "localhost")]
    pub root_domain: String,

    #[arg(long, env = "CONFIG_PATH", default_value = "./config")]
    pub config_path: PathBuf,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    #[arg(long, env = "BROKER_HOST", default_value = "localhost")]
    pub broker_host: String,
    #[arg(long, env = "BROKER_PORT", default_value_t = 5672)]
    pub broker_port: u16,
    #[arg(long, env = "BROKER_USER", default_value = "guest")]
    pub broker_user: String,
    #[arg(long, env = "BROKER_PASSWORD", default_value = "guest")]
    pub broker_password: String,

    #[arg(long, env = "CACHE_HOST", default_value = "localhost")]
    pub cache_host: String,
    #[arg(long, env = "CACHE_PORT", default_value_t = 6379)]
    pub cache_port: u16,

    /// `job_type -> host:port` gRPC address, one per modality. Parsed from
    /// `SERVICE_ADDR_<TYPE>` env vars at startup; see
    /// [`GatewayConfig::service_addresses`].
    #[arg(long, env = "SERVICE_ADDR_TEXT_TO_TEXT", default_value = "http://localhost:9001")]
    pub service_addr_text_to_text: String,
    #[arg(long, env = "SERVICE_ADDR_TEXT_TO_IMAGE", default_value = "http://localhost:9002")]
    pub service_addr_text_to_image: String,
    #[arg(long, env = "SERVICE_ADDR_TEXT_TO_SPEECH", default_value = "http://localhost:9003")]
    pub service_addr_text_to_speech: String,
    #[arg(long, env = "SERVICE_ADDR_SPEECH_TO_TEXT", default_value = "http://localhost:9004")]
    pub service_addr_speech_to_text: String,
    #[arg(long, env = "SERVICE_ADDR_EMBEDDINGS", default_value = "http://localhost:9005")]
    pub service_addr_embeddings: String,

    #[arg(long, env = "POLLING_DEADLINE_SECONDS", default_value_t = 500)]
    pub polling_deadline_seconds: u64,

    #[arg(long, env = "DEFAULT_KEEP_ALIVE_MINUTES", default_value_t = 5)]
    pub default_keep_alive_minutes: u32,

    #[arg(long, env = "STORAGE_ENDPOINT", default_value = "")]
    pub storage_endpoint: String,
    #[arg(long, env = "STORAGE_ACCESS_KEY", default_value = "")]
    pub storage_access_key: String,
    #[arg(long, env = "STORAGE_SECRET_KEY", default_value = "")]
    pub storage_secret_key: String,
    #[arg(long, env = "STORAGE_SECURE", default_value_t = true)]
    pub storage_secure: bool,
    #[arg(long, env = "STORAGE_TTL_DAYS", default_value_t = 7)]
    pub storage_ttl_days: u32,

    #[arg(long, env = "TEMP_DIR", default_value = "/tmp/smi")]
    pub temp_dir: PathBuf,

    #[arg(long, env = "STREAM_PORT_LO", default_value_t = 30000)]
    pub stream_port_lo: u16,
    #[arg(long, env = "STREAM_PORT_HI", default_value_t = 31000)]
    pub stream_port_hi: u16,

    #[arg(long, env = "DEFAULT_SERVICES_NETWORK", default_value = "smi-net")]
    pub default_services_network: String,

    #[arg(long, env = "SMI_API_KEYS", default_value = "dev-key")]
    pub api_keys: String,
}

impl GatewayConfig {
    pub fn amqp_url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.broker_user, self.broker_password, self.broker_host, self.broker_port
        )
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.cache_host, self.cache_port)
    }

    pub fn service_address(&self, job_type: smi_protocol::JobType) -> &str {
        use smi_protocol::JobType;
        match job_type {
            JobType::TextToText => &self.service_addr_text_to_text,
            JobType::TextToImage => &self.service_addr_text_to_image,
            JobType::TextToSpeech => &self.service_addr_text_to_speech,
            JobType::SpeechToText => &self.service_addr_speech_to_text,
            JobType::Embeddings => &self.service_addr_embeddings,
        }
    }

    pub fn workers_json_path(&self) -> PathBuf {
        self.config_path.join("workers.json")
    }

    /// The bare hostname a Service for `job_type` is reachable at, with
    /// the gRPC scheme and port stripped. Used by the Streaming Bridge to
    /// open a ZeroMQ connection to the same host the Dispatcher already
    /// talks gRPC to.
    pub fn service_host(&self, job_type: smi_protocol::JobType) -> &str {
        let addr = self.service_address(job_type);
        let without_scheme = addr.split("://").last().unwrap_or(addr);
        without_scheme.split(':').next().unwrap_or(without_scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_host_strips_scheme_and_port() {
        let config = GatewayConfig::parse_from(["smi-gateway", "--service-addr-speech-to-text", "http://stt-svc:9004"]);
        assert_eq!(config.service_host(smi_protocol::JobType::SpeechToText), "stt-svc");
    }
}
