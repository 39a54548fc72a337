//! The Message Broker: a durable, per-message-priority queue that fans
//! jobs out from the Job Manager producers into per-type work channels
//! consumed by the Job Manager's consumer side.
//!
//! One exchange (`smi-requests`, direct) carries every job type; each
//! type gets its own durable queue bound with a routing key equal to the
//! type's name, declared with `x-max-priority: 10` so AMQP itself handles
//! the "higher-priority messages may overtake lower-priority ones"
//! ordering guarantee from `spec.md` §5 — this crate never has to
//! reorder a delivery queue by hand.

mod delivery;
mod error;
mod headers;

pub use delivery::{Consumer, Delivery};
pub use error::BrokerError;
pub use headers::MessageHeaders;

use lapin::{
    options::{BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use smi_protocol::{JobType, Priority};
use tracing::info;

/// Name of the direct exchange every job-type queue binds to. Distinct
/// from any one queue's name; see `DESIGN.md` for why `spec.md`'s single
/// `smi-requests` name is read here as the exchange, with one durable
/// queue per type hung off it (`smi-requests.<type>`).
pub const EXCHANGE_NAME: &str = "smi-requests";

/// Per-queue priority ceiling declared via `x-max-priority`.
pub const MAX_PRIORITY: u8 = 10;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub amqp_url: String,
    pub prefetch: u16,
}

impl BrokerConfig {
    pub fn new(amqp_url: impl Into<String>) -> Self {
        Self {
            amqp_url: amqp_url.into(),
            prefetch: 10,
        }
    }
}

fn queue_name(job_type: JobType) -> String {
    format!("{EXCHANGE_NAME}.{}", job_type.routing_key())
}

/// One AMQP connection, shared by every per-type producer/consumer pair
/// an instance opens. Reconnection is the caller's responsibility (the
/// Job Manager's supervisor loop, `spec.md` §4.2): a dropped `Broker` is
/// simply replaced by reconnecting.
pub struct Broker {
    connection: Connection,
    config: BrokerConfig,
}

impl Broker {
    pub async fn connect(config: BrokerConfig) -> Result<Self, BrokerError> {
        let connection = Connection::connect(
            &config.amqp_url,
            ConnectionProperties::default()
                .with_executor(tokio_executor_trait::Tokio::current())
                .with_reactor(tokio_reactor_trait::Tokio),
        )
        .await?;
        info!("connected to broker");
        Ok(Self { connection, config })
    }

    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// Idempotently declares the exchange and one type's queue, binding
    /// it with a routing key equal to the type's routing key. Producers
    /// and consumers both call this before their first use so declaration
    /// order between them never matters.
    async fn declare_topology(&self, job_type: JobType) -> Result<Channel, BrokerError> {
        let channel = self.connection.create_channel().await?;
        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let mut queue_args = FieldTable::default();
        queue_args.insert(
            ShortString::from("x-max-priority"),
            AMQPValue::ShortShortUInt(MAX_PRIORITY),
        );
        channel
            .queue_declare(
                &queue_name(job_type),
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                queue_args,
            )
            .await?;
        channel
            .queue_bind(
                &queue_name(job_type),
                EXCHANGE_NAME,
                job_type.routing_key(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(channel)
    }

    /// A producer bound to one job type's routing key, per `spec.md`
    /// §4.2: "a single producer and a single consumer bound to a routing
    /// key equal to the type name."
    pub async fn producer(&self, job_type: JobType) -> Result<Producer, BrokerError> {
        let channel = self.declare_topology(job_type).await?;
        Ok(Producer { channel, job_type })
    }

    pub async fn consumer(&self, job_type: JobType, consumer_tag: &str) -> Result<Consumer, BrokerError> {
        let channel = self.declare_topology(job_type).await?;
        channel
            .basic_qos(self.config.prefetch, BasicQosOptions::default())
            .await?;
        let inner = channel
            .basic_consume(
                &queue_name(job_type),
                consumer_tag,
                lapin::options::BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(Consumer::new(inner))
    }
}

/// Publishes jobs for one job type onto the exchange with a per-message
/// priority, per `spec.md` §6's wire contract.
pub struct Producer {
    channel: Channel,
    job_type: JobType,
}

impl Producer {
    pub async fn publish(
        &self,
        priority: Priority,
        headers: MessageHeaders,
        body: &[u8],
    ) -> Result<(), BrokerError> {
        let properties = BasicProperties::default()
            .with_priority(priority.as_amqp_priority())
            .with_delivery_mode(2) // persistent
            .with_headers(headers.into_field_table());

        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                self.job_type.routing_key(),
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await?
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_name_is_namespaced_under_the_exchange_per_type() {
        assert_eq!(queue_name(JobType::TextToText), "smi-requests.text_to_text");
        assert_ne!(queue_name(JobType::TextToText), queue_name(JobType::TextToImage));
    }
}
