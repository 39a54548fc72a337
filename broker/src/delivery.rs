//! Consumer-side delivery handling: decoding headers, and acking/rejecting
//! per `spec.md` §4.2's "acknowledge only after status has been written"
//! rule and §7's reject-with-requeue failure policy.

use futures::StreamExt;
use lapin::{
    message::Delivery as LapinDelivery,
    options::{BasicAckOptions, BasicNackOptions},
};

use crate::error::BrokerError;
use crate::headers::MessageHeaders;

/// One decoded broker delivery. Holds the raw `lapin` delivery so the
/// caller can ack or reject it explicitly once the job's terminal status
/// has actually been written to the Job Store — never before.
pub struct Delivery {
    raw: LapinDelivery,
    pub headers: MessageHeaders,
}

impl Delivery {
    fn from_raw(raw: LapinDelivery) -> Result<Self, BrokerError> {
        let headers = MessageHeaders::from_field_table(raw.properties.headers().as_ref().ok_or(
            BrokerError::MissingHeader("headers"),
        )?)?;
        Ok(Self { raw, headers })
    }

    pub fn body(&self) -> &[u8] {
        &self.raw.data
    }

    pub async fn ack(&self) -> Result<(), BrokerError> {
        self.raw.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    /// Rejects the delivery, requeueing it for the bounded-backoff retry
    /// described in `spec.md` §4.2/§7. The caller is responsible for
    /// waiting out the backoff before the message is redelivered.
    pub async fn reject_requeue(&self) -> Result<(), BrokerError> {
        self.raw
            .nack(BasicNackOptions {
                requeue: true,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

/// A consumer bound to one job type's queue. Wraps `lapin`'s delivery
/// stream and decodes each delivery's headers up front so callers never
/// see a malformed message reach the Dispatcher.
pub struct Consumer {
    inner: lapin::Consumer,
}

impl Consumer {
    pub(crate) fn new(inner: lapin::Consumer) -> Self {
        Self { inner }
    }

    /// Awaits the next delivery. Returns `Ok(None)` when the consumer's
    /// channel has closed (e.g. the connection dropped); the Job Manager
    /// treats that as a signal to reconnect.
    pub async fn next(&mut self) -> Result<Option<Delivery>, BrokerError> {
        match self.inner.next().await {
            Some(Ok(raw)) => Delivery::from_raw(raw).map(Some),
            Some(Err(e)) => Err(BrokerError::from(e)),
            None => Ok(None),
        }
    }
}
