//! Envelope delivery over HTTP.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use palisade_protocol::Envelope;

use crate::error::{Error, Result};

/// HTTP client that delivers envelopes to a peer's RECEIVE_SIGNED endpoint.
#[derive(Debug, Clone)]
pub struct EnvelopeSender {
    client: Client,
}

impl EnvelopeSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Deliver an envelope as query parameters of `GET {base}/RECEIVE_SIGNED`.
    ///
    /// `base_url` is the target's PID. Anything but a success status is a
    /// failed delivery.
    pub async fn deliver(&self, base_url: &str, envelope: &Envelope) -> Result<()> {
        let url = format!("{}/RECEIVE_SIGNED", base_url);
        debug!("Delivering envelope to {}", url);
        let response = self.client.get(&url).query(envelope).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Delivery(format!("{} answered {}", url, status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use palisade_identity::{KeyMaterial, ParticipantId};

    fn envelope() -> Envelope {
        let material = KeyMaterial::from_seed([1; 32]);
        Envelope::signed(
            ParticipantId::from_host_port("127.0.0.1", 9000),
            "Go Ducks!",
            &material,
        )
    }

    #[tokio::test]
    async fn delivery_to_a_dead_port_fails() {
        let sender = EnvelopeSender::new(Duration::from_millis(500)).unwrap();
        let result = sender.deliver("http://127.0.0.1:1", &envelope()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_success_status_is_a_delivery_error() {
        let app = Router::new().route(
            "/RECEIVE_SIGNED",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sender = EnvelopeSender::new(Duration::from_secs(2)).unwrap();
        let base = format!("http://{}", addr);
        let err = sender.deliver(&base, &envelope()).await.unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
    }

    #[tokio::test]
    async fn success_status_completes_the_delivery() {
        let app = Router::new().route("/RECEIVE_SIGNED", get(|| async { "OK" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sender = EnvelopeSender::new(Duration::from_secs(2)).unwrap();
        let base = format!("http://{}", addr);
        sender.deliver(&base, &envelope()).await.unwrap();
    }
}
