//! APDU transport over the Speculos emulator's HTTP API.
//!
//! Speculos, and bridges that mimic it, accept `POST /apdu` with a hex
//! encoded command and answer with the hex encoded response including the
//! status word.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::apdu::{ApduAnswer, ApduCommand, ApduTransport};
use crate::error::DeviceError;

#[derive(Debug, Serialize, Deserialize)]
struct ApduMessage {
    data: String,
}

/// HTTP APDU transport.
#[derive(Debug, Clone)]
pub struct SpeculosTransport {
    client: Client,
    url: String,
}

impl SpeculosTransport {
    /// `timeout` bounds each exchange, including time spent waiting for the
    /// user to confirm on the device.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeviceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}/apdu", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ApduTransport for SpeculosTransport {
    async fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, DeviceError> {
        let request = ApduMessage {
            data: hex::encode(command.serialize()?),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeviceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeviceError::Transport(format!(
                "device bridge returned {}",
                response.status()
            )));
        }

        let message: ApduMessage = response
            .json()
            .await
            .map_err(|e| DeviceError::MalformedResponse(e.to_string()))?;
        let bytes =
            hex::decode(&message.data).map_err(|e| DeviceError::MalformedResponse(e.to_string()))?;

        debug!(len = bytes.len(), "Received APDU answer");
        ApduAnswer::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let transport =
            SpeculosTransport::new("http://127.0.0.1:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url(), "http://127.0.0.1:5000/apdu");
    }

    #[test]
    fn test_message_format() {
        let message = ApduMessage {
            data: hex::encode([0x80, 0x01, 0, 0, 0]),
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"data":"8001000000"}"#
        );
    }
}
