//! Typed HTTP client for the acquisition server's control surface.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigUpdate;
use crate::types::RecordedPoint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered but declined the operation.
    #[error("{0}")]
    Rejected(String),
}

/// Generic `{success, error?}` acknowledgment used by most endpoints.
#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Ack {
    fn into_result(self) -> Result<(), ClientError> {
        if self.success {
            Ok(())
        } else {
            Err(ClientError::Rejected(
                self.error.unwrap_or_else(|| "operation failed".to_string()),
            ))
        }
    }
}

/// GET /api/status response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AcquisitionStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub total_samples: u64,
    /// Buffer occupancy percent.
    #[serde(default)]
    pub buffer: f64,
    #[serde(default)]
    pub collection_time: f64,
}

#[derive(Debug, Deserialize)]
struct ExportAck {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExportRequest<'a> {
    #[serde(rename = "testData")]
    test_data: &'a [RecordedPoint],
}

#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    port: &'a str,
}

/// Client for the acquisition REST surface. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AcquisitionClient {
    http: reqwest::Client,
    base_url: String,
}

impl AcquisitionClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// List serial ports visible to the acquisition server.
    pub async fn list_ports(&self) -> Result<Vec<String>, ClientError> {
        let ports = self
            .http
            .get(self.url("/api/ports"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ports)
    }

    /// Ask the server to open a serial port.
    pub async fn connect_port(&self, port: &str) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .post(self.url("/api/connect"))
            .json(&ConnectRequest { port })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .get(self.url("/api/disconnect"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }

    /// Trigger sensor calibration. Only valid while a port is open.
    pub async fn calibrate(&self) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .get(self.url("/api/calibrate"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }

    pub async fn status(&self) -> Result<AcquisitionStatus, ClientError> {
        let status = self
            .http
            .get(self.url("/api/status"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status)
    }

    /// Push the current tunables to the server.
    pub async fn push_config(&self, update: &ConfigUpdate) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .post(self.url("/api/config"))
            .json(update)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }

    pub async fn start_test(&self) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .post(self.url("/api/start_test"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }

    pub async fn stop_test(&self) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .post(self.url("/api/stop_test"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }

    /// Hand the recorded point sequence to the server for export. Returns
    /// the server-side filename.
    pub async fn export_test(&self, points: &[RecordedPoint]) -> Result<String, ClientError> {
        let ack: ExportAck = self
            .http
            .post(self.url("/api/export_test"))
            .json(&ExportRequest { test_data: points })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if ack.success {
            Ok(ack.filename.unwrap_or_else(|| "export".to_string()))
        } else {
            Err(ClientError::Rejected(
                ack.error.unwrap_or_else(|| "export failed".to_string()),
            ))
        }
    }

    /// Clear the server-side sample buffers.
    pub async fn clear_data(&self) -> Result<(), ClientError> {
        let ack: Ack = self
            .http
            .get(self.url("/api/clear_data"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ack.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = AcquisitionClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.url("/api/status"), "http://127.0.0.1:5000/api/status");
    }

    #[test]
    fn test_ack_deserialization_defaults() {
        let ack: Ack = serde_json::from_str("{}").unwrap();
        assert!(!ack.success);
        assert!(ack.error.is_none());

        let ack: Ack =
            serde_json::from_str(r#"{"success": false, "error": "port busy"}"#).unwrap();
        assert!(matches!(
            ack.into_result(),
            Err(ClientError::Rejected(msg)) if msg == "port busy"
        ));
    }

    #[test]
    fn test_status_deserialization_tolerates_extras() {
        let status: AcquisitionStatus = serde_json::from_str(
            r#"{"connected": true, "total_samples": 9000, "buffer": 42.5, "port": "COM3"}"#,
        )
        .unwrap();
        assert!(status.connected);
        assert_eq!(status.total_samples, 9000);
        assert_eq!(status.buffer, 42.5);
        assert_eq!(status.collection_time, 0.0);
    }

    #[test]
    fn test_export_request_wire_shape() {
        let points: Vec<RecordedPoint> = Vec::new();
        let json = serde_json::to_value(ExportRequest { test_data: &points }).unwrap();
        assert!(json.get("testData").is_some());
    }
}
