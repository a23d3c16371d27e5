//! Telemetry side channel.
//!
//! Structured events, spans and request records are fire-and-forget: no
//! method can return an error, so a broken sink never fails a vote. When an
//! instrumentation key is configured, everything is also queued for export
//! to the Application Insights ingestion endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Custom dimension name to value, ordered for stable output.
pub type Dimensions = BTreeMap<String, u64>;

pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const EXPORT_QUEUE: usize = 1024;
const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
}

impl RequestRecord {
    pub fn name(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn success(&self) -> bool {
        self.status < 400
    }
}

pub trait Telemetry: Send + Sync {
    fn log_event(&self, message: &str, dimensions: &Dimensions);

    fn record_span(&self, name: &str, attributes: &Dimensions);

    fn track_request(&self, request: &RequestRecord);
}

fn encode(dimensions: &Dimensions) -> String {
    serde_json::to_string(dimensions).unwrap_or_else(|_| "{}".into())
}

/// Writes telemetry to the local `tracing` subscriber only.
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl Telemetry for TracingTelemetry {
    fn log_event(&self, message: &str, dimensions: &Dimensions) {
        info!(
            target: "telemetry",
            custom_dimensions = %encode(dimensions),
            "{}",
            message
        );
    }

    fn record_span(&self, name: &str, attributes: &Dimensions) {
        let span = info_span!(
            target: "telemetry",
            "span",
            span_name = %name,
            attributes = %encode(attributes)
        );
        span.in_scope(|| {
            info!(target: "telemetry", "{}", name);
        });
    }

    fn track_request(&self, request: &RequestRecord) {
        info!(
            target: "telemetry",
            method = %request.method,
            path = %request.path,
            status = request.status,
            duration_ms = request.duration.as_millis() as u64,
            "request"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    pub ingestion_endpoint: String,
}

impl ConnectionString {
    /// Accepts either a bare instrumentation key or a full
    /// `InstrumentationKey=...;IngestionEndpoint=...` connection string.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if !raw.contains('=') {
            return Some(Self {
                instrumentation_key: raw.to_string(),
                ingestion_endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
            });
        }

        let mut instrumentation_key = None;
        let mut ingestion_endpoint = DEFAULT_INGESTION_ENDPOINT.to_string();
        for pair in raw.split(';') {
            let Some((key, value)) = pair.split_once('=') else { continue };
            let value = value.trim();
            if key.trim().eq_ignore_ascii_case("InstrumentationKey") && !value.is_empty() {
                instrumentation_key = Some(value.to_string());
            } else if key.trim().eq_ignore_ascii_case("IngestionEndpoint") && !value.is_empty() {
                ingestion_endpoint = value.trim_end_matches('/').to_string();
            }
        }

        instrumentation_key.map(|instrumentation_key| Self {
            instrumentation_key,
            ingestion_endpoint,
        })
    }

    pub fn track_url(&self) -> String {
        format!("{}/v2/track", self.ingestion_endpoint)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub name: String,
    pub time: String,
    pub i_key: String,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData {
    pub base_type: String,
    pub base_data: Value,
}

/// Application Insights timespan, `d.hh:mm:ss.ffffff`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{}.{:02}:{:02}:{:02}.{:06}",
        total / 86_400,
        (total % 86_400) / 3_600,
        (total % 3_600) / 60,
        total % 60,
        duration.subsec_micros()
    )
}

fn properties(dimensions: &Dimensions) -> BTreeMap<&str, String> {
    dimensions.iter().map(|(k, v)| (k.as_str(), v.to_string())).collect()
}

fn now() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

fn envelope(instrumentation_key: &str, kind: &str, base_type: &str, base_data: Value) -> Envelope {
    Envelope {
        name: format!("Microsoft.ApplicationInsights.{}", kind),
        time: now(),
        i_key: instrumentation_key.to_string(),
        data: EnvelopeData {
            base_type: base_type.to_string(),
            base_data,
        },
    }
}

pub fn message_envelope(instrumentation_key: &str, message: &str, dimensions: &Dimensions) -> Envelope {
    envelope(instrumentation_key, "Message", "MessageData", json!({
        "ver": 2,
        "message": message,
        "severityLevel": 1,
        "properties": properties(dimensions),
    }))
}

pub fn span_envelope(instrumentation_key: &str, name: &str, attributes: &Dimensions) -> Envelope {
    envelope(instrumentation_key, "RemoteDependency", "RemoteDependencyData", json!({
        "ver": 2,
        "id": Uuid::new_v4().simple().to_string(),
        "name": name,
        "type": "INPROC",
        "resultCode": "0",
        "duration": format_duration(Duration::ZERO),
        "success": true,
        "properties": properties(attributes),
    }))
}

pub fn request_envelope(instrumentation_key: &str, request: &RequestRecord) -> Envelope {
    envelope(instrumentation_key, "Request", "RequestData", json!({
        "ver": 2,
        "id": Uuid::new_v4().simple().to_string(),
        "name": request.name(),
        "url": request.path,
        "responseCode": request.status.to_string(),
        "success": request.success(),
        "duration": format_duration(request.duration),
    }))
}

/// Logs locally and queues every item for export. A full queue or a
/// stopped exporter drops the item.
pub struct AppInsightsTelemetry {
    local: TracingTelemetry,
    instrumentation_key: String,
    sender: Sender<Envelope>,
}

impl AppInsightsTelemetry {
    /// Must be called from within a tokio runtime.
    pub fn spawn(connection: ConnectionString) -> Self {
        let (sender, receiver) = mpsc::channel(EXPORT_QUEUE);
        let exporter = Exporter::new(connection.track_url());
        tokio::spawn(exporter.run(receiver));
        info!("Exporting telemetry to {}", connection.ingestion_endpoint);

        Self::with_sender(connection.instrumentation_key, sender)
    }

    pub fn with_sender(instrumentation_key: impl Into<String>, sender: Sender<Envelope>) -> Self {
        Self {
            local: TracingTelemetry::new(),
            instrumentation_key: instrumentation_key.into(),
            sender,
        }
    }

    fn enqueue(&self, envelope: Envelope) {
        match self.sender.try_send(envelope) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Telemetry queue full, dropping item"),
            Err(TrySendError::Closed(_)) => debug!("Telemetry exporter stopped, dropping item"),
        }
    }
}

impl Telemetry for AppInsightsTelemetry {
    fn log_event(&self, message: &str, dimensions: &Dimensions) {
        self.local.log_event(message, dimensions);
        self.enqueue(message_envelope(&self.instrumentation_key, message, dimensions));
    }

    fn record_span(&self, name: &str, attributes: &Dimensions) {
        self.local.record_span(name, attributes);
        self.enqueue(span_envelope(&self.instrumentation_key, name, attributes));
    }

    fn track_request(&self, request: &RequestRecord) {
        self.local.track_request(request);
        self.enqueue(request_envelope(&self.instrumentation_key, request));
    }
}

pub struct Exporter {
    client: Client,
    url: String,
}

impl Exporter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub async fn send(&self, batch: &[Envelope]) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(batch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Drains the queue in batches until every sender is dropped.
    pub async fn run(self, mut receiver: Receiver<Envelope>) {
        while let Some(first) = receiver.recv().await {
            let mut batch = vec![first];
            while batch.len() < MAX_BATCH {
                match receiver.try_recv() {
                    Ok(envelope) => batch.push(envelope),
                    Err(_) => break,
                }
            }

            match self.send(&batch).await {
                Ok(()) => debug!("Exported {} telemetry items", batch.len()),
                Err(e) => warn!("Failed to export {} telemetry items: {}", batch.len(), e),
            }
        }
        debug!("Telemetry exporter stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Dimensions {
        [("Dogs Vote".to_string(), 2), ("Cats Vote".to_string(), 1)]
            .into_iter()
            .collect()
    }

    #[test]
    fn parses_bare_key_and_connection_string() {
        let bare = ConnectionString::parse(" 0000-abcd ").unwrap();
        assert_eq!(bare.instrumentation_key, "0000-abcd");
        assert_eq!(bare.track_url(), "https://dc.services.visualstudio.com/v2/track");

        let full = ConnectionString::parse(
            "InstrumentationKey=0000-abcd;IngestionEndpoint=https://westeurope-1.in.applicationinsights.azure.com/",
        )
        .unwrap();
        assert_eq!(full.instrumentation_key, "0000-abcd");
        assert_eq!(full.track_url(), "https://westeurope-1.in.applicationinsights.azure.com/v2/track");

        assert_eq!(ConnectionString::parse("  "), None);
        assert_eq!(ConnectionString::parse("IngestionEndpoint=https://x"), None);
    }

    #[test]
    fn encodes_dimensions_in_key_order() {
        assert_eq!(encode(&dims()), r#"{"Cats Vote":1,"Dogs Vote":2}"#);
    }

    #[test]
    fn formats_durations_as_timespans() {
        assert_eq!(format_duration(Duration::from_millis(1_500)), "0.00:00:01.500000");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1.01:01:01.000000");
    }

    #[test]
    fn builds_message_envelope() {
        let envelope = message_envelope("ikey", "Votes reset", &dims());
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["iKey"], "ikey");
        assert_eq!(value["name"], "Microsoft.ApplicationInsights.Message");
        assert_eq!(value["data"]["baseType"], "MessageData");
        assert_eq!(value["data"]["baseData"]["message"], "Votes reset");
        assert_eq!(value["data"]["baseData"]["properties"]["Cats Vote"], "1");
        assert!(!envelope.time.is_empty());
    }

    #[test]
    fn exports_every_telemetry_kind() {
        let (sender, mut receiver) = mpsc::channel(8);
        let telemetry = AppInsightsTelemetry::with_sender("ikey", sender);

        telemetry.log_event("Cats Vote", &Dimensions::new());
        telemetry.record_span("GET /index - Retrieve Votes", &dims());
        telemetry.track_request(&RequestRecord {
            method: "POST".into(),
            path: "/".into(),
            status: 303,
            duration: Duration::from_millis(4),
        });

        let kinds: Vec<_> = std::iter::from_fn(|| receiver.try_recv().ok())
            .map(|e| (e.i_key, e.data.base_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("ikey".to_string(), "MessageData".to_string()),
                ("ikey".to_string(), "RemoteDependencyData".to_string()),
                ("ikey".to_string(), "RequestData".to_string()),
            ]
        );
    }

    #[test]
    fn full_or_closed_queue_never_fails_the_caller() {
        let (sender, receiver) = mpsc::channel(1);
        let telemetry = AppInsightsTelemetry::with_sender("ikey", sender);
        telemetry.log_event("first", &Dimensions::new());
        telemetry.log_event("dropped", &Dimensions::new());

        drop(receiver);
        telemetry.record_span("after close", &dims());
    }

    #[tokio::test]
    async fn exporter_reports_unreachable_endpoint() {
        let exporter = Exporter::new("http://127.0.0.1:9/v2/track");
        let batch = vec![message_envelope("ikey", "Cats Vote", &Dimensions::new())];
        assert!(exporter.send(&batch).await.is_err());
    }
}
