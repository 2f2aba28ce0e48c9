use crate::constants::{
    ERROR_DETAIL_MAX_CHARS, GRAPH_DEFAULT_SCOPE, IMPORTED_DEVICE_ODATA_TYPE, IMPORT_ENDPOINT,
    SERIAL_PREFIX_CHARS,
};
use crate::error::Result;
use crate::types::SubmissionOutcome;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Azure AD application credentials for the client-credentials grant.
#[derive(Debug, Clone, Default)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl GraphCredentials {
    /// Names the missing fields, or `None` when the credentials are complete.
    pub fn missing_fields(&self) -> Option<Vec<&'static str>> {
        let mut missing = Vec::new();
        if self.tenant_id.trim().is_empty() {
            missing.push("tenant_id");
        }
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.trim().is_empty() {
            missing.push("client_secret");
        }
        if missing.is_empty() {
            None
        } else {
            Some(missing)
        }
    }
}

/// A raw HTTP exchange result, decoupled from reqwest so tests can
/// substitute a recording stub for the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two network round-trips the submission needs, behind a seam.
///
/// Errors returned here represent transport failures (DNS, timeout,
/// connection reset); HTTP-level failures come back as responses.
#[async_trait::async_trait]
pub trait GraphTransport: Send + Sync {
    /// POST the client-credentials form to the identity provider.
    async fn request_token(&self, credentials: &GraphCredentials) -> Result<TransportResponse>;

    /// POST the import payload to the Autopilot import endpoint.
    async fn post_import(&self, access_token: &str, payload: &Value) -> Result<TransportResponse>;
}

/// Production transport backed by reqwest.
pub struct HttpGraphTransport {
    client: reqwest::Client,
}

impl HttpGraphTransport {
    pub fn new(timeout_seconds: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpGraphTransport {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait::async_trait]
impl GraphTransport for HttpGraphTransport {
    async fn request_token(&self, credentials: &GraphCredentials) -> Result<TransportResponse> {
        let response = self
            .client
            .post(crate::constants::token_endpoint_for_tenant(&credentials.tenant_id))
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", GRAPH_DEFAULT_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }

    async fn post_import(&self, access_token: &str, payload: &Value) -> Result<TransportResponse> {
        let response = self
            .client
            .post(IMPORT_ENDPOINT)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Submits validated hash batches to the Intune Autopilot import endpoint.
///
/// One attempt per invocation; retry policy, if any, belongs to the caller.
/// `submit` never errors — every failure mode is folded into the returned
/// `SubmissionOutcome`.
pub struct SubmissionClient {
    transport: Box<dyn GraphTransport>,
}

impl SubmissionClient {
    pub fn new(transport: Box<dyn GraphTransport>) -> Self {
        Self { transport }
    }

    #[instrument(skip(self, identifiers, credentials), fields(batch_size = identifiers.len(), group_tag = %group_tag))]
    pub async fn submit(
        &self,
        identifiers: &[String],
        group_tag: &str,
        credentials: &GraphCredentials,
    ) -> SubmissionOutcome {
        if let Some(missing) = credentials.missing_fields() {
            warn!("submission refused, missing configuration: {}", missing.join(", "));
            return SubmissionOutcome::failed(
                identifiers.len(),
                format!(
                    "Intune credentials are not configured (missing: {}).",
                    missing.join(", ")
                ),
            );
        }

        if identifiers.is_empty() {
            return SubmissionOutcome::failed(0, "No identifiers supplied.");
        }

        let token = match self.acquire_token(credentials).await {
            Ok(token) => token,
            Err(outcome_message) => {
                return SubmissionOutcome::failed(identifiers.len(), outcome_message);
            }
        };

        let payload = build_import_payload(identifiers, group_tag);
        let response = match self.transport.post_import(&token, &payload).await {
            Ok(response) => response,
            Err(err) => {
                warn!("import request failed in transit: {err}");
                return SubmissionOutcome::failed(
                    identifiers.len(),
                    format!("Failed to reach the Intune import endpoint: {err}"),
                );
            }
        };

        reconcile(identifiers.len(), group_tag, &response)
    }

    /// Exchanges credentials for a bearer token. The error branch carries a
    /// ready-to-report message rather than an error type, since the caller
    /// folds it straight into an outcome.
    async fn acquire_token(
        &self,
        credentials: &GraphCredentials,
    ) -> std::result::Result<String, String> {
        let response = match self.transport.request_token(credentials).await {
            Ok(response) => response,
            Err(err) => {
                warn!("token request failed in transit: {err}");
                return Err(format!("Failed to reach the identity provider: {err}"));
            }
        };

        if !response.is_success() {
            return Err(format!(
                "Token request rejected (status {}): {}",
                response.status,
                truncate(&response.body, ERROR_DETAIL_MAX_CHARS)
            ));
        }

        match serde_json::from_str::<TokenResponse>(&response.body) {
            Ok(token) => {
                debug!("acquired bearer token");
                Ok(token.access_token)
            }
            Err(err) => Err(format!(
                "Token response could not be parsed: {err}"
            )),
        }
    }
}

/// One import record per hash, in the Graph wire shape.
fn build_import_payload(identifiers: &[String], group_tag: &str) -> Value {
    let devices: Vec<Value> = identifiers
        .iter()
        .map(|hash| {
            json!({
                "@odata.type": IMPORTED_DEVICE_ODATA_TYPE,
                "groupTag": group_tag,
                "hardwareIdentifier": hash,
                "serialNumber": placeholder_serial(hash),
                "productKey": "",
            })
        })
        .collect();
    json!({ "importedDeviceIdentities": devices })
}

/// Intune requires a serial number per device; hashes are opaque, so a
/// prefix-derived placeholder stands in.
fn placeholder_serial(hash: &str) -> String {
    let prefix: String = hash.chars().take(SERIAL_PREFIX_CHARS).collect();
    format!("SERIAL-{prefix}")
}

/// Classifies the import response into per-record accounting.
fn reconcile(batch_size: usize, group_tag: &str, response: &TransportResponse) -> SubmissionOutcome {
    // 202: the import was accepted for asynchronous processing; Graph reports
    // no per-item results yet, so the whole batch counts as processed.
    if response.status == 202 {
        info!("import accepted for async processing, batch_size={batch_size}");
        return SubmissionOutcome {
            overall_success: true,
            processed_count: batch_size,
            failed_count: 0,
            message: format!(
                "Successfully initiated import of {batch_size} device(s) with group tag \"{group_tag}\"."
            ),
            raw_detail: None,
        };
    }

    if response.is_success() {
        return reconcile_item_results(batch_size, group_tag, response);
    }

    // Non-2xx: the whole batch failed. Embed the remote detail, bounded.
    let detail = extract_error_detail(&response.body);
    warn!(
        "import rejected with status {}: {}",
        response.status,
        truncate(&detail, ERROR_DETAIL_MAX_CHARS)
    );
    SubmissionOutcome {
        overall_success: false,
        processed_count: 0,
        failed_count: batch_size,
        message: format!(
            "Intune import failed (status {}): {}",
            response.status,
            truncate(&detail, ERROR_DETAIL_MAX_CHARS)
        ),
        raw_detail: serde_json::from_str(&response.body).ok(),
    }
}

fn reconcile_item_results(
    batch_size: usize,
    group_tag: &str,
    response: &TransportResponse,
) -> SubmissionOutcome {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
    let items = parsed.as_ref().and_then(item_list);

    let Some(items) = items else {
        // Parsable item results are optional on 2xx; without them we
        // conservatively count the whole batch as processed.
        return SubmissionOutcome {
            overall_success: true,
            processed_count: batch_size,
            failed_count: 0,
            message: format!(
                "Imported {batch_size} device(s) with group tag \"{group_tag}\" \
                 (response was not fully parseable; per-device results unavailable)."
            ),
            raw_detail: parsed,
        };
    };

    // processed + failed never exceeds the submitted batch size, even if the
    // remote echoes back extra items.
    let failed_count = items
        .iter()
        .filter(|item| item_failed(item))
        .count()
        .min(batch_size);
    let processed_count = items
        .len()
        .saturating_sub(failed_count)
        .min(batch_size - failed_count);
    let overall_success = failed_count == 0;

    let message = if overall_success {
        format!("Imported {processed_count} device(s) with group tag \"{group_tag}\".")
    } else {
        format!(
            "Imported {processed_count} device(s); {failed_count} device(s) were rejected by Intune."
        )
    };

    SubmissionOutcome {
        overall_success,
        processed_count,
        failed_count,
        message,
        raw_detail: parsed,
    }
}

/// Per-item results arrive either as a bare array or under the Graph `value`
/// envelope.
fn item_list(body: &Value) -> Option<&Vec<Value>> {
    body.as_array()
        .or_else(|| body.get("value").and_then(Value::as_array))
        .filter(|items| !items.is_empty())
}

/// An item failed iff it carries a non-empty error field.
fn item_failed(item: &Value) -> bool {
    match item.get("error") {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

/// Best-effort extraction of a remote error message: Graph's nested
/// `error.message` first, then raw text.
fn extract_error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        "no response body".to_string()
    } else {
        body.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max_chars).collect();
        format!("{clipped}... [truncated]")
    }
}
