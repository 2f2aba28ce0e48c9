use anyhow::Result;
use autopilot_importer::error::ImporterError;
use autopilot_importer::intune::{
    GraphCredentials, GraphTransport, SubmissionClient, TransportResponse,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stub transport that records how often each endpoint is hit and replays
/// canned responses.
struct StubTransport {
    token_calls: Arc<AtomicUsize>,
    import_calls: Arc<AtomicUsize>,
    token_response: TransportResponse,
    import_response: TransportResponse,
}

#[async_trait::async_trait]
impl GraphTransport for StubTransport {
    async fn request_token(
        &self,
        _credentials: &GraphCredentials,
    ) -> autopilot_importer::error::Result<TransportResponse> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token_response.clone())
    }

    async fn post_import(
        &self,
        _access_token: &str,
        _payload: &Value,
    ) -> autopilot_importer::error::Result<TransportResponse> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.import_response.clone())
    }
}

/// Transport whose import call dies in transit.
struct BrokenImportTransport;

#[async_trait::async_trait]
impl GraphTransport for BrokenImportTransport {
    async fn request_token(
        &self,
        _credentials: &GraphCredentials,
    ) -> autopilot_importer::error::Result<TransportResponse> {
        Ok(TransportResponse {
            status: 200,
            body: r#"{"access_token":"token-123"}"#.to_string(),
        })
    }

    async fn post_import(
        &self,
        _access_token: &str,
        _payload: &Value,
    ) -> autopilot_importer::error::Result<TransportResponse> {
        Err(ImporterError::Api {
            message: "connection reset by peer".to_string(),
        })
    }
}

fn credentials() -> GraphCredentials {
    GraphCredentials {
        tenant_id: "tenant-123".to_string(),
        client_id: "client-123".to_string(),
        client_secret: "secret-123".to_string(),
    }
}

fn batch(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{:A>30}{i:02}==", "Hash"))
        .collect()
}

fn client_with_responses(
    token_response: TransportResponse,
    import_response: TransportResponse,
) -> (SubmissionClient, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let token_calls = Arc::new(AtomicUsize::new(0));
    let import_calls = Arc::new(AtomicUsize::new(0));
    let transport = StubTransport {
        token_calls: token_calls.clone(),
        import_calls: import_calls.clone(),
        token_response,
        import_response,
    };
    (
        SubmissionClient::new(Box::new(transport)),
        token_calls,
        import_calls,
    )
}

fn ok_token() -> TransportResponse {
    TransportResponse {
        status: 200,
        body: r#"{"access_token":"token-123"}"#.to_string(),
    }
}

#[tokio::test]
async fn missing_credentials_fail_without_network_calls() -> Result<()> {
    let (client, token_calls, import_calls) = client_with_responses(
        ok_token(),
        TransportResponse {
            status: 202,
            body: String::new(),
        },
    );

    let hashes = batch(3);
    let outcome = client
        .submit(&hashes, "FinanceDept", &GraphCredentials::default())
        .await;

    assert!(!outcome.overall_success);
    assert_eq!(outcome.processed_count, 0);
    assert_eq!(outcome.failed_count, 3);
    assert!(outcome.message.contains("tenant_id"));
    assert_eq!(token_calls.load(Ordering::SeqCst), 0);
    assert_eq!(import_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn empty_batch_is_reported_without_network_calls() -> Result<()> {
    let (client, token_calls, import_calls) = client_with_responses(
        ok_token(),
        TransportResponse {
            status: 202,
            body: String::new(),
        },
    );

    let outcome = client.submit(&[], "FinanceDept", &credentials()).await;

    assert!(!outcome.overall_success);
    assert_eq!(outcome.processed_count, 0);
    assert_eq!(outcome.failed_count, 0);
    assert_eq!(token_calls.load(Ordering::SeqCst), 0);
    assert_eq!(import_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn accepted_202_counts_whole_batch_as_processed() -> Result<()> {
    let (client, token_calls, import_calls) = client_with_responses(
        ok_token(),
        TransportResponse {
            status: 202,
            body: String::new(),
        },
    );

    let hashes = batch(5);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(outcome.overall_success);
    assert_eq!(outcome.processed_count, 5);
    assert_eq!(outcome.failed_count, 0);
    assert_eq!(token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(import_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn item_list_with_errors_yields_partial_failure() -> Result<()> {
    let body = serde_json::json!({
        "value": [
            { "hardwareIdentifier": "A", "error": null },
            { "hardwareIdentifier": "B", "error": "duplicate device" },
            { "hardwareIdentifier": "C" }
        ]
    })
    .to_string();
    let (client, _, _) =
        client_with_responses(ok_token(), TransportResponse { status: 200, body });

    let hashes = batch(3);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(!outcome.overall_success);
    assert_eq!(outcome.processed_count, 2);
    assert_eq!(outcome.failed_count, 1);
    assert!(outcome.raw_detail.is_some());
    Ok(())
}

#[tokio::test]
async fn item_list_without_errors_is_success() -> Result<()> {
    let body = serde_json::json!([
        { "hardwareIdentifier": "A" },
        { "hardwareIdentifier": "B" }
    ])
    .to_string();
    let (client, _, _) =
        client_with_responses(ok_token(), TransportResponse { status: 201, body });

    let hashes = batch(2);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(outcome.overall_success);
    assert_eq!(outcome.processed_count, 2);
    assert_eq!(outcome.failed_count, 0);
    Ok(())
}

#[tokio::test]
async fn unparsable_2xx_body_counts_batch_as_processed() -> Result<()> {
    let (client, _, _) = client_with_responses(
        ok_token(),
        TransportResponse {
            status: 200,
            body: "not json".to_string(),
        },
    );

    let hashes = batch(4);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(outcome.overall_success);
    assert_eq!(outcome.processed_count, 4);
    assert_eq!(outcome.failed_count, 0);
    assert!(outcome.message.contains("not fully parseable"));
    Ok(())
}

#[tokio::test]
async fn rejected_import_fails_whole_batch_with_remote_detail() -> Result<()> {
    let body = r#"{"error":{"code":"Forbidden","message":"Application is missing permissions"}}"#;
    let (client, _, _) = client_with_responses(
        ok_token(),
        TransportResponse {
            status: 403,
            body: body.to_string(),
        },
    );

    let hashes = batch(2);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(!outcome.overall_success);
    assert_eq!(outcome.processed_count, 0);
    assert_eq!(outcome.failed_count, 2);
    assert!(outcome.message.contains("403"));
    assert!(outcome.message.contains("missing permissions"));
    Ok(())
}

#[tokio::test]
async fn oversized_error_bodies_are_truncated() -> Result<()> {
    let (client, _, _) = client_with_responses(
        ok_token(),
        TransportResponse {
            status: 500,
            body: "x".repeat(10_000),
        },
    );

    let hashes = batch(1);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(!outcome.overall_success);
    assert!(outcome.message.len() < 1000);
    assert!(outcome.message.contains("[truncated]"));
    Ok(())
}

#[tokio::test]
async fn token_rejection_skips_the_import_call() -> Result<()> {
    let (client, token_calls, import_calls) = client_with_responses(
        TransportResponse {
            status: 401,
            body: r#"{"error":"invalid_client"}"#.to_string(),
        },
        TransportResponse {
            status: 202,
            body: String::new(),
        },
    );

    let hashes = batch(2);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(!outcome.overall_success);
    assert_eq!(outcome.failed_count, 2);
    assert!(outcome.message.contains("401"));
    assert_eq!(token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(import_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn transport_failure_becomes_a_failed_outcome() -> Result<()> {
    let client = SubmissionClient::new(Box::new(BrokenImportTransport));

    let hashes = batch(2);
    let outcome = client.submit(&hashes, "FinanceDept", &credentials()).await;

    assert!(!outcome.overall_success);
    assert_eq!(outcome.failed_count, 2);
    assert!(outcome.message.contains("connection reset by peer"));
    Ok(())
}
