//! OpenAI provider against a local stub server speaking just enough HTTP/1.1.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use apprank_llm::{CompletionRequest, LlmError, ProviderRegistry, ProviderSettings};
use apprank_utils::test_support::ranking_schema;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

struct StubServer {
    endpoint: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    authorization: Option<String>,
    body: Value,
}

/// Serve the scripted `(status, body)` responses in order, one per connection.
async fn stub_server(responses: Vec<(u16, String)>) -> Result<StubServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&requests);

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if let Ok(request) = read_request(&mut stream).await {
                captured.lock().await.push(request);
            }
            let reason = match status {
                200 => "OK",
                401 => "Unauthorized",
                500 => "Internal Server Error",
                _ => "Status",
            };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Ok(StubServer {
        endpoint: format!("http://{addr}/v1/chat/completions"),
        requests,
    })
}

async fn read_request(stream: &mut TcpStream) -> Result<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        anyhow::ensure!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut content_length = 0usize;
    let mut authorization = None;
    for line in headers.lines() {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            if name == "content-length" {
                content_length = value.trim().parse()?;
            } else if name == "authorization" {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        anyhow::ensure!(n > 0, "connection closed before body");
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..header_end + content_length])?;
    Ok(CapturedRequest {
        authorization,
        body,
    })
}

fn completion(content: Option<&str>) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19 }
    })
    .to_string()
}

fn request(top_p: Option<f64>) -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4o-mini".to_string(),
        system_prompt: "Rank the apps.".to_string(),
        user_prompt: "Analyze search".to_string(),
        schema: ranking_schema(),
        temperature: 0.2,
        top_p,
        timeout: Duration::from_secs(5),
    }
}

fn settings(endpoint: &str) -> ProviderSettings {
    ProviderSettings::new("sk-test-key")
        .with_endpoint(Some(endpoint.to_string()))
        .with_retries(2, Duration::from_millis(5))
}

#[tokio::test]
async fn returns_first_choice_content() -> Result<()> {
    let server = stub_server(vec![(200, completion(Some(r#"{"a":["Maps"],"c":[]}"#)))]).await?;
    let provider = ProviderRegistry::default().create("OpenAI", settings(&server.endpoint))?;

    let content = provider.create_completion(request(None)).await?;
    assert_eq!(content, r#"{"a":["Maps"],"c":[]}"#);

    let requests = server.requests.lock().await;
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.authorization.as_deref(), Some("Bearer sk-test-key"));
    assert_eq!(sent.body["model"], "gpt-4o-mini");
    assert_eq!(sent.body["response_format"], ranking_schema());
    assert!(sent.body.get("top_p").is_none());
    assert_eq!(sent.body["messages"][0]["role"], "system");
    assert_eq!(sent.body["messages"][1]["role"], "user");
    Ok(())
}

#[tokio::test]
async fn sends_top_p_when_supplied() -> Result<()> {
    let server = stub_server(vec![(200, completion(Some("{}")))]).await?;
    let provider = ProviderRegistry::default().create("OpenAI", settings(&server.endpoint))?;

    provider.create_completion(request(Some(0.5))).await?;

    let requests = server.requests.lock().await;
    assert_eq!(requests[0].body["top_p"], json!(0.5));
    Ok(())
}

#[tokio::test]
async fn empty_content_is_request_failure() -> Result<()> {
    let server = stub_server(vec![(200, completion(None))]).await?;
    let provider = ProviderRegistry::default().create("OpenAI", settings(&server.endpoint))?;

    let err = provider
        .create_completion(request(None))
        .await
        .expect_err("empty content must fail");
    assert!(matches!(err, LlmError::RequestFailed { .. }));
    assert_eq!(err.to_string(), "OpenAI API request failed: Empty response");
    Ok(())
}

#[tokio::test]
async fn server_errors_are_retried() -> Result<()> {
    let server = stub_server(vec![
        (500, r#"{"error":"boom"}"#.to_string()),
        (200, completion(Some("ok"))),
    ])
    .await?;
    let provider = ProviderRegistry::default().create("OpenAI", settings(&server.endpoint))?;

    let content = provider.create_completion(request(None)).await?;
    assert_eq!(content, "ok");
    assert_eq!(server.requests.lock().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn auth_errors_are_not_retried() -> Result<()> {
    let server = stub_server(vec![
        (401, r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string()),
        (200, completion(Some("never reached"))),
    ])
    .await?;
    let provider = ProviderRegistry::default().create("OpenAI", settings(&server.endpoint))?;

    let err = provider
        .create_completion(request(None))
        .await
        .expect_err("401 must fail");
    let message = err.to_string();
    assert!(message.contains("authentication failed"), "{message}");
    assert!(message.contains("Incorrect API key provided"), "{message}");
    assert_eq!(server.requests.lock().await.len(), 1);
    Ok(())
}
