use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tsap::gateway::{CompletionAdapter, GatewayConfig, NoopUsageSink, ProviderGateway};
use tsap::narrate::{NarrationError, Narrator, NarratorConfig};
use tsap::prompts::escape_xml_chars;
use tsap::AnalysisEngine;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn narrator(server: &MockServer) -> Narrator {
    let adapter =
        CompletionAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5)).unwrap();
    let gateway = ProviderGateway::with_config(
        adapter,
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 0,
            retry_base_delay: Duration::from_millis(0),
        },
    );
    Narrator::new(Arc::new(gateway))
}

#[tokio::test]
async fn narration_sends_grounded_prompt() {
    let server = MockServer::start().await;
    let report = AnalysisEngine::default().analyze_single("kai").unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "deepseek-chat", "max_tokens": 400 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "Dopamine gate unstable." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 100, "completion_tokens": 5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let narration = narrator(&server).narrate(&report).await.unwrap();
    assert_eq!(narration.text, "Dopamine gate unstable.");
    assert_eq!(narration.report_id, report.id());
    assert_eq!(narration.input_tokens, 100);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains(report.id()));
    assert!(user.contains("<subjects>kai</subjects>"));
    assert!(user.contains(&escape_xml_chars(report.analysis())));
}

#[tokio::test]
async fn empty_completion_is_empty_response() {
    let server = MockServer::start().await;
    let report = AnalysisEngine::default().analyze_attacker("kai").unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "   " }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 1, "completion_tokens": 0 }
        })))
        .mount(&server)
        .await;

    let err = narrator(&server).narrate(&report).await.unwrap_err();
    assert!(matches!(err, NarrationError::EmptyResponse));
}

#[tokio::test]
async fn streamed_deltas_accumulate() {
    let server = MockServer::start().await;
    let report = AnalysisEngine::default()
        .analyze_resonance("kai", "lin")
        .unwrap();

    let body = [
        r#"data: {"choices":[{"delta":{"content":"Sync "},"finish_reason":null}]}"#,
        r#"data: {"choices":[{"delta":{"content":"drift "},"finish_reason":null}]}"#,
        r#"data: {"choices":[{"delta":{"content":"detected."},"finish_reason":"stop"}]}"#,
        "data: [DONE]",
    ]
    .join("\n\n");

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let mut seen = String::new();
    let narration = narrator(&server)
        .narrate_streaming(&report, |d| seen.push_str(d))
        .await
        .unwrap();

    assert_eq!(seen, "Sync drift detected.");
    assert_eq!(narration.text, "Sync drift detected.");
}

#[tokio::test]
async fn custom_model_is_forwarded() {
    let server = MockServer::start().await;
    let report = AnalysisEngine::default()
        .analyze_versus("kai", "lin")
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "deepseek-reasoner" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "Outcome logged." }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 1, "completion_tokens": 2 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        CompletionAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5)).unwrap();
    let gateway = ProviderGateway::with_config(
        adapter,
        Arc::new(NoopUsageSink),
        GatewayConfig::default(),
    );
    let narrator = Narrator::with_config(
        Arc::new(gateway),
        NarratorConfig {
            model: "deepseek-reasoner".into(),
            ..NarratorConfig::default()
        },
    );
    let narration = narrator.narrate(&report).await.unwrap();
    assert_eq!(narration.model, "deepseek-reasoner");
}
