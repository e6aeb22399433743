//! OpenAI-compatible Chat Completions backend.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::UnifiedToolCatalog;
use crate::error::{Result, SwitchboardError};
use crate::orchestrator::{ChatMessage, CompletionBackend, ModelTurn, Role, ToolCallRequest};

use super::http::{shared_client, status_to_error, Auth};

/// Completion backend speaking the Chat Completions wire format.
///
/// Covers both plain OpenAI-compatible endpoints and Azure OpenAI
/// deployments (which differ only in URL shape and auth header).
pub struct OpenAiBackend {
    model: String,
    url: String,
    auth: Auth,
}

impl OpenAiBackend {
    /// Backend for an OpenAI-compatible `/chat/completions` endpoint.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            model: model.into(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            auth: Auth::Bearer(api_key.into()),
        }
    }

    /// Backend for an Azure OpenAI deployment.
    pub fn azure(
        endpoint: &str,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
        api_version: &str,
    ) -> Self {
        let deployment = deployment.into();
        Self {
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            model: deployment,
            auth: Auth::ApiKey(api_key.into()),
        }
    }

    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        catalog: &UnifiedToolCatalog,
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = messages.iter().map(message_to_wire).collect();
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        if !catalog.is_empty() {
            body["tools"] = serde_json::json!(catalog.tools());
        }
        body
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        catalog: &UnifiedToolCatalog,
    ) -> Result<ModelTurn> {
        let body = self.build_request_body(messages, catalog);

        debug!(model = %self.model, messages = messages.len(), "chat completion request");

        let resp = shared_client()
            .post(&self.url)
            .headers(self.auth.headers())
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SwitchboardError::Api {
                status: 200,
                message: "No choices in completion response".into(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                // Arguments arrive as a JSON-encoded string; keep the raw
                // string if it fails to parse so the failure surfaces at
                // dispatch rather than here.
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            })
            .collect();

        Ok(ModelTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

fn message_to_wire(msg: &ChatMessage) -> serde_json::Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if msg.role == Role::Tool {
        return serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.content_text(),
        });
    }

    if !msg.tool_calls.is_empty() {
        let tool_calls: Vec<serde_json::Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments.to_string(),
                    },
                })
            })
            .collect();
        return serde_json::json!({
            "role": role,
            "content": msg.content,
            "tool_calls": tool_calls,
        });
    }

    serde_json::json!({ "role": role, "content": msg.content_text() })
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn empty_catalog() -> UnifiedToolCatalog {
        UnifiedToolCatalog::default()
    }

    #[test]
    fn azure_url_carries_deployment_and_api_version() {
        let backend = OpenAiBackend::azure(
            "https://myresource.openai.azure.com/",
            "gpt-4o",
            "key",
            "2024-06-01",
        );
        assert_eq!(
            backend.url,
            "https://myresource.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn tool_result_message_serializes_with_correlation_id() {
        let wire = message_to_wire(&ChatMessage::tool_result("call_0", "22C"));
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_0");
        assert_eq!(wire["content"], "22C");
    }

    #[test]
    fn assistant_tool_calls_serialize_with_stringified_arguments() {
        let message = ChatMessage::assistant_tool_calls(
            None,
            vec![ToolCallRequest {
                id: "call_0".into(),
                name: "WeatherServer_query_weather".into(),
                arguments: json!({ "city": "Beijing" }),
            }],
        );
        let wire = message_to_wire(&message);
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["content"], serde_json::Value::Null);
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], r#"{"city":"Beijing"}"#);
    }

    #[tokio::test]
    async fn complete_parses_a_final_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "hello there" } }],
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("gpt-4o", "sk-test", &server.uri());
        let turn = backend
            .complete(&[ChatMessage::user("hi")], &empty_catalog())
            .await
            .unwrap();

        assert_eq!(turn.content, "hello there");
        assert!(!turn.requests_tools());
    }

    #[tokio::test]
    async fn complete_parses_tool_calls_with_json_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc",
                            "type": "function",
                            "function": {
                                "name": "WeatherServer_query_weather",
                                "arguments": "{\"city\":\"Beijing\"}",
                            },
                        }],
                    },
                }],
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("gpt-4o", "sk-test", &server.uri());
        let turn = backend
            .complete(&[ChatMessage::user("weather?")], &empty_catalog())
            .await
            .unwrap();

        assert!(turn.requests_tools());
        assert_eq!(turn.tool_calls[0].id, "call_abc");
        assert_eq!(turn.tool_calls[0].name, "WeatherServer_query_weather");
        assert_eq!(turn.tool_calls[0].arguments, json!({ "city": "Beijing" }));
    }

    #[tokio::test]
    async fn request_body_carries_the_catalog_as_tools() {
        let entries = vec![json!({
            "type": "function",
            "function": {
                "name": "WeatherServer_query_weather",
                "description": "weather lookup",
                "input_schema": { "type": "object" },
            },
        })];
        let catalog = UnifiedToolCatalog::from_tools(crate::schema::translate(&entries));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "tools": [{
                    "type": "function",
                    "function": { "name": "WeatherServer_query_weather" },
                }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "ok" } }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("gpt-4o", "sk-test", &server.uri());
        backend
            .complete(&[ChatMessage::user("hi")], &catalog)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("gpt-4o", "sk-test", &server.uri());
        let err = backend
            .complete(&[ChatMessage::user("hi")], &empty_catalog())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwitchboardError::Api { status: 500, message } if message.contains("upstream down")
        ));
    }
}
