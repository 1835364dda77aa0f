use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use schemars::schema_for;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ComplianceAgent, ComplianceAssessment, ComplianceError, ComplianceInput};
use crate::config::Config;
use crate::openrouter::{Attribution, build_client, endpoint};

/// Name of the tool the model must call.
pub const SUBMIT_TOOL: &str = "submit_compliance_check";

const SYSTEM_PROMPT: &str = "You are a strict public-procurement reviewer. Assess whether the \
company can bid for the tender. You MUST report the result through the \
submit_compliance_check tool. Do not answer with text.";

const AGENT_TIMEOUT: Duration = Duration::from_secs(90);

/// [`ComplianceAgent`] backed by an OpenAI-compatible chat completions endpoint with a forced
/// tool call.
pub struct ChatComplianceAgent {
    client: Client,
    endpoint: String,
    model: String,
    parameters: Value,
}

impl ChatComplianceAgent {
    /// Agent calling `{base_url}/chat/completions` with `model`.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<&str>,
        attribution: &Attribution,
    ) -> Result<Self, ComplianceError> {
        let client = build_client(AGENT_TIMEOUT, api_key, attribution)
            .map_err(|err| ComplianceError::Agent(err.to_string()))?;
        let parameters = serde_json::to_value(schema_for!(ComplianceAssessment))
            .map_err(|err| ComplianceError::Agent(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint(base_url, "chat/completions"),
            model: model.into(),
            parameters,
        })
    }

    /// Agent configured through the `COMPLIANCE_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, ComplianceError> {
        Self::new(
            &config.compliance_base_url,
            config.compliance_model.clone(),
            config.compliance_api_key.as_deref(),
            &Attribution::from_config(config),
        )
    }

    fn request_body(&self, input: &ComplianceInput) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "TENDER TEXT:\n{}\n\nCOMPANY PROFILE:\n{}",
                        input.ocr_text.trim(),
                        input.profile_summary.trim()
                    )
                }
            ],
            "tools": [{
                "type": "function",
                "function": {
                    "name": SUBMIT_TOOL,
                    "description": "Submit the result of the compliance check.",
                    "parameters": self.parameters,
                }
            }],
            "tool_choice": { "type": "function", "function": { "name": SUBMIT_TOOL } }
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[async_trait]
impl ComplianceAgent for ChatComplianceAgent {
    async fn assess(&self, input: &ComplianceInput) -> Result<ComplianceAssessment, ComplianceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(input))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Compliance agent request failed");
            return Err(ComplianceError::Agent(format!("status {status}: {body}")));
        }

        let parsed: ChatResponse = response.json().await?;
        let call = parsed
            .choices
            .into_iter()
            .flat_map(|choice| choice.message.tool_calls)
            .find(|call| call.function.name == SUBMIT_TOOL)
            .ok_or_else(|| ComplianceError::Agent(format!("model did not call {SUBMIT_TOOL}")))?;

        serde_json::from_str(&call.function.arguments)
            .map_err(|err| ComplianceError::Agent(format!("invalid tool arguments: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn agent(server: &MockServer) -> ChatComplianceAgent {
        ChatComplianceAgent::new(
            &server.base_url(),
            "test-agent",
            Some("secret"),
            &Attribution::default(),
        )
        .expect("agent")
    }

    fn input() -> ComplianceInput {
        ComplianceInput {
            ocr_text: "Nachweis ISO 9001 erforderlich".into(),
            profile_summary: "Company: Tiefbau Nord GmbH, industry: [45233120], references: null"
                .into(),
        }
    }

    #[tokio::test]
    async fn forces_tool_call_and_parses_arguments() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer secret")
                    .body_contains("\"tool_choice\"")
                    .body_contains("\"name\":\"submit_compliance_check\"")
                    .body_contains("\"is_feasible\"")
                    .body_contains("ISO 9001");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {
                                    "name": "submit_compliance_check",
                                    "arguments": "{\"is_feasible\":false,\"blockers\":[\"ISO 9001\"]}"
                                }
                            }]
                        }
                    }]
                }));
            })
            .await;

        let verdict = agent(&server).assess(&input()).await.expect("verdict");
        mock.assert_async().await;
        assert_eq!(
            verdict,
            ComplianceAssessment {
                is_feasible: false,
                blockers: vec!["ISO 9001".into()],
            }
        );
    }

    #[tokio::test]
    async fn plain_text_answer_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "Looks fine to me." } }]
                }));
            })
            .await;

        let err = agent(&server).assess(&input()).await.expect_err("no tool call");
        assert!(err.to_string().contains("did not call submit_compliance_check"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let err = agent(&server).assess(&input()).await.expect_err("429");
        assert!(matches!(err, ComplianceError::Agent(message) if message.contains("rate limited")));
    }
}
