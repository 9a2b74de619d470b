use anyhow::{anyhow, Result};
use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::models::PartialCellLayout;
use crate::services::layout::{HintRequest, LayoutHintProvider};

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Asks an OpenAI chat model to locate the fill cells described by the
/// instructions.
pub struct OpenAiLayoutHints {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiLayoutHints {
    pub fn new(api_key: &str, model: &str) -> Self {
        OpenAiLayoutHints {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    async fn call_openai(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI error {}: {}", status, body));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .first()
            .ok_or_else(|| anyhow!("Empty response"))?
            .message
            .content
            .trim()
            .to_string();
        Ok(content)
    }
}

#[async_trait]
impl LayoutHintProvider for OpenAiLayoutHints {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn parse(&self, request: &HintRequest<'_>) -> Result<PartialCellLayout> {
        let schema = layout_schema()?;
        let prompt = system_prompt();
        let user = user_prompt(request);

        let mut raw = self.call_openai(&prompt, &user).await?;
        let mut value = parse_json(&raw)?;

        if !schema.is_valid(&value) {
            debug!("OpenAI layout hint failed schema validation, asking for a fix");
            let fix_prompt = format!(
                "Fix this JSON so that it matches the schema exactly. Output JSON only. JSON:\n{}",
                raw
            );
            raw = self.call_openai(&prompt, &fix_prompt).await?;
            value = parse_json(&raw)?;
            if !schema.is_valid(&value) {
                return Err(anyhow!("JSON validation failed"));
            }
        }

        let layout: PartialCellLayout = serde_json::from_value(value)?;
        Ok(layout)
    }
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str::<Value>(raw).map_err(|e| anyhow!("Invalid JSON: {}", e))
}

fn layout_schema() -> Result<JSONSchema> {
    let span = json!({
        "type": ["object", "null"],
        "required": ["row", "startCol", "endCol"],
        "properties": {
            "row": {"type": "integer", "minimum": 1},
            "startCol": {"type": "string", "pattern": "^[A-Za-z]{1,3}$"},
            "endCol": {"type": "string", "pattern": "^[A-Za-z]{1,3}$"}
        }
    });
    let schema = json!({
        "type": "object",
        "properties": {
            "periodCell": {"type": ["string", "null"]},
            "dayNumberRange": span,
            "hoursRange": span,
            "styleRowRange": {
                "type": ["object", "null"],
                "required": ["start", "end"],
                "properties": {
                    "start": {"type": "integer", "minimum": 1},
                    "end": {"type": "integer", "minimum": 1}
                }
            },
            "columnMapping": {
                "type": ["object", "null"],
                "required": ["dateCol", "hoursCol", "startRow"],
                "properties": {
                    "dateCol": {"type": "string"},
                    "hoursCol": {"type": "string"},
                    "descriptionCol": {"type": ["string", "null"]},
                    "startRow": {"type": "integer", "minimum": 1}
                }
            },
            "hoursPerDay": {"type": ["number", "null"]},
            "stylingDisabled": {"type": ["boolean", "null"]}
        }
    });

    JSONSchema::compile(&schema).map_err(|e| anyhow!("Invalid JSON schema: {}", e))
}

fn user_prompt(request: &HintRequest<'_>) -> String {
    let days: Vec<String> = request
        .working_days
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    format!(
        "Client: {}\nMonth: {}\nWorking days: {}\nInstructions:\n{}",
        request.client_name,
        request.month,
        days.join(", "),
        request.prompt_text
    )
}

fn system_prompt() -> String {
    r#"You locate cells in a spreadsheet template for a monthly timesheet or invoice. Return JSON only.
Use exactly one of the two layouts:
- horizontal (one column per day): dayNumberRange and hoursRange as {"row", "startCol", "endCol"}
- vertical (one row per day): columnMapping as {"dateCol", "hoursCol", "descriptionCol", "startRow"}
Optional fields:
- periodCell (A1 address|null)
- styleRowRange ({"start", "end"}|null)
- hoursPerDay (number|null)
- stylingDisabled (true when told not to change styles or formatting)
Use null for anything the instructions do not state.
"#
    .to_string()
}
