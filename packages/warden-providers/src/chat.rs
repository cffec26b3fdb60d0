use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Endpoint, Result, invalid_response};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: Role,
	pub content: String,
}
impl ChatMessage {
	pub fn new(role: Role, content: impl Into<String>) -> Self {
		Self { role, content: content.into() }
	}
}

/// Token accounting as reported by the provider. Missing counters read as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
	pub prompt_tokens: u64,
	pub completion_tokens: u64,
	pub total_tokens: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
	pub text: String,
	pub usage: Usage,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
	model: &'a str,
	temperature: f32,
	messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
	choices: Vec<CompletionChoice>,
	#[serde(default)]
	usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
	message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
	// Null when the provider filtered the output.
	#[serde(default)]
	content: Option<String>,
}

pub async fn complete(
	cfg: &warden_config::LlmProviderConfig,
	messages: &[ChatMessage],
	temperature: f32,
) -> Result<Completion> {
	let endpoint = Endpoint {
		provider_id: &cfg.provider_id,
		api_base: &cfg.api_base,
		path: &cfg.path,
		api_key: &cfg.api_key,
		default_headers: &cfg.default_headers,
		timeout_ms: cfg.timeout_ms,
	};
	let request = CompletionRequest { model: &cfg.model, temperature, messages };
	let completion = parse_completion_response(endpoint.post(&request).await?)?;

	tracing::info!(
		model = %cfg.model,
		temperature,
		prompt_tokens = completion.usage.prompt_tokens,
		completion_tokens = completion.usage.completion_tokens,
		total_tokens = completion.usage.total_tokens,
		"Chat completion finished."
	);

	Ok(completion)
}

fn parse_completion_response(json: Value) -> Result<Completion> {
	let response: CompletionResponse = serde_json::from_value(json)?;
	let choice = response
		.choices
		.into_iter()
		.next()
		.ok_or_else(|| invalid_response("Completion response has no choices."))?;

	Ok(Completion {
		text: choice.message.content.unwrap_or_default(),
		usage: response.usage.unwrap_or_default(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_and_usage() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "role": "assistant", "content": "Use MFA [doc1]." } }
			],
			"usage": { "prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150 }
		});
		let parsed = parse_completion_response(json).expect("parse failed");

		assert_eq!(parsed.text, "Use MFA [doc1].");
		assert_eq!(
			parsed.usage,
			Usage { prompt_tokens: 100, completion_tokens: 50, total_tokens: 150 }
		);
	}

	#[test]
	fn null_content_and_missing_usage_default() {
		let json = serde_json::json!({
			"choices": [ { "message": { "role": "assistant", "content": null } } ]
		});
		let parsed = parse_completion_response(json).expect("parse failed");

		assert_eq!(parsed.text, "");
		assert_eq!(parsed.usage, Usage::default());
	}

	#[test]
	fn missing_or_empty_choices_is_an_error() {
		assert!(parse_completion_response(serde_json::json!({ "id": "x" })).is_err());
		assert!(parse_completion_response(serde_json::json!({ "choices": [] })).is_err());
	}

	#[test]
	fn partial_usage_fills_missing_counters_with_zero() {
		let json = serde_json::json!({
			"choices": [ { "message": { "content": "ok" } } ],
			"usage": { "total_tokens": 9 }
		});
		let parsed = parse_completion_response(json).expect("parse failed");

		assert_eq!(parsed.usage, Usage { prompt_tokens: 0, completion_tokens: 0, total_tokens: 9 });
	}

	#[test]
	fn roles_serialize_lowercase() {
		let message = ChatMessage::new(Role::System, "rules");

		assert_eq!(
			serde_json::to_value(&message).expect("serialize failed"),
			serde_json::json!({ "role": "system", "content": "rules" })
		);
	}
}
