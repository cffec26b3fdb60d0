//! OpenAI-compatible HTTP clients for the embedding, chat completion and rerank providers.

pub mod chat;
pub mod embedding;
pub mod rerank;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde::Serialize;
use serde_json::{Map, Value};

const ERROR_BODY_LIMIT: usize = 512;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Value::String(raw) = value else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Connection settings shared by every provider kind.
pub(crate) struct Endpoint<'a> {
	pub provider_id: &'a str,
	pub api_base: &'a str,
	pub path: &'a str,
	pub api_key: &'a str,
	pub default_headers: &'a Map<String, Value>,
	pub timeout_ms: u64,
}
impl Endpoint<'_> {
	/// Posts `body` as JSON and returns the decoded response document.
	///
	/// Non-success statuses surface as [`Error::Status`] with a clipped copy of the body.
	pub(crate) async fn post<B>(&self, body: &B) -> Result<Value>
	where
		B: Serialize + ?Sized,
	{
		let client = Client::builder().timeout(Duration::from_millis(self.timeout_ms)).build()?;
		let res = client
			.post(format!("{}{}", self.api_base, self.path))
			.headers(auth_headers(self.api_key, self.default_headers)?)
			.json(body)
			.send()
			.await?;
		let status = res.status();

		if !status.is_success() {
			let text = res.text().await.unwrap_or_default();

			return Err(Error::Status {
				provider_id: self.provider_id.to_string(),
				status: status.as_u16(),
				body: text.chars().take(ERROR_BODY_LIMIT).collect(),
			});
		}

		Ok(res.json().await?)
	}
}

pub(crate) fn invalid_response(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}
