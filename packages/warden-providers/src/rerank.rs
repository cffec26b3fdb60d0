use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Endpoint, Result};

#[derive(Serialize)]
struct RerankRequest<'a> {
	model: &'a str,
	query: &'a str,
	documents: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
	#[serde(alias = "data")]
	results: Vec<RerankHit>,
}

#[derive(Deserialize)]
struct RerankHit {
	index: usize,
	#[serde(alias = "score")]
	relevance_score: f32,
}

/// Scores `docs` against `query`. Scores line up with `docs` by position and default to zero
/// for documents the provider leaves out.
pub async fn rerank(
	cfg: &warden_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	let endpoint = Endpoint {
		provider_id: &cfg.provider_id,
		api_base: &cfg.api_base,
		path: &cfg.path,
		api_key: &cfg.api_key,
		default_headers: &cfg.default_headers,
		timeout_ms: cfg.timeout_ms,
	};
	let request = RerankRequest { model: &cfg.model, query, documents: docs };
	let scores = parse_rerank_response(endpoint.post(&request).await?, docs.len())?;

	tracing::debug!(model = %cfg.model, count = scores.len(), "Rerank scores received.");

	Ok(scores)
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let response: RerankResponse = serde_json::from_value(json)?;
	let mut scores = vec![0.0_f32; doc_count];

	for hit in response.results {
		if let Some(slot) = scores.get_mut(hit.index) {
			*slot = hit.relevance_score;
		}
	}

	Ok(scores)
}
