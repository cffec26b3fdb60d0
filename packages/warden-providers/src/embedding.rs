use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Endpoint, Result, invalid_response};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
	model: &'a str,
	input: &'a [String],
	dimensions: u32,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
	/// Some providers omit it and rely on array order.
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Embeds `texts` in one request. Vectors come back in input order.
pub async fn embed(
	cfg: &warden_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let endpoint = Endpoint {
		provider_id: &cfg.provider_id,
		api_base: &cfg.api_base,
		path: &cfg.path,
		api_key: &cfg.api_key,
		default_headers: &cfg.default_headers,
		timeout_ms: cfg.timeout_ms,
	};
	let request = EmbeddingRequest { model: &cfg.model, input: texts, dimensions: cfg.dimensions };
	let vectors = parse_embedding_response(endpoint.post(&request).await?)?;

	if vectors.len() != texts.len() {
		return Err(invalid_response("Embedding response count does not match input count."));
	}

	tracing::debug!(model = %cfg.model, count = vectors.len(), "Embeddings generated.");

	Ok(vectors)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let response: EmbeddingResponse = serde_json::from_value(json)?;
	let mut items: Vec<(usize, Vec<f32>)> = response
		.data
		.into_iter()
		.enumerate()
		.map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
		.collect();

	items.sort_by_key(|(index, _)| *index);

	Ok(items.into_iter().map(|(_, embedding)| embedding).collect())
}
