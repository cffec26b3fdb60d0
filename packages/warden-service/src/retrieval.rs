use std::{collections::HashMap, sync::Arc};

use qdrant_client::qdrant::{ScoredPoint, Value, point_id::PointIdOptions, value::Kind};
use serde::{Deserialize, Serialize};

use crate::{AccessFilter, BoxFuture, Error, RerankProvider, Result, SearchProvider};
use warden_config::ProviderConfig;
use warden_storage::qdrant::QdrantStore;

const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
	pub chunk_id: String,
	pub content: String,
	pub title: String,
	pub source_uri: String,
	/// Provider-defined relevance; only the order is meaningful.
	pub score: f32,
}

#[derive(Clone, Debug)]
pub struct HybridQuery {
	pub text: String,
	pub vector: Vec<f32>,
	pub filter: AccessFilter,
	pub top_k: u32,
	/// Pool handed to fusion and rerank before the cut to `top_k`.
	pub candidate_k: u32,
}
impl HybridQuery {
	pub fn new(
		text: impl Into<String>,
		vector: Vec<f32>,
		filter: AccessFilter,
		top_k: u32,
		candidate_k: u32,
	) -> Self {
		Self { text: text.into(), vector, filter, top_k, candidate_k: candidate_k.max(top_k) }
	}

	/// Size of the fused result: the whole pool when it is reranked afterwards, else `top_k`.
	pub fn fused_limit(&self, reranking: bool) -> u32 {
		if reranking { self.candidate_k } else { self.top_k }
	}
}

/// Runs one hybrid query and keeps at most `top_k` results in provider order.
pub async fn retrieve(
	search: &dyn SearchProvider,
	query: &HybridQuery,
) -> Result<Vec<SearchResult>> {
	if query.top_k == 0 {
		return Err(Error::InvalidRequest {
			message: "top_k must be greater than zero.".to_string(),
		});
	}

	let mut results = search.search(query).await?;

	results.truncate(query.top_k as usize);

	tracing::info!(
		filter = %query.filter,
		top_k = query.top_k,
		candidate_k = query.candidate_k,
		retrieval_count = results.len(),
		"Hybrid retrieval finished."
	);

	Ok(results)
}

/// Qdrant-backed hybrid search with optional rerank of the fused pool.
pub struct QdrantSearch {
	store: QdrantStore,
	rerank_cfg: Option<ProviderConfig>,
	reranker: Arc<dyn RerankProvider>,
}
impl QdrantSearch {
	pub fn new(
		store: QdrantStore,
		rerank_cfg: Option<ProviderConfig>,
		reranker: Arc<dyn RerankProvider>,
	) -> Self {
		Self { store, rerank_cfg, reranker }
	}

	async fn run(&self, query: &HybridQuery) -> Result<Vec<SearchResult>> {
		let limit = query.fused_limit(self.rerank_cfg.is_some());
		let points = self
			.store
			.hybrid_query(
				&query.text,
				&query.vector,
				&query.filter.to_qdrant(),
				query.candidate_k,
				limit,
			)
			.await
			.map_err(|err| Error::Search { message: err.to_string() })?;
		let results = points.iter().map(point_to_result).collect::<Result<Vec<_>>>()?;
		let Some(cfg) = self.rerank_cfg.as_ref() else {
			return Ok(results);
		};

		rerank_results(self.reranker.as_ref(), cfg, &query.text, results, query.top_k).await
	}
}
impl SearchProvider for QdrantSearch {
	fn search<'a>(&'a self, query: &'a HybridQuery) -> BoxFuture<'a, Result<Vec<SearchResult>>> {
		Box::pin(self.run(query))
	}
}

pub(crate) async fn rerank_results(
	reranker: &dyn RerankProvider,
	cfg: &ProviderConfig,
	query: &str,
	results: Vec<SearchResult>,
	top_k: u32,
) -> Result<Vec<SearchResult>> {
	if results.is_empty() {
		return Ok(results);
	}

	let docs: Vec<String> = results.iter().map(|result| result.content.clone()).collect();
	let scores = reranker.rerank(cfg, query, &docs).await?;

	if scores.len() != results.len() {
		return Err(Error::Provider {
			message: "Rerank provider returned mismatched score count.".to_string(),
		});
	}

	let mut scored: Vec<SearchResult> = results
		.into_iter()
		.zip(scores)
		.map(|(result, score)| SearchResult { score, ..result })
		.collect();

	// Stable: equal scores keep their fused order.
	scored.sort_by(|a, b| b.score.total_cmp(&a.score));
	scored.truncate(top_k as usize);

	Ok(scored)
}

fn point_to_result(point: &ScoredPoint) -> Result<SearchResult> {
	let chunk_id = point
		.id
		.as_ref()
		.and_then(|id| match &id.point_id_options {
			Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
			Some(PointIdOptions::Num(num)) => Some(num.to_string()),
			None => None,
		})
		.ok_or_else(|| Error::Search { message: "Search hit is missing its id.".to_string() })?;
	let content = payload_string(&point.payload, "content").ok_or_else(|| Error::Search {
		message: format!("Search hit {chunk_id} is missing content."),
	})?;

	Ok(SearchResult {
		title: payload_string(&point.payload, "title").unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
		source_uri: payload_string(&point.payload, "source_uri").unwrap_or_default(),
		score: point.score,
		chunk_id,
		content,
	})
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use qdrant_client::qdrant::PointId;
	use serde_json::Map;

	use super::*;

	/// Scores documents by a fixed table keyed on content.
	struct TableRerank {
		scores: Vec<(&'static str, f32)>,
		drop_last: bool,
	}
	impl RerankProvider for TableRerank {
		fn rerank<'a>(
			&'a self,
			_cfg: &'a ProviderConfig,
			_query: &'a str,
			docs: &'a [String],
		) -> BoxFuture<'a, Result<Vec<f32>>> {
			let mut scores: Vec<f32> = docs
				.iter()
				.map(|doc| {
					self.scores
						.iter()
						.find(|(content, _)| content == doc)
						.map(|(_, score)| *score)
						.unwrap_or(0.0)
				})
				.collect();

			if self.drop_last {
				scores.pop();
			}

			Box::pin(async move { Ok(scores) })
		}
	}

	fn rerank_cfg() -> ProviderConfig {
		ProviderConfig {
			provider_id: "test".to_string(),
			api_base: "http://127.0.0.1:1".to_string(),
			api_key: "test-key".to_string(),
			path: "/rerank".to_string(),
			model: "rerank-test".to_string(),
			timeout_ms: 1_000,
			default_headers: Map::new(),
		}
	}

	fn fused(contents: &[&str]) -> Vec<SearchResult> {
		contents
			.iter()
			.enumerate()
			.map(|(i, content)| SearchResult {
				chunk_id: format!("chunk-{i}"),
				content: content.to_string(),
				title: "Access Policy".to_string(),
				source_uri: "policies/access.md".to_string(),
				score: 1.0 / (i as f32 + 1.0),
			})
			.collect()
	}

	fn contents(results: &[SearchResult]) -> Vec<&str> {
		results.iter().map(|result| result.content.as_str()).collect()
	}

	#[tokio::test]
	async fn rerank_orders_by_descending_score_and_cuts_to_top_k() {
		let reranker = TableRerank {
			scores: vec![("a", 0.1), ("b", 0.9), ("c", 0.5), ("d", 0.7)],
			drop_last: false,
		};
		let pool = fused(&["a", "b", "c", "d"]);
		let results = rerank_results(&reranker, &rerank_cfg(), "mfa", pool, 3)
			.await
			.expect("rerank failed");

		assert_eq!(contents(&results), vec!["b", "d", "c"]);
		assert_eq!(results[0].score, 0.9);
		assert_eq!(results[0].chunk_id, "chunk-1");
	}

	#[tokio::test]
	async fn rerank_ties_keep_fused_order() {
		let reranker =
			TableRerank { scores: vec![("x", 0.4), ("y", 0.4), ("z", 0.4)], drop_last: false };
		let results = rerank_results(&reranker, &rerank_cfg(), "mfa", fused(&["x", "y", "z"]), 5)
			.await
			.expect("rerank failed");

		assert_eq!(contents(&results), vec!["x", "y", "z"]);
	}

	#[tokio::test]
	async fn rerank_score_count_mismatch_is_a_provider_error() {
		let reranker = TableRerank { scores: Vec::new(), drop_last: true };
		let err = rerank_results(&reranker, &rerank_cfg(), "mfa", fused(&["a", "b"]), 2)
			.await
			.expect_err("Expected a score count mismatch.");

		assert!(matches!(err, Error::Provider { .. }));
	}

	#[tokio::test]
	async fn rerank_of_empty_pool_is_empty() {
		let reranker = TableRerank { scores: Vec::new(), drop_last: true };
		let results = rerank_results(&reranker, &rerank_cfg(), "mfa", Vec::new(), 2)
			.await
			.expect("rerank failed");

		assert!(results.is_empty());
	}

	#[test]
	fn fused_limit_widens_only_when_reranking() {
		let query = HybridQuery::new("q", vec![0.0], AccessFilter::for_groups(["a"]), 5, 50);

		assert_eq!(query.fused_limit(false), 5);
		assert_eq!(query.fused_limit(true), 50);
	}

	fn point(payload: &[(&str, &str)]) -> ScoredPoint {
		ScoredPoint {
			id: Some(PointId::from("0b6c5b7c-0000-5000-8000-000000000001".to_string())),
			payload: payload
				.iter()
				.map(|(key, value)| (key.to_string(), Value::from(value.to_string())))
				.collect(),
			score: 0.42,
			..Default::default()
		}
	}

	#[test]
	fn converts_points_with_defaults() {
		let result = point_to_result(&point(&[("content", "MFA is required.")]))
			.expect("conversion failed");

		assert_eq!(result.chunk_id, "0b6c5b7c-0000-5000-8000-000000000001");
		assert_eq!(result.content, "MFA is required.");
		assert_eq!(result.title, "Unknown");
		assert_eq!(result.source_uri, "");
		assert_eq!(result.score, 0.42);
	}

	#[test]
	fn missing_content_is_a_search_error() {
		let err = point_to_result(&point(&[("title", "Access Policy")]))
			.expect_err("Expected missing content to fail.");

		assert!(matches!(err, Error::Search { .. }));
	}

	#[test]
	fn candidate_pool_never_shrinks_below_top_k() {
		let query = HybridQuery::new("q", vec![0.0], AccessFilter::for_groups(["a"]), 10, 3);

		assert_eq!(query.candidate_k, 10);
	}
}
