pub mod access;
pub mod answer;
pub mod ingest;
pub mod retrieval;

mod error;

pub use access::{AccessFilter, UserClaims};
pub use answer::{
	ChatRequest, ChatResponse, Citation, ConversationTurn, REFUSAL_MESSAGE, SYSTEM_PROMPT, Source,
	TurnRole,
};
pub use error::{Error, Result};
pub use ingest::{Document, IngestReport, Ingestor};
pub use retrieval::{HybridQuery, QdrantSearch, SearchResult};
pub use warden_providers::chat::{ChatMessage, Completion, Role, Usage};
pub use warden_storage::models::{ChunkRecord, Classification};

use std::{future::Future, pin::Pin, sync::Arc};

use warden_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use warden_providers::{chat, embedding, rerank};
use warden_storage::qdrant::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// Order-preserving: vector `i` belongs to `texts[i]`.
	fn embed_batch<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			let texts = [text.to_string()];
			let vectors = self.embed_batch(cfg, &texts).await?;
			let Some(vector) = vectors.into_iter().next() else {
				return Err(Error::Provider {
					message: "Embedding provider returned no vectors.".to_string(),
				});
			};

			Ok(vector)
		})
	}
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		temperature: f32,
	) -> BoxFuture<'a, Result<Completion>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Hybrid search behind the access filter. Results come back highest relevance first.
pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, query: &'a HybridQuery) -> BoxFuture<'a, Result<Vec<SearchResult>>>;
}

/// Write side of the chunk index.
pub trait ChunkIndex
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, records: &'a [ChunkRecord]) -> BoxFuture<'a, Result<()>>;

	fn delete_source<'a>(&'a self, source_uri: &'a str) -> BoxFuture<'a, Result<u64>>;

	fn prune_from<'a>(
		&'a self,
		source_uri: &'a str,
		first_stale: u32,
	) -> BoxFuture<'a, Result<u64>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
		rerank: Arc<dyn RerankProvider>,
	) -> Self {
		Self { embedding, completion, rerank }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider.clone(), rerank: provider }
	}
}

pub struct PolicyAssistant {
	pub cfg: Config,
	pub search: Arc<dyn SearchProvider>,
	pub providers: Providers,
}
impl PolicyAssistant {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		let providers = Providers::default();
		let search = Arc::new(QdrantSearch::new(
			qdrant,
			cfg.providers.rerank.clone(),
			providers.rerank.clone(),
		));

		Self { cfg, search, providers }
	}

	pub fn with_providers(
		cfg: Config,
		search: Arc<dyn SearchProvider>,
		providers: Providers,
	) -> Self {
		Self { cfg, search, providers }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed_batch<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		temperature: f32,
	) -> BoxFuture<'a, Result<Completion>> {
		Box::pin(async move { Ok(chat::complete(cfg, messages, temperature).await?) })
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(rerank::rerank(cfg, query, docs).await?) })
	}
}
