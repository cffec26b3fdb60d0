use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture, ChunkIndex, ChunkRecord, Classification, EmbeddingProvider, Error, Providers,
	Result,
};
use warden_chunking::{Chunk, ChunkingConfig};
use warden_config::Config;
use warden_storage::qdrant::QdrantStore;

#[derive(Clone, Debug)]
pub struct Document {
	/// Stable identity; re-ingesting the same URI replaces the previous chunks.
	pub source_uri: String,
	pub title: String,
	pub source_file: String,
	pub text: String,
	pub classification: Classification,
	pub allowed_groups: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
	pub source_uri: String,
	pub chunk_count: usize,
	pub upserted: usize,
	pub pruned: u64,
}

pub struct Ingestor {
	pub cfg: Config,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub index: Arc<dyn ChunkIndex>,
}
impl Ingestor {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		Self { cfg, embedding: Providers::default().embedding, index: Arc::new(qdrant) }
	}

	pub fn with_providers(
		cfg: Config,
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn ChunkIndex>,
	) -> Self {
		Self { cfg, embedding, index }
	}

	pub async fn ingest(&self, document: Document) -> Result<IngestReport> {
		if document.source_uri.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "source_uri must be non-empty.".to_string(),
			});
		}

		let chunking = ChunkingConfig {
			max_chunk_chars: self.cfg.chunking.max_chunk_chars,
			overlap_chars: self.cfg.chunking.overlap_chars,
		};
		let chunks =
			warden_chunking::semantic_chunk(&document.text, &chunking, &document.source_file);

		ensure_contiguous(&chunks)?;

		if chunks.is_empty() {
			tracing::warn!(source_uri = %document.source_uri, "Document produced no chunks.");
		}

		let vectors = self.embed_chunks(&chunks).await?;
		let now = OffsetDateTime::now_utc();
		let records: Vec<ChunkRecord> = chunks
			.into_iter()
			.zip(vectors)
			.map(|(chunk, content_vector)| ChunkRecord {
				id: chunk_id_for(&document.source_uri, chunk.chunk_index),
				content: chunk.text,
				content_vector,
				title: document.title.clone(),
				source_uri: document.source_uri.clone(),
				chunk_index: chunk.chunk_index,
				heading: chunk.heading,
				last_updated: now,
				classification: document.classification,
				allowed_groups: document.allowed_groups.clone(),
			})
			.collect();

		self.index.upsert(&records).await?;

		let chunk_count = records.len();
		let first_stale = u32::try_from(chunk_count).map_err(|_| Error::Integrity {
			message: format!("Chunk count {chunk_count} exceeds supported range."),
		})?;
		let pruned = self.index.prune_from(&document.source_uri, first_stale).await?;

		tracing::info!(
			source_uri = %document.source_uri,
			classification = %document.classification,
			chunk_count,
			pruned,
			"Document ingested."
		);

		Ok(IngestReport {
			source_uri: document.source_uri,
			chunk_count,
			upserted: chunk_count,
			pruned,
		})
	}

	pub async fn delete(&self, source_uri: &str) -> Result<u64> {
		let deleted = self.index.delete_source(source_uri).await?;

		tracing::info!(source_uri, deleted, "Document deleted.");

		Ok(deleted)
	}

	async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
		let cfg = &self.cfg.providers.embedding;
		let expected_dim = self.cfg.storage.qdrant.vector_dim as usize;
		let batch_size = self.cfg.ingestion.embed_batch_size.max(1);
		let mut vectors = Vec::with_capacity(chunks.len());

		for batch in chunks.chunks(batch_size) {
			let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
			let embedded = self.embedding.embed_batch(cfg, &texts).await?;

			if embedded.len() != texts.len() {
				return Err(Error::Provider {
					message: format!(
						"Embedding provider returned {} vectors for {} texts.",
						embedded.len(),
						texts.len()
					),
				});
			}
			if embedded.iter().any(|vec| vec.len() != expected_dim) {
				return Err(Error::Provider {
					message: "Embedding vector dimension mismatch.".to_string(),
				});
			}

			vectors.extend(embedded);
		}

		Ok(vectors)
	}
}

pub fn chunk_id_for(source_uri: &str, chunk_index: u32) -> Uuid {
	let name = format!("{source_uri}_chunk_{chunk_index}");

	Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

/// Indices must be exactly `0..len` in order; anything else is an ingestion bug.
pub fn ensure_contiguous(chunks: &[Chunk]) -> Result<()> {
	for (expected, chunk) in chunks.iter().enumerate() {
		if chunk.chunk_index as usize != expected {
			return Err(Error::Integrity {
				message: format!(
					"Chunk index {} found at position {expected} in {}.",
					chunk.chunk_index, chunk.source_file
				),
			});
		}
	}

	Ok(())
}

impl ChunkIndex for QdrantStore {
	fn upsert<'a>(&'a self, records: &'a [ChunkRecord]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.upsert_chunks(records).await?) })
	}

	fn delete_source<'a>(&'a self, source_uri: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(QdrantStore::delete_source(self, source_uri).await?) })
	}

	fn prune_from<'a>(
		&'a self,
		source_uri: &'a str,
		first_stale: u32,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(QdrantStore::prune_from(self, source_uri, first_stale).await?) })
	}
}
