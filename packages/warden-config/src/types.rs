use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub ingestion: Ingestion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	#[serde(default)]
	pub allowed_origins: Vec<String>,
	/// Accept requests without forwarded identity headers as a local development user.
	#[serde(default)]
	pub dev_identity: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
	/// Optional. When present, the fused candidate pool is reranked before truncation.
	pub rerank: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Chunking {
	pub max_chunk_chars: usize,
	pub overlap_chars: usize,
}
impl Default for Chunking {
	fn default() -> Self {
		Self { max_chunk_chars: 1_000, overlap_chars: 100 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	/// Nearest-neighbor pool handed to fusion and rerank before the cut to `top_k`.
	pub candidate_k: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 5, candidate_k: 50 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Ingestion {
	pub embed_batch_size: usize,
	pub default_classification: String,
	pub default_groups: Vec<String>,
	pub source_uri_prefix: String,
}
impl Default for Ingestion {
	fn default() -> Self {
		Self {
			embed_batch_size: 16,
			default_classification: "Internal".to_string(),
			default_groups: vec!["all-employees".to_string()],
			source_uri_prefix: String::new(),
		}
	}
}
