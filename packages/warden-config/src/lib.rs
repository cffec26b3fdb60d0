mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, Ingestion, LlmProviderConfig, ProviderConfig,
	Providers, Qdrant, Retrieval, Service, Storage,
};

use std::{fs, path::Path};

const CLASSIFICATIONS: [&str; 3] = ["Public", "Internal", "Confidential"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("storage.qdrant.url", &cfg.storage.qdrant.url),
		("storage.qdrant.collection", &cfg.storage.qdrant.collection),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	let mut keys = vec![
		("embedding", &cfg.providers.embedding.api_key),
		("llm", &cfg.providers.llm.api_key),
	];

	if let Some(rerank) = cfg.providers.rerank.as_ref() {
		keys.push(("rerank", &rerank.api_key));
	}

	for (label, key) in keys {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.chunking.max_chunk_chars == 0 {
		return Err(Error::Validation {
			message: "chunking.max_chunk_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_chars >= cfg.chunking.max_chunk_chars {
		return Err(Error::Validation {
			message: "chunking.overlap_chars must be less than chunking.max_chunk_chars."
				.to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.candidate_k < cfg.retrieval.top_k {
		return Err(Error::Validation {
			message: "retrieval.candidate_k must be greater than or equal to retrieval.top_k."
				.to_string(),
		});
	}
	if cfg.ingestion.embed_batch_size == 0 {
		return Err(Error::Validation {
			message: "ingestion.embed_batch_size must be greater than zero.".to_string(),
		});
	}
	if !CLASSIFICATIONS.contains(&cfg.ingestion.default_classification.as_str()) {
		return Err(Error::Validation {
			message:
				"ingestion.default_classification must be one of Public, Internal, or Confidential."
					.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.rerank
		.as_ref()
		.map(|rerank| rerank.api_base.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.rerank = None;
	}

	cfg.service.allowed_origins.retain(|origin| !origin.trim().is_empty());
	cfg.ingestion.default_groups.retain(|group| !group.trim().is_empty());
}
