pub const DENSE_VECTOR_NAME: &str = "dense";
pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";

use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
		DeletePointsBuilder, Distance, Document, FieldType, Filter, Fusion, Modifier, PointStruct,
		PrefetchQueryBuilder, Query, QueryPointsBuilder, Range, ScoredPoint,
		SparseVectorParamsBuilder, SparseVectorsConfigBuilder, UpsertPointsBuilder, Value, Vector,
		VectorParamsBuilder, VectorsConfigBuilder,
	},
};
use serde_json::Value as JsonValue;
use time::format_description::well_known::Rfc3339;

use crate::{Error, Result, models::ChunkRecord};

const KEYWORD_INDEXES: [&str; 3] = ["classification", "allowed_groups", "source_uri"];

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &warden_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection with its dense and BM25 vectors plus the payload indexes the
	/// access filter and source pruning rely on. Returns `false` when it already exists.
	pub async fn ensure_collection(&self) -> Result<bool> {
		if self.client.collection_exists(self.collection.clone()).await? {
			tracing::info!(collection = %self.collection, "Collection already exists.");

			return Ok(false);
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

		sparse_vectors_config.add_named_vector_params(
			BM25_VECTOR_NAME,
			SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
		);

		let builder = CreateCollectionBuilder::new(self.collection.clone())
			.vectors_config(vectors_config)
			.sparse_vectors_config(sparse_vectors_config);

		self.client.create_collection(builder).await?;

		for field in KEYWORD_INDEXES {
			self.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(
						self.collection.clone(),
						field,
						FieldType::Keyword,
					)
					.wait(true),
				)
				.await?;
		}

		self.client
			.create_field_index(
				CreateFieldIndexCollectionBuilder::new(
					self.collection.clone(),
					"chunk_index",
					FieldType::Integer,
				)
				.wait(true),
			)
			.await?;

		tracing::info!(
			collection = %self.collection,
			vector_dim = self.vector_dim,
			"Collection created."
		);

		Ok(true)
	}

	pub async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
		if records.is_empty() {
			return Ok(());
		}

		let mut points = Vec::with_capacity(records.len());

		for record in records {
			let payload = Payload::from(record_payload(record)?);
			let mut vector_map = HashMap::new();

			vector_map
				.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(record.content_vector.clone()));
			vector_map.insert(
				BM25_VECTOR_NAME.to_string(),
				Vector::from(Document::new(record.content.clone(), BM25_MODEL)),
			);

			points.push(PointStruct::new(record.id.to_string(), vector_map, payload));
		}

		let upsert = UpsertPointsBuilder::new(self.collection.clone(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn count_source(&self, source_uri: &str) -> Result<u64> {
		let count = CountPointsBuilder::new(self.collection.clone())
			.filter(source_filter(source_uri))
			.exact(true);
		let response = self.client.count(count).await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}

	/// Removes every chunk of `source_uri` and returns how many were present.
	pub async fn delete_source(&self, source_uri: &str) -> Result<u64> {
		let existing = self.count_source(source_uri).await?;

		if existing == 0 {
			return Ok(0);
		}

		let delete = DeletePointsBuilder::new(self.collection.clone())
			.points(source_filter(source_uri))
			.wait(true);

		self.client.delete_points(delete).await?;

		Ok(existing)
	}

	/// Removes chunks of `source_uri` whose `chunk_index` is at or past `first_stale`.
	pub async fn prune_from(&self, source_uri: &str, first_stale: u32) -> Result<u64> {
		let filter = Filter::must([
			Condition::matches("source_uri", source_uri.to_string()),
			Condition::range(
				"chunk_index",
				Range { gte: Some(f64::from(first_stale)), ..Default::default() },
			),
		]);
		let count =
			CountPointsBuilder::new(self.collection.clone()).filter(filter.clone()).exact(true);
		let stale = self.client.count(count).await?.result.map(|result| result.count).unwrap_or(0);

		if stale == 0 {
			return Ok(0);
		}

		let delete = DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true);

		self.client.delete_points(delete).await?;

		Ok(stale)
	}

	/// Dense and BM25 prefetches under the same filter, fused with reciprocal rank fusion.
	///
	/// Each prefetch pulls `prefetch_k` neighbors; the fused result keeps `limit` points.
	pub async fn hybrid_query(
		&self,
		text: &str,
		vector: &[f32],
		filter: &Filter,
		prefetch_k: u32,
		limit: u32,
	) -> Result<Vec<ScoredPoint>> {
		let search = hybrid_request(&self.collection, text, vector, filter, prefetch_k, limit)?;
		let response = self.client.query(search).await?;

		Ok(response.result)
	}
}

fn hybrid_request(
	collection: &str,
	text: &str,
	vector: &[f32],
	filter: &Filter,
	prefetch_k: u32,
	limit: u32,
) -> Result<QueryPointsBuilder> {
	if limit == 0 {
		return Err(Error::InvalidArgument("Query limit must be greater than zero.".to_string()));
	}
	if prefetch_k < limit {
		return Err(Error::InvalidArgument(
			"Prefetch size must be at least the query limit.".to_string(),
		));
	}

	let dense_prefetch = PrefetchQueryBuilder::default()
		.query(Query::new_nearest(vector.to_vec()))
		.using(DENSE_VECTOR_NAME)
		.filter(filter.clone())
		.limit(prefetch_k as u64);
	let bm25_prefetch = PrefetchQueryBuilder::default()
		.query(Query::new_nearest(Document::new(text.to_string(), BM25_MODEL)))
		.using(BM25_VECTOR_NAME)
		.filter(filter.clone())
		.limit(prefetch_k as u64);

	Ok(QueryPointsBuilder::new(collection.to_string())
		.add_prefetch(dense_prefetch)
		.add_prefetch(bm25_prefetch)
		.with_payload(true)
		.query(Fusion::Rrf)
		.limit(limit as u64))
}

pub fn source_filter(source_uri: &str) -> Filter {
	Filter::must([Condition::matches("source_uri", source_uri.to_string())])
}

fn record_payload(record: &ChunkRecord) -> Result<HashMap<String, Value>> {
	let last_updated = record
		.last_updated
		.format(&Rfc3339)
		.map_err(|err| Error::InvalidArgument(format!("Failed to format last_updated: {err}")))?;
	let mut payload_map = HashMap::new();

	payload_map.insert("chunk_id".to_string(), Value::from(record.id.to_string()));
	payload_map.insert("content".to_string(), Value::from(record.content.clone()));
	payload_map.insert("title".to_string(), Value::from(record.title.clone()));
	payload_map.insert("source_uri".to_string(), Value::from(record.source_uri.clone()));
	payload_map.insert("chunk_index".to_string(), Value::from(record.chunk_index as i64));
	payload_map.insert("heading".to_string(), Value::from(record.heading.clone()));
	payload_map.insert("last_updated".to_string(), Value::from(last_updated));
	payload_map.insert(
		"classification".to_string(),
		Value::from(record.classification.as_str().to_string()),
	);
	payload_map.insert(
		"allowed_groups".to_string(),
		Value::from(JsonValue::from(record.allowed_groups.clone())),
	);

	Ok(payload_map)
}
