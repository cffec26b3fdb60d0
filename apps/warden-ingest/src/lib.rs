pub mod extract;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use warden_config::Ingestion;
use warden_service::{Classification, Document, Ingestor};
use warden_storage::qdrant::QdrantStore;

#[derive(Debug, Parser)]
#[command(
	version = warden_cli::VERSION,
	rename_all = "kebab",
	styles = warden_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create the collection and its payload indexes if missing.
	InitCollection,
	/// Chunk, embed, and index one PDF, text, or markdown document.
	Ingest {
		#[arg(long, value_name = "FILE")]
		file: PathBuf,
		/// Defaults to the file stem.
		#[arg(long)]
		title: Option<String>,
		/// Public, Internal, or Confidential.
		#[arg(long)]
		classification: Option<String>,
		/// Repeatable. Defaults to `ingestion.default_groups`.
		#[arg(long = "group", value_name = "GROUP")]
		groups: Vec<String>,
	},
	/// Remove every chunk of a document.
	Delete {
		#[arg(long, value_name = "URI")]
		source_uri: String,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = warden_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	match args.command {
		Command::InitCollection => {
			let created = qdrant.ensure_collection().await?;

			tracing::info!(
				collection = %config.storage.qdrant.collection,
				created,
				"Collection ready."
			);
		},
		Command::Ingest { file, title, classification, groups } => {
			let text = extract::read_source_text(&file)?;
			let document = build_document(
				&config.ingestion,
				&file,
				text,
				title,
				classification.as_deref(),
				groups,
			)?;
			let ingestor = Ingestor::new(config, qdrant);
			let report = ingestor.ingest(document).await?;

			tracing::info!(
				source_uri = %report.source_uri,
				chunk_count = report.chunk_count,
				pruned = report.pruned,
				"Ingestion finished."
			);
		},
		Command::Delete { source_uri } => {
			let ingestor = Ingestor::new(config, qdrant);
			let deleted = ingestor.delete(&source_uri).await?;

			tracing::info!(%source_uri, deleted, "Deletion finished.");
		},
	}

	Ok(())
}

pub fn build_document(
	cfg: &Ingestion,
	file: &Path,
	text: String,
	title: Option<String>,
	classification: Option<&str>,
	groups: Vec<String>,
) -> color_eyre::Result<Document> {
	let Some(file_name) = file.file_name().and_then(|name| name.to_str()) else {
		return Err(eyre::eyre!("{} has no usable file name.", file.display()));
	};
	let title = title
		.filter(|title| !title.trim().is_empty())
		.or_else(|| file.file_stem().and_then(|stem| stem.to_str()).map(str::to_string))
		.unwrap_or_else(|| file_name.to_string());
	let classification: Classification =
		classification.unwrap_or(cfg.default_classification.as_str()).parse()?;
	let groups: Vec<String> = groups.into_iter().filter(|group| !group.trim().is_empty()).collect();
	let allowed_groups = if groups.is_empty() { cfg.default_groups.clone() } else { groups };

	Ok(Document {
		source_uri: format!("{}{file_name}", cfg.source_uri_prefix),
		title,
		source_file: file_name.to_string(),
		text,
		classification,
		allowed_groups,
	})
}
