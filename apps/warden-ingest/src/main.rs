use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = warden_ingest::Args::parse();

	warden_ingest::run(args).await
}
