//! Source text for ingestion. PDFs become one `## Page N` section per page with text, so the
//! heading chunker splits them at page boundaries. Anything else is read as UTF-8.

use std::{fs, path::Path};

use color_eyre::{Result, eyre};

pub fn read_source_text(file: &Path) -> Result<String> {
	if is_pdf(file) {
		let bytes = fs::read(file)
			.map_err(|err| eyre::eyre!("Failed to read {}: {err}", file.display()))?;
		let text = pdf_text(&bytes)
			.map_err(|err| eyre::eyre!("Failed to extract {}: {err}", file.display()))?;

		tracing::debug!(
			file = %file.display(),
			chars = text.chars().count(),
			"PDF text extracted."
		);

		return Ok(text);
	}

	fs::read_to_string(file).map_err(|err| eyre::eyre!("Failed to read {}: {err}", file.display()))
}

pub fn is_pdf(file: &Path) -> bool {
	file.extension()
		.and_then(|extension| extension.to_str())
		.is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
}

fn pdf_text(bytes: &[u8]) -> Result<String, pdf_extract::OutputError> {
	let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)?;

	Ok(pages_to_sections(&pages))
}

/// Page numbers are one-based and keep their position when blank pages are skipped.
fn pages_to_sections(pages: &[String]) -> String {
	pages
		.iter()
		.enumerate()
		.filter(|(_, page)| !page.trim().is_empty())
		.map(|(i, page)| format!("## Page {}\n\n{}", i + 1, page.trim()))
		.collect::<Vec<_>>()
		.join("\n\n")
}
