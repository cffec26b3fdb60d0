//! Heading-aware chunking of extracted policy text.
//!
//! A document is cut into sections at markdown headings of depth one to three. Sections
//! within the size limit become one chunk; larger ones are packed paragraph by paragraph,
//! carrying a character tail of the previous chunk into the next. All sizes are counted in
//! characters.

use regex::Regex;

const HEADING_PATTERN: &str = r"(?m)^#{1,3}[ \t]+(.+)$";
const PARAGRAPH_SEPARATOR: &str = "\n\n";
const PARAGRAPH_SEPARATOR_CHARS: usize = 2;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_chunk_chars: usize,
	pub overlap_chars: usize,
}
impl Default for ChunkingConfig {
	fn default() -> Self {
		Self { max_chunk_chars: 1_000, overlap_chars: 100 }
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
	/// Chunk body, prefixed with `[heading] ` when the section has one.
	pub text: String,
	pub heading: String,
	pub source_file: String,
	/// Dense, zero-based position across the whole document.
	pub chunk_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Section<'a> {
	heading: &'a str,
	body: &'a str,
}

pub fn semantic_chunk(text: &str, cfg: &ChunkingConfig, source_file: &str) -> Vec<Chunk> {
	let mut chunks = Vec::new();
	let mut chunk_index = 0_u32;

	for section in split_sections(text) {
		let body = section.body.trim();

		if body.is_empty() {
			continue;
		}

		let prefix = if section.heading.is_empty() {
			String::new()
		} else {
			format!("[{}] ", section.heading)
		};
		let pieces = if char_len(body) <= cfg.max_chunk_chars {
			vec![body.to_string()]
		} else {
			split_paragraphs(body, cfg.max_chunk_chars, cfg.overlap_chars)
		};

		for piece in pieces {
			chunks.push(Chunk {
				text: format!("{prefix}{piece}"),
				heading: section.heading.to_string(),
				source_file: source_file.to_string(),
				chunk_index,
			});

			chunk_index += 1;
		}
	}

	tracing::debug!(source_file, chunk_count = chunks.len(), "Document chunked.");

	chunks
}

fn split_sections(text: &str) -> Vec<Section<'_>> {
	let heading_re = match Regex::new(HEADING_PATTERN) {
		Ok(re) => re,
		Err(err) => {
			tracing::error!(error = %err, "Heading pattern failed to compile.");

			return vec![Section { heading: "", body: text }];
		},
	};
	let mut sections = Vec::new();
	let mut heading = "";
	let mut last_end = 0_usize;

	for caps in heading_re.captures_iter(text) {
		let (Some(line), Some(title)) = (caps.get(0), caps.get(1)) else {
			continue;
		};
		let body = &text[last_end..line.start()];

		if !body.trim().is_empty() {
			sections.push(Section { heading, body });
		}

		heading = title.as_str().trim();
		last_end = line.end();
	}

	let rest = &text[last_end..];

	if !rest.trim().is_empty() {
		sections.push(Section { heading, body: rest });
	}

	sections
}

fn split_paragraphs(body: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
	let mut pieces = Vec::new();
	let mut current = String::new();
	let mut current_len = 0_usize;

	for paragraph in body.split(PARAGRAPH_SEPARATOR) {
		let paragraph = paragraph.trim();

		if paragraph.is_empty() {
			continue;
		}

		let paragraph_len = char_len(paragraph);

		if current.is_empty() {
			current.push_str(paragraph);

			current_len = paragraph_len;

			continue;
		}

		let combined = current_len + PARAGRAPH_SEPARATOR_CHARS + paragraph_len;

		if combined <= max_chars {
			current.push_str(PARAGRAPH_SEPARATOR);
			current.push_str(paragraph);

			current_len = combined;

			continue;
		}

		// The full tail is carried even when the seeded buffer then overflows.
		let tail = char_tail(&current, overlap_chars).to_string();

		pieces.push(std::mem::take(&mut current));

		if tail.is_empty() {
			current.push_str(paragraph);

			current_len = paragraph_len;
		} else {
			current_len = char_len(&tail) + PARAGRAPH_SEPARATOR_CHARS + paragraph_len;

			current.push_str(&tail);
			current.push_str(PARAGRAPH_SEPARATOR);
			current.push_str(paragraph);
		}
	}

	if !current.is_empty() {
		pieces.push(current);
	}

	pieces
}

fn char_len(text: &str) -> usize {
	text.chars().count()
}

fn char_tail(text: &str, count: usize) -> &str {
	if count == 0 {
		return "";
	}

	let total = char_len(text);

	if count >= total {
		return text;
	}

	match text.char_indices().nth(total - count) {
		Some((start, _)) => &text[start..],
		None => "",
	}
}
