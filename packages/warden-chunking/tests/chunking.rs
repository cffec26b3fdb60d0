use warden_chunking::{Chunk, ChunkingConfig, semantic_chunk};

fn cfg(max_chunk_chars: usize, overlap_chars: usize) -> ChunkingConfig {
	ChunkingConfig { max_chunk_chars, overlap_chars }
}

fn body(chunk: &Chunk) -> &str {
	let prefix = format!("[{}] ", chunk.heading);

	if chunk.heading.is_empty() {
		chunk.text.as_str()
	} else {
		chunk.text.strip_prefix(prefix.as_str()).expect("Chunk text must carry its heading prefix.")
	}
}

#[test]
fn text_without_headings_is_one_trimmed_chunk() {
	let text = "\n   This is a simple paragraph about password policy.\n\nSecond line.  \n";
	let chunks = semantic_chunk(text, &ChunkingConfig::default(), "passwords.md");

	assert_eq!(chunks.len(), 1);
	assert_eq!(chunks[0].text, text.trim());
	assert_eq!(chunks[0].heading, "");
	assert_eq!(chunks[0].chunk_index, 0);
	assert_eq!(chunks[0].source_file, "passwords.md");
}

#[test]
fn headings_split_sections_with_contiguous_indices() {
	let text = "Preamble.\n\n# A\n\nContent A.\n\n## B\n\nContent B.\n\n### C\n\nContent C.";
	let chunks = semantic_chunk(text, &ChunkingConfig::default(), "policy.md");
	let indices: Vec<u32> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
	let headings: Vec<&str> = chunks.iter().map(|chunk| chunk.heading.as_str()).collect();

	assert_eq!(indices, vec![0, 1, 2, 3]);
	assert_eq!(headings, vec!["", "A", "B", "C"]);
	assert_eq!(chunks[0].text, "Preamble.");
	assert_eq!(chunks[2].text, "[B] Content B.");
}

#[test]
fn heading_without_content_emits_nothing() {
	let text = "## Empty\n\n   \n\n## Filled\n\nSomething.";
	let chunks = semantic_chunk(text, &ChunkingConfig::default(), "policy.md");

	assert_eq!(chunks.len(), 1);
	assert_eq!(chunks[0].heading, "Filled");
	assert_eq!(chunks[0].chunk_index, 0);
}

#[test]
fn blank_text_yields_no_chunks() {
	assert!(semantic_chunk("  \n\n \t", &ChunkingConfig::default(), "empty.md").is_empty());
	assert!(semantic_chunk("", &ChunkingConfig::default(), "empty.md").is_empty());
}

#[test]
fn large_section_splits_under_the_limit_with_overlap() {
	let paragraphs: Vec<String> =
		(0..12).map(|i| format!("Rule {i:02}: {}", "w".repeat(60))).collect();
	let text = format!("## Large Section\n\n{}", paragraphs.join("\n\n"));
	let config = cfg(200, 20);
	let chunks = semantic_chunk(&text, &config, "large.md");

	assert!(chunks.len() > 1);

	for (expected, chunk) in chunks.iter().enumerate() {
		assert_eq!(chunk.chunk_index as usize, expected);
		assert_eq!(chunk.heading, "Large Section");
		assert!(chunk.text.starts_with("[Large Section] "));
		assert!(body(chunk).chars().count() <= config.max_chunk_chars);
	}

	for pair in chunks.windows(2) {
		let previous = body(&pair[0]);
		let next = body(&pair[1]);
		let tail: String = previous.chars().skip(previous.chars().count() - 20).collect();

		assert!(next.starts_with(&tail), "Expected {next:?} to start with {tail:?}.");
	}
}

#[test]
fn oversized_single_paragraph_overflows_whole() {
	let giant = "Word ".repeat(500);
	let text = format!("## Giant\n\n{giant}");
	let chunks = semantic_chunk(&text, &cfg(500, 100), "giant.md");

	assert_eq!(chunks.len(), 1);
	assert_eq!(body(&chunks[0]), giant.trim());
}

#[test]
fn indices_run_across_sections() {
	let paragraphs = vec!["p".repeat(40); 4].join("\n\n");
	let text = format!("## One\n\n{paragraphs}\n\n## Two\n\nShort.\n\n## Three\n\n{paragraphs}");
	let chunks = semantic_chunk(&text, &cfg(90, 0), "multi.md");
	let indices: Vec<u32> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
	let expected: Vec<u32> = (0..chunks.len() as u32).collect();

	assert_eq!(indices, expected);
	assert_eq!(chunks.iter().filter(|chunk| chunk.heading == "Two").count(), 1);
	assert!(chunks.iter().all(|chunk| !chunk.text.trim().is_empty()));
}

#[test]
fn next_chunk_keeps_full_overlap_before_a_long_paragraph() {
	let text = format!("## Retention\n\n{}\n\n{}\n\nc", "a".repeat(60), "b".repeat(95));
	let chunks = semantic_chunk(&text, &cfg(100, 20), "retention.md");

	assert_eq!(chunks.len(), 3);
	assert_eq!(body(&chunks[0]), "a".repeat(60));
	assert_eq!(body(&chunks[1]), format!("{}\n\n{}", "a".repeat(20), "b".repeat(95)));
	assert_eq!(body(&chunks[2]), format!("{}\n\nc", "b".repeat(20)));
}
