//! Grounded answer pipeline.
//!
//! Embed, retrieve, generate, then validate, strictly in order. Zero retrieval short-circuits
//! to the refusal without a generation call, and an answer without a valid citation is
//! replaced by the refusal.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
	ChatMessage, Error, PolicyAssistant, Result, Role, SearchResult, UserClaims,
	access::AccessFilter,
	retrieval::{self, HybridQuery},
};

pub const SYSTEM_PROMPT: &str = "\
You are the Security Policy Assistant, an AI that helps employees understand internal security \
policies.

Rules:
1. Answer ONLY using the provided policy excerpts below.
2. If the answer is NOT in the excerpts, respond exactly:
   \"I cannot find this information in the available security policies.\"
3. ALWAYS cite your sources using the [docN] tags shown before each excerpt.
4. Do NOT use your internal knowledge or information from the internet.
5. Be concise, accurate, and professional.
";
pub const REFUSAL_MESSAGE: &str = "I cannot find this information in the available security \
policies. Please contact the Security team for further assistance.";

const CITATION_PATTERN: &str = r"\[doc(\d+)\]";
const REFUSAL_MARKER: &str = "cannot find";
const HISTORY_TURNS: usize = 4;
const GENERATION_TEMPERATURE: f32 = 0.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
	User,
	Assistant,
}
impl From<TurnRole> for Role {
	fn from(role: TurnRole) -> Self {
		match role {
			TurnRole::User => Role::User,
			TurnRole::Assistant => Role::Assistant,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
	pub role: TurnRole,
	pub content: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatRequest {
	/// Oldest first; the last turn is the question being asked.
	pub messages: Vec<ConversationTurn>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
	pub chunk_id: String,
	pub title: String,
	pub source_uri: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
	pub tag: String,
	pub source: Source,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
	pub answer: String,
	pub citations: Vec<Citation>,
	pub retrieval_count: usize,
	pub model: String,
}
impl ChatResponse {
	fn refusal(retrieval_count: usize, model: String) -> Self {
		Self { answer: REFUSAL_MESSAGE.to_string(), citations: Vec::new(), retrieval_count, model }
	}
}

impl PolicyAssistant {
	pub async fn answer(&self, req: ChatRequest, user: &UserClaims) -> Result<ChatResponse> {
		let question = validate(&req, user)?;

		tracing::info!(
			user_id = %user.user_id,
			query_length = question.chars().count(),
			turn_count = req.messages.len(),
			"Answering question."
		);

		let vector =
			self.providers.embedding.embed(&self.cfg.providers.embedding, question).await?;

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let query = HybridQuery::new(
			question,
			vector,
			AccessFilter::for_user(user),
			self.cfg.retrieval.top_k,
			self.cfg.retrieval.candidate_k,
		);
		let results = retrieval::retrieve(self.search.as_ref(), &query).await?;

		if results.is_empty() {
			tracing::warn!(user_id = %user.user_id, "No results retrieved; returning refusal.");

			return Ok(ChatResponse::refusal(0, String::new()));
		}

		let (context, sources) = format_context(&results);
		let messages = build_messages(&context, &req.messages);
		let llm = &self.cfg.providers.llm;
		let completion =
			self.providers.completion.complete(llm, &messages, GENERATION_TEMPERATURE).await?;

		tracing::info!(
			user_id = %user.user_id,
			model = %llm.model,
			prompt_tokens = completion.usage.prompt_tokens,
			completion_tokens = completion.usage.completion_tokens,
			total_tokens = completion.usage.total_tokens,
			"Answer generated."
		);

		let citations = extract_citations(&completion.text, &sources);

		if !citations.is_empty() || is_refusal(&completion.text) {
			tracing::info!(
				user_id = %user.user_id,
				citation_count = citations.len(),
				refusal = citations.is_empty(),
				"Answer validated."
			);

			return Ok(ChatResponse {
				answer: completion.text,
				citations,
				retrieval_count: results.len(),
				model: llm.model.clone(),
			});
		}

		tracing::warn!(
			user_id = %user.user_id,
			"Answer generated without any valid citations; replacing with refusal."
		);

		Ok(ChatResponse::refusal(results.len(), llm.model.clone()))
	}
}

/// Returns the active question.
pub fn validate<'a>(req: &'a ChatRequest, user: &UserClaims) -> Result<&'a str> {
	if user.user_id.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "user_id must be non-empty.".to_string() });
	}

	let Some(last) = req.messages.last() else {
		return Err(Error::InvalidRequest {
			message: "messages must contain at least one turn.".to_string(),
		});
	};

	if last.role != TurnRole::User {
		return Err(Error::InvalidRequest {
			message: "The last turn must come from the user.".to_string(),
		});
	}
	if last.content.trim().is_empty() {
		return Err(Error::InvalidRequest {
			message: "The question must be non-empty.".to_string(),
		});
	}

	Ok(last.content.as_str())
}

/// Labels results `[doc1]`, `[doc2]`, … in retrieval order and maps each number to its source.
pub fn format_context(results: &[SearchResult]) -> (String, BTreeMap<usize, Source>) {
	let mut parts = Vec::with_capacity(results.len());
	let mut sources = BTreeMap::new();

	for (i, result) in results.iter().enumerate() {
		let number = i + 1;
		let content = result.content.replace(['\r', '\n'], " ");

		parts.push(format!("[doc{number}] (Source: {}): {}", result.title, content.trim()));
		sources.insert(
			number,
			Source {
				chunk_id: result.chunk_id.clone(),
				title: result.title.clone(),
				source_uri: result.source_uri.clone(),
			},
		);
	}

	(parts.join("\n\n"), sources)
}

pub fn build_messages(context: &str, conversation: &[ConversationTurn]) -> Vec<ChatMessage> {
	let Some((question, history)) = conversation.split_last() else {
		return vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)];
	};
	let history = &history[history.len().saturating_sub(HISTORY_TURNS)..];
	let mut messages = Vec::with_capacity(history.len() + 2);

	messages.push(ChatMessage::new(Role::System, SYSTEM_PROMPT));
	messages.extend(history.iter().map(|turn| ChatMessage::new(turn.role.into(), &turn.content)));
	messages.push(ChatMessage::new(
		Role::User,
		format!(
			"## Retrieved Policy Excerpts\n\n{context}\n\n## Question\n\n{}",
			question.content
		),
	));

	messages
}

/// Tags the model invented, or wrote with leading zeros, are dropped.
pub fn extract_citations(answer: &str, sources: &BTreeMap<usize, Source>) -> Vec<Citation> {
	let Ok(tag_re) = Regex::new(CITATION_PATTERN) else {
		tracing::error!("Citation pattern failed to compile.");

		return Vec::new();
	};
	let numbers: BTreeSet<usize> = tag_re
		.captures_iter(answer)
		.filter_map(|caps| caps.get(1))
		.filter(|digits| !digits.as_str().starts_with('0'))
		.filter_map(|digits| digits.as_str().parse().ok())
		.collect();

	numbers
		.into_iter()
		.filter_map(|number| {
			sources
				.get(&number)
				.map(|source| Citation { tag: format!("[doc{number}]"), source: source.clone() })
		})
		.collect()
}

/// Heuristic tied to the wording of the refusal sentence.
pub fn is_refusal(answer: &str) -> bool {
	answer.to_lowercase().contains(REFUSAL_MARKER)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn result(n: usize) -> SearchResult {
		SearchResult {
			chunk_id: format!("chunk-{n}"),
			content: format!("Line one of {n}.\nLine two."),
			title: format!("Policy {n}"),
			source_uri: format!("policies/{n}.md"),
			score: 1.0 / n as f32,
		}
	}

	fn turn(role: TurnRole, content: &str) -> ConversationTurn {
		ConversationTurn { role, content: content.to_string() }
	}

	fn user() -> UserClaims {
		UserClaims { user_id: "u-1".to_string(), ..Default::default() }
	}

	#[test]
	fn context_is_numbered_and_flattened() {
		let (context, sources) = format_context(&[result(1), result(2)]);

		assert_eq!(
			context,
			"[doc1] (Source: Policy 1): Line one of 1. Line two.\n\n\
			 [doc2] (Source: Policy 2): Line one of 2. Line two."
		);
		assert_eq!(sources.len(), 2);
		assert_eq!(sources[&2].chunk_id, "chunk-2");
	}

	#[test]
	fn history_is_capped_at_four_prior_turns() {
		let conversation: Vec<ConversationTurn> = (0..7)
			.map(|i| {
				let role = if i % 2 == 0 { TurnRole::User } else { TurnRole::Assistant };

				turn(role, &format!("turn {i}"))
			})
			.collect();
		let messages = build_messages("ctx", &conversation);

		assert_eq!(messages.len(), 6);
		assert_eq!(messages[0].role, Role::System);
		assert_eq!(messages[1].content, "turn 2");
		assert_eq!(messages[4].content, "turn 5");
		assert_eq!(messages[5].role, Role::User);
		assert!(messages[5].content.starts_with("## Retrieved Policy Excerpts\n\nctx"));
		assert!(messages[5].content.ends_with("## Question\n\nturn 6"));
	}

	#[test]
	fn citations_are_deduplicated_sorted_and_validated() {
		let (_, sources) = format_context(&[result(1), result(2)]);
		let citations =
			extract_citations("See [doc2], [doc1], [doc1], [doc7] and [doc01].", &sources);
		let tags: Vec<&str> = citations.iter().map(|citation| citation.tag.as_str()).collect();

		assert_eq!(tags, vec!["[doc1]", "[doc2]"]);
		assert_eq!(citations[0].source.title, "Policy 1");
	}

	#[test]
	fn citation_order_is_numeric() {
		let results: Vec<SearchResult> = (1..=10).map(result).collect();
		let (_, sources) = format_context(&results);
		let citations = extract_citations("[doc10] then [doc2]", &sources);
		let tags: Vec<&str> = citations.iter().map(|citation| citation.tag.as_str()).collect();

		assert_eq!(tags, vec!["[doc2]", "[doc10]"]);
	}

	#[test]
	fn refusal_detection_is_case_insensitive() {
		assert!(is_refusal(REFUSAL_MESSAGE));
		assert!(is_refusal("Sorry, I CANNOT FIND that."));
		assert!(!is_refusal("Passwords rotate every 90 days [doc1]."));
	}

	#[test]
	fn validation_rejects_malformed_requests() {
		let empty = ChatRequest { messages: Vec::new() };
		let assistant_last = ChatRequest {
			messages: vec![turn(TurnRole::User, "q"), turn(TurnRole::Assistant, "a")],
		};
		let blank = ChatRequest { messages: vec![turn(TurnRole::User, "  ")] };
		let ok = ChatRequest { messages: vec![turn(TurnRole::User, "What is MFA?")] };
		let anonymous = UserClaims::default();

		assert!(matches!(validate(&empty, &user()), Err(Error::InvalidRequest { .. })));
		assert!(matches!(validate(&assistant_last, &user()), Err(Error::InvalidRequest { .. })));
		assert!(matches!(validate(&blank, &user()), Err(Error::InvalidRequest { .. })));
		assert!(matches!(validate(&ok, &anonymous), Err(Error::InvalidRequest { .. })));
		assert_eq!(validate(&ok, &user()).ok(), Some("What is MFA?"));
	}
}
