use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
	Public,
	Internal,
	Confidential,
}
impl Classification {
	pub const ALL: [Self; 3] = [Self::Public, Self::Internal, Self::Confidential];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Public => "Public",
			Self::Internal => "Internal",
			Self::Confidential => "Confidential",
		}
	}
}
impl FromStr for Classification {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let trimmed = raw.trim();

		Self::ALL
			.into_iter()
			.find(|value| value.as_str().eq_ignore_ascii_case(trimmed))
			.ok_or_else(|| Error::InvalidArgument(format!("Unknown classification {raw:?}.")))
	}
}
impl fmt::Display for Classification {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One indexed chunk as persisted in the collection.
#[derive(Clone, Debug)]
pub struct ChunkRecord {
	pub id: Uuid,
	pub content: String,
	pub content_vector: Vec<f32>,
	pub title: String,
	pub source_uri: String,
	pub chunk_index: u32,
	pub heading: String,
	pub last_updated: OffsetDateTime,
	pub classification: Classification,
	pub allowed_groups: Vec<String>,
}
