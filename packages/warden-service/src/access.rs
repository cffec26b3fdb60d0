//! Security trimming: who may see which chunks.
//!
//! A chunk is visible when its classification is Public or when the user shares at least one
//! group with the chunk's `allowed_groups`. Users without groups see Public content only.

use std::{collections::BTreeSet, fmt};

use qdrant_client::qdrant::{Condition, Filter};
use serde::{Deserialize, Serialize};

use warden_storage::models::Classification;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
	pub user_id: String,
	pub name: String,
	pub email: String,
	pub groups: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessFilter {
	groups: Vec<String>,
}
impl AccessFilter {
	pub fn for_groups<I, S>(groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let groups: BTreeSet<String> = groups
			.into_iter()
			.map(|group| group.as_ref().trim().to_string())
			.filter(|group| !group.is_empty())
			.collect();

		Self { groups: groups.into_iter().collect() }
	}

	pub fn for_user(user: &UserClaims) -> Self {
		Self::for_groups(&user.groups)
	}

	pub fn groups(&self) -> &[String] {
		&self.groups
	}

	pub fn is_public_only(&self) -> bool {
		self.groups.is_empty()
	}

	pub fn permits(&self, classification: Classification, allowed_groups: &[String]) -> bool {
		classification == Classification::Public
			|| allowed_groups.iter().any(|group| self.groups.binary_search(group).is_ok())
	}

	/// Group ids travel as typed keyword values, so no id can change the filter's shape.
	pub fn to_qdrant(&self) -> Filter {
		let public = Condition::matches(
			"classification",
			Classification::Public.as_str().to_string(),
		);

		if self.is_public_only() {
			return Filter::must([public]);
		}

		Filter::should([public, Condition::matches("allowed_groups", self.groups.clone())])
	}
}
impl fmt::Display for AccessFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "classification eq '{}'", Classification::Public.as_str())?;

		if self.is_public_only() {
			return Ok(());
		}

		f.write_str(" or allowed_groups/any(g: ")?;

		for (i, group) in self.groups.iter().enumerate() {
			if i > 0 {
				f.write_str(" or ")?;
			}

			write!(f, "g eq '{}'", quote_literal(group))?;
		}

		f.write_str(")")
	}
}

fn quote_literal(raw: &str) -> String {
	raw.replace('\'', "''")
}

#[cfg(test)]
mod tests {
	use qdrant_client::qdrant::{condition::ConditionOneOf, r#match::MatchValue};

	use super::*;

	fn match_value(condition: &Condition) -> Option<(&str, &MatchValue)> {
		match condition.condition_one_of.as_ref()? {
			ConditionOneOf::Field(field) =>
				Some((field.key.as_str(), field.r#match.as_ref()?.match_value.as_ref()?)),
			_ => None,
		}
	}

	#[test]
	fn no_groups_means_public_only() {
		let filter = AccessFilter::for_groups(Vec::<String>::new());
		let qdrant = filter.to_qdrant();

		assert!(filter.is_public_only());
		assert!(qdrant.should.is_empty());
		assert_eq!(qdrant.must.len(), 1);
		assert_eq!(
			match_value(&qdrant.must[0]),
			Some(("classification", &MatchValue::Keyword("Public".to_string())))
		);
		assert_eq!(filter.to_string(), "classification eq 'Public'");
	}

	#[test]
	fn groups_widen_the_filter() {
		let filter = AccessFilter::for_groups(["security-team", "all-employees"]);
		let qdrant = filter.to_qdrant();

		assert!(qdrant.must.is_empty());
		assert_eq!(qdrant.should.len(), 2);

		let Some((key, MatchValue::Keywords(keywords))) = match_value(&qdrant.should[1]) else {
			panic!("Expected a match-any condition on allowed_groups.");
		};

		assert_eq!(key, "allowed_groups");
		assert_eq!(keywords.strings, vec!["all-employees", "security-team"]);
	}

	#[test]
	fn blank_and_duplicate_groups_are_dropped() {
		let filter = AccessFilter::for_groups(["b", " ", "a", "b", ""]);

		assert_eq!(filter.groups(), ["a".to_string(), "b".to_string()]);
	}

	#[test]
	fn quotes_cannot_break_out_of_the_expression() {
		let filter = AccessFilter::for_groups(["x') or (1 eq 1"]);

		assert_eq!(
			filter.to_string(),
			"classification eq 'Public' or allowed_groups/any(g: g eq 'x'') or (1 eq 1')"
		);

		let qdrant = filter.to_qdrant();
		let Some((_, MatchValue::Keywords(keywords))) = match_value(&qdrant.should[1]) else {
			panic!("Expected a match-any condition on allowed_groups.");
		};

		assert_eq!(keywords.strings, vec!["x') or (1 eq 1"]);
	}

	#[test]
	fn permits_follows_the_policy() {
		let none = AccessFilter::for_groups(Vec::<String>::new());
		let member = AccessFilter::for_groups(["hr"]);
		let hr_only = vec!["hr".to_string()];

		assert!(none.permits(Classification::Public, &[]));
		assert!(!none.permits(Classification::Internal, &hr_only));
		assert!(member.permits(Classification::Confidential, &hr_only));
		assert!(!member.permits(Classification::Internal, &["finance".to_string()]));
	}
}
