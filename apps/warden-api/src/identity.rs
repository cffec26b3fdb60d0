//! Identity forwarded by the fronting authentication proxy.
//!
//! Tokens are validated upstream; this layer only reads the principal headers.

use axum::http::HeaderMap;

use warden_service::UserClaims;

pub const PRINCIPAL_ID_HEADER: &str = "x-ms-client-principal-id";
pub const PRINCIPAL_NAME_HEADER: &str = "x-ms-client-principal-name";
pub const PRINCIPAL_GROUPS_HEADER: &str = "x-ms-client-principal-groups";

const DEV_USER_ID: &str = "dev-user-001";
const DEV_GROUP: &str = "all-employees";

/// `None` when no principal is forwarded and the development identity is off.
pub fn claims_from_headers(headers: &HeaderMap, dev_identity: bool) -> Option<UserClaims> {
	let Some(user_id) = header_str(headers, PRINCIPAL_ID_HEADER).filter(|id| !id.is_empty())
	else {
		return dev_identity.then(dev_claims);
	};
	let name = header_str(headers, PRINCIPAL_NAME_HEADER).unwrap_or_default();
	let groups = header_str(headers, PRINCIPAL_GROUPS_HEADER)
		.map(|raw| {
			raw.split(',')
				.map(str::trim)
				.filter(|group| !group.is_empty())
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default();

	Some(UserClaims {
		user_id: user_id.to_string(),
		name: name.to_string(),
		email: name.to_string(),
		groups,
	})
}

fn dev_claims() -> UserClaims {
	UserClaims {
		user_id: DEV_USER_ID.to_string(),
		name: "Developer".to_string(),
		email: "dev@localhost".to_string(),
		groups: vec![DEV_GROUP.to_string()],
	}
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name).and_then(|value| value.to_str().ok()).map(str::trim)
}
