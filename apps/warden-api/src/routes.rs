use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderMap, HeaderValue, Method, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{identity, state::AppState};
use warden_service::{ChatRequest, ChatResponse, Error};

pub fn router(state: AppState) -> Router {
	let cors = cors_layer(&state.service.cfg.service.allowed_origins);

	Router::new()
		.route("/health", get(health))
		.route("/v1/chat", post(chat))
		.layer(cors)
		.with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
	let origins: Vec<HeaderValue> = allowed_origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(value) => Some(value),
			Err(err) => {
				tracing::warn!(origin, error = %err, "Ignoring invalid CORS origin.");

				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([Method::GET, Method::POST])
		.allow_headers(Any)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
	let dev_identity = state.service.cfg.service.dev_identity;
	let Some(user) = identity::claims_from_headers(&headers, dev_identity) else {
		return Err(json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHENTICATED",
			"Authentication required.",
		));
	};
	let Json(payload) = payload.map_err(|rejection| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text())
	})?;
	let response = state.service.answer(payload, &user).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider call failed.");

				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", "Model provider call failed.")
			},
			Error::Search { message } => {
				tracing::error!(error = %message, "Search call failed.");

				json_error(StatusCode::BAD_GATEWAY, "SEARCH_ERROR", "Search provider call failed.")
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage call failed.");

				json_error(StatusCode::BAD_GATEWAY, "STORAGE_ERROR", "Storage call failed.")
			},
			Error::Integrity { message } => {
				tracing::error!(error = %message, "Integrity check failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTEGRITY_ERROR",
					"Internal integrity check failed.",
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
