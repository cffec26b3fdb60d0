pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error(transparent)]
	HeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	HeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error(transparent)]
	Transport(#[from] reqwest::Error),
	#[error("Provider {provider_id} returned HTTP {status}: {body}")]
	Status { provider_id: String, status: u16, body: String },
	#[error("Malformed provider response: {0}")]
	Decode(#[from] serde_json::Error),
	#[error("{message}")]
	InvalidResponse { message: String },
}
