pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Search error: {message}")]
	Search { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Integrity error: {message}")]
	Integrity { message: String },
}
impl From<warden_providers::Error> for Error {
	fn from(err: warden_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<warden_storage::Error> for Error {
	fn from(err: warden_storage::Error) -> Self {
		match err {
			warden_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			warden_storage::Error::Qdrant(inner) => Self::Storage { message: inner.to_string() },
		}
	}
}
