use std::sync::Arc;

use warden_service::PolicyAssistant;
use warden_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PolicyAssistant>,
}
impl AppState {
	pub fn new(config: warden_config::Config) -> color_eyre::Result<Self> {
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = PolicyAssistant::new(config, qdrant);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: PolicyAssistant) -> Self {
		Self { service: Arc::new(service) }
	}
}
