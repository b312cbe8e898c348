use fin_advisor::workflows::advisor::{
    DecisionService, EvaluationConfig, InMemoryDecisionRepository, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) const DEFAULT_USER: &str = "local-owner";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type AdvisorService = DecisionService<InMemoryDecisionRepository>;

/// Decision service backed by the process-local store.
pub(crate) fn in_memory_service(
    config: EvaluationConfig,
) -> (Arc<AdvisorService>, Arc<InMemoryDecisionRepository>) {
    let repository = Arc::new(InMemoryDecisionRepository::default());
    let service = Arc::new(DecisionService::new(repository.clone(), config));
    (service, repository)
}

pub(crate) fn parse_user(raw: &str) -> Result<UserId, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("user id must not be blank".to_string());
    }
    Ok(UserId(trimmed.to_string()))
}
