use neo4rs::Graph;
use std::sync::Arc;

use crate::{config::AppConfig, llm::LlmManager};

/// Dependencias compartidas de la aplicación, construidas una sola vez en el
/// arranque e inyectadas en cada handler. No hay estado global de módulo.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub graph: Arc<Graph>,
    pub llm_manager: LlmManager,
}
