// Módulos de la aplicación
mod analytics;
mod api;
mod app_state;
mod catalog;
mod config;
mod error;
mod feedback;
mod llm;
mod models;
mod neo4j_client;
mod rating;

use crate::app_state::AppState;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().expect("Error al cargar la configuración");

    // 3. Conectar a Neo4j y asegurar el esquema
    let graph = neo4j_client::connect_from_config(&cfg)
        .await
        .expect("Error conectando a Neo4j");
    neo4j_client::ensure_schema(&graph)
        .await
        .expect("Error asegurando el esquema de Neo4j");

    // 4. Inicializar el gestor de LLMs
    let llm_manager = llm::LlmManager::from_config(&cfg).expect("Error inicializando LLM Manager");
    if !llm_manager.is_configured() {
        info!("Servicio de IA sin configurar: las reseñas recibirán el análisis neutro por defecto.");
    }

    // 5. Crear estado compartido de la aplicación
    let app_state = AppState {
        config: cfg,
        graph: Arc::new(graph),
        llm_manager,
    };

    // 6. Configurar el router de la API. El frontend se despliega aparte y
    // llama a esta API desde otro origen, así que el CORS es abierto.
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 7. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .expect("No se pudo abrir el puerto del servidor");
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .expect("Error del servidor HTTP");

    info!("✅ Servidor cerrado correctamente.");
}
