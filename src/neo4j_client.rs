use crate::config::AppConfig;
use anyhow::Result;
use neo4rs::{query, Graph};
use tracing::info;
use url::Url;

pub async fn connect_from_config(cfg: &AppConfig) -> Result<Graph> {
    let url = Url::parse(&cfg.neo4j_uri)?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    let addr = format!("{host}:{port}");

    info!("Conectando a Neo4j en {addr}...");
    let graph = Graph::new(&addr, &cfg.neo4j_user, &cfg.neo4j_password).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

/// Crea constraints e índices básicos para las etiquetas usadas en el grafo:
/// :Feedback, :Spot, :Guide y :Booking.
pub async fn ensure_schema(graph: &Graph) -> Result<()> {
    let statements = [
        // Feedback.id único
        "CREATE CONSTRAINT feedback_id IF NOT EXISTS
         FOR (f:Feedback)
         REQUIRE f.id IS UNIQUE",
        // Spot.id único
        "CREATE CONSTRAINT spot_id IF NOT EXISTS
         FOR (s:Spot)
         REQUIRE s.id IS UNIQUE",
        // Guide.id y Guide.email únicos
        "CREATE CONSTRAINT guide_id IF NOT EXISTS
         FOR (g:Guide)
         REQUIRE g.id IS UNIQUE",
        "CREATE CONSTRAINT guide_email IF NOT EXISTS
         FOR (g:Guide)
         REQUIRE g.email IS UNIQUE",
        // Booking.id único
        "CREATE CONSTRAINT booking_id IF NOT EXISTS
         FOR (b:Booking)
         REQUIRE b.id IS UNIQUE",
        // Índices de consulta para las reseñas. El índice por (autor, destino)
        // es deliberadamente NO único: se permiten varias reseñas del mismo
        // usuario sobre el mismo destino.
        "CREATE INDEX feedback_target IF NOT EXISTS
         FOR (f:Feedback)
         ON (f.target_type, f.target_id)",
        "CREATE INDEX feedback_author_target IF NOT EXISTS
         FOR (f:Feedback)
         ON (f.author_id, f.target_type, f.target_id)",
        "CREATE INDEX feedback_created_at IF NOT EXISTS
         FOR (f:Feedback)
         ON (f.created_at)",
    ];

    for stmt in statements {
        graph.run(query(stmt)).await?;
    }

    info!("Esquema de Neo4j asegurado (constraints e índices creados).");
    Ok(())
}
