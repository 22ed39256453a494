//! Persistencia de reseñas (:Feedback) en Neo4j: alta, consulta con filtros,
//! voto de utilidad y borrado lógico.

use chrono::{SecondsFormat, Utc};
use neo4rs::{query, Graph, Node};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    is_valid_id, FeedbackAnalysis, FeedbackCategory, FeedbackDraft, FeedbackRecord, Sentiment,
    SentimentLabel, TargetType,
};

/// Filtros de consulta, combinables de forma independiente.
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilters {
    pub target_type: Option<TargetType>,
    pub target_id: Option<String>,
    pub author_id: Option<String>,
    pub rating: Option<i64>,
    pub sentiment: Option<SentimentLabel>,
}

impl FeedbackFilters {
    /// Filtro por destino concreto (lo usan el agregador y las analíticas).
    pub fn for_target(target_type: TargetType, target_id: &str) -> Self {
        Self {
            target_type: Some(target_type),
            target_id: Some(target_id.to_string()),
            ..Self::default()
        }
    }
}

/// Persiste una reseña ya validada junto con su análisis (real o neutro)
/// y devuelve el registro almacenado.
pub async fn create_feedback(
    graph: &Graph,
    draft: &FeedbackDraft,
    analysis: &FeedbackAnalysis,
) -> ApiResult<FeedbackRecord> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let record = FeedbackRecord {
        id: Uuid::new_v4().to_string(),
        author_id: draft.author_id.clone(),
        target_type: draft.target_type,
        target_id: draft.target_id.clone(),
        rating: draft.rating,
        title: draft.title.clone(),
        comment: draft.comment.clone(),
        sentiment: Some(analysis.sentiment.clone()),
        categories: analysis.categories.clone(),
        tags: analysis.tags.clone(),
        helpful_count: 0,
        helpful_voters: Vec::new(),
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };

    let categories: Vec<String> = record
        .categories
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();

    graph
        .run(
            query(
                "CREATE (f:Feedback {
                    id: $id,
                    author_id: $author_id,
                    target_type: $target_type,
                    target_id: $target_id,
                    rating: $rating,
                    title: $title,
                    comment: $comment,
                    sentiment_score: $sentiment_score,
                    sentiment_label: $sentiment_label,
                    sentiment_confidence: $sentiment_confidence,
                    categories: $categories,
                    tags: $tags,
                    helpful_count: 0,
                    helpful_voters: [],
                    is_active: true,
                    created_at: $created_at,
                    updated_at: $updated_at
                })",
            )
            .param("id", record.id.clone())
            .param("author_id", record.author_id.clone())
            .param("target_type", record.target_type.as_str())
            .param("target_id", record.target_id.clone())
            .param("rating", record.rating)
            .param("title", record.title.clone().unwrap_or_default())
            .param("comment", record.comment.clone())
            .param("sentiment_score", analysis.sentiment.score)
            .param("sentiment_label", analysis.sentiment.label.as_str())
            .param("sentiment_confidence", analysis.sentiment.confidence)
            .param("categories", categories)
            .param("tags", record.tags.clone())
            .param("created_at", record.created_at.clone())
            .param("updated_at", record.updated_at.clone()),
        )
        .await?;

    Ok(record)
}

/// Consulta las reseñas activas que cumplen los filtros, ordenadas de más
/// reciente a más antigua.
pub async fn query_feedback(
    graph: &Graph,
    filters: &FeedbackFilters,
) -> ApiResult<Vec<FeedbackRecord>> {
    // Un targetId malformado no es un error: sencillamente no hay datos.
    if let Some(target_id) = &filters.target_id {
        if !is_valid_id(target_id) {
            return Ok(Vec::new());
        }
    }

    let cypher = filter_cypher(filters);
    let mut q = query(&cypher);
    if let Some(target_type) = filters.target_type {
        q = q.param("target_type", target_type.as_str());
    }
    if let Some(target_id) = &filters.target_id {
        q = q.param("target_id", target_id.clone());
    }
    if let Some(author_id) = &filters.author_id {
        q = q.param("author_id", author_id.clone());
    }
    if let Some(rating) = filters.rating {
        q = q.param("rating", rating);
    }
    if let Some(sentiment) = filters.sentiment {
        q = q.param("sentiment_label", sentiment.as_str());
    }

    let mut cursor = graph.execute(q).await?;
    let mut records = Vec::new();
    while let Some(row) = cursor.next().await? {
        if let Some(node) = row.get::<Node>("f") {
            if let Some(record) = record_from_node(&node) {
                records.push(record);
            }
        }
    }

    Ok(records)
}

/// Devuelve una reseña activa por su identificador.
pub async fn get_feedback(graph: &Graph, id: &str) -> ApiResult<FeedbackRecord> {
    let mut cursor = graph
        .execute(
            query("MATCH (f:Feedback {id: $id}) WHERE f.is_active = true RETURN f")
                .param("id", id),
        )
        .await?;

    cursor
        .next()
        .await?
        .and_then(|row| row.get::<Node>("f"))
        .as_ref()
        .and_then(record_from_node)
        .ok_or_else(|| ApiError::NotFound(format!("No existe la reseña {id}")))
}

/// Registra que un usuario encontró útil una reseña. Idempotente: si el
/// usuario ya había votado, no cambia nada.
pub async fn mark_helpful(graph: &Graph, id: &str, user_id: &str) -> ApiResult<FeedbackRecord> {
    let mut record = get_feedback(graph, id).await?;

    if !add_helpful_vote(&mut record.helpful_voters, user_id) {
        return Ok(record);
    }
    record.helpful_count = record.helpful_voters.len() as i64;
    record.updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    graph
        .run(
            query(
                "MATCH (f:Feedback {id: $id})
                 SET f.helpful_voters = $voters,
                     f.helpful_count = $count,
                     f.updated_at = $updated_at",
            )
            .param("id", id)
            .param("voters", record.helpful_voters.clone())
            .param("count", record.helpful_count)
            .param("updated_at", record.updated_at.clone()),
        )
        .await?;

    Ok(record)
}

/// Borrado lógico: la reseña deja de aparecer en las lecturas pero se
/// conserva en el almacén.
pub async fn deactivate_feedback(graph: &Graph, id: &str) -> ApiResult<FeedbackRecord> {
    let mut record = get_feedback(graph, id).await?;
    record.is_active = false;
    record.updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    graph
        .run(
            query(
                "MATCH (f:Feedback {id: $id})
                 SET f.is_active = false, f.updated_at = $updated_at",
            )
            .param("id", id)
            .param("updated_at", record.updated_at.clone()),
        )
        .await?;

    Ok(record)
}

/// Añade el voto de un usuario al conjunto de votantes si aún no estaba.
/// Devuelve `true` si el conjunto cambió. El contador se deriva siempre del
/// tamaño del conjunto, de modo que nunca se desincronizan.
pub fn add_helpful_vote(voters: &mut Vec<String>, user_id: &str) -> bool {
    if voters.iter().any(|v| v == user_id) {
        return false;
    }
    voters.push(user_id.to_string());
    true
}

fn filter_cypher(filters: &FeedbackFilters) -> String {
    let mut cypher = String::from("MATCH (f:Feedback) WHERE f.is_active = true");
    if filters.target_type.is_some() {
        cypher.push_str(" AND f.target_type = $target_type");
    }
    if filters.target_id.is_some() {
        cypher.push_str(" AND f.target_id = $target_id");
    }
    if filters.author_id.is_some() {
        cypher.push_str(" AND f.author_id = $author_id");
    }
    if filters.rating.is_some() {
        cypher.push_str(" AND f.rating = $rating");
    }
    if filters.sentiment.is_some() {
        cypher.push_str(" AND f.sentiment_label = $sentiment_label");
    }
    cypher.push_str(" RETURN f ORDER BY f.created_at DESC");
    cypher
}

fn record_from_node(node: &Node) -> Option<FeedbackRecord> {
    let target_type = TargetType::parse(&node.get::<String>("target_type")?)?;

    let sentiment = match (
        node.get::<f64>("sentiment_score"),
        node.get::<String>("sentiment_label")
            .as_deref()
            .and_then(SentimentLabel::parse),
        node.get::<f64>("sentiment_confidence"),
    ) {
        (Some(score), Some(label), Some(confidence)) => Some(Sentiment {
            score,
            label,
            confidence,
        }),
        _ => None,
    };

    let categories: Vec<FeedbackCategory> = node
        .get::<Vec<String>>("categories")
        .unwrap_or_default()
        .iter()
        .filter_map(|c| FeedbackCategory::parse(c))
        .collect();

    Some(FeedbackRecord {
        id: node.get("id")?,
        author_id: node.get("author_id")?,
        target_type,
        target_id: node.get("target_id")?,
        rating: node.get("rating")?,
        title: node.get::<String>("title").filter(|t| !t.is_empty()),
        comment: node.get("comment")?,
        sentiment,
        categories,
        tags: node.get("tags").unwrap_or_default(),
        helpful_count: node.get("helpful_count").unwrap_or_default(),
        helpful_voters: node.get("helpful_voters").unwrap_or_default(),
        is_active: node.get("is_active").unwrap_or(true),
        created_at: node.get("created_at").unwrap_or_default(),
        updated_at: node.get("updated_at").unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voto_util_idempotente() {
        let mut voters = Vec::new();

        assert!(add_helpful_vote(&mut voters, "ana"));
        assert!(add_helpful_vote(&mut voters, "luis"));
        assert_eq!(voters.len(), 2);

        // El mismo usuario no cuenta dos veces.
        assert!(!add_helpful_vote(&mut voters, "ana"));
        assert_eq!(voters.len(), 2);
        assert_eq!(voters, vec!["ana".to_string(), "luis".to_string()]);
    }

    #[test]
    fn test_cypher_sin_filtros() {
        let cypher = filter_cypher(&FeedbackFilters::default());
        assert_eq!(
            cypher,
            "MATCH (f:Feedback) WHERE f.is_active = true RETURN f ORDER BY f.created_at DESC"
        );
    }

    #[test]
    fn test_cypher_con_filtros_combinados() {
        let filters = FeedbackFilters {
            target_type: Some(TargetType::Spot),
            target_id: Some("x".to_string()),
            rating: Some(5),
            ..FeedbackFilters::default()
        };
        let cypher = filter_cypher(&filters);
        assert!(cypher.contains("f.target_type = $target_type"));
        assert!(cypher.contains("f.target_id = $target_id"));
        assert!(cypher.contains("f.rating = $rating"));
        assert!(!cypher.contains("f.author_id"));
        assert!(!cypher.contains("f.sentiment_label"));
        assert!(cypher.ends_with("ORDER BY f.created_at DESC"));
    }

    #[test]
    fn test_filtro_por_destino() {
        let filters = FeedbackFilters::for_target(TargetType::Guide, "abc");
        assert_eq!(filters.target_type, Some(TargetType::Guide));
        assert_eq!(filters.target_id.as_deref(), Some("abc"));
        assert!(filters.author_id.is_none());
        assert!(filters.rating.is_none());
    }
}
