//! Recalcula la valoración media de un destino a partir de sus reseñas activas.

use neo4rs::{query, Graph};
use tracing::info;

use crate::error::ApiResult;
use crate::feedback::{self, FeedbackFilters};
use crate::models::{FeedbackRecord, TargetType};

/// Etiqueta del nodo que respalda cada tipo de destino con campo de
/// valoración. Los tipos sin almacén propio (vendor, product, transport)
/// no se actualizan.
fn rated_label(target_type: TargetType) -> Option<&'static str> {
    match target_type {
        TargetType::Spot => Some("Spot"),
        TargetType::Guide => Some("Guide"),
        TargetType::Booking => Some("Booking"),
        TargetType::Vendor | TargetType::Product | TargetType::Transport => None,
    }
}

/// Media aritmética y número de reseñas. `None` si no hay ninguna.
pub fn average_and_count(records: &[FeedbackRecord]) -> Option<(f64, i64)> {
    if records.is_empty() {
        return None;
    }
    let sum: i64 = records.iter().map(|r| r.rating).sum();
    Some((sum as f64 / records.len() as f64, records.len() as i64))
}

/// Recalcula la valoración del destino releyendo TODAS sus reseñas activas
/// (recomputación completa, no incremental: la operación es idempotente y
/// se autocorrige en la siguiente escritura si una ejecución anterior falló).
/// Si el destino no tiene reseñas, se deja tal cual.
pub async fn recompute(graph: &Graph, target_type: TargetType, target_id: &str) -> ApiResult<()> {
    let Some(label) = rated_label(target_type) else {
        return Ok(());
    };

    let records =
        feedback::query_feedback(graph, &FeedbackFilters::for_target(target_type, target_id))
            .await?;

    let Some((average, count)) = average_and_count(&records) else {
        return Ok(());
    };

    let cypher = format!(
        "MATCH (t:{label} {{id: $id}})
         SET t.average_rating = $average, t.rating_count = $count"
    );
    graph
        .run(
            query(&cypher)
                .param("id", target_id)
                .param("average", average)
                .param("count", count),
        )
        .await?;

    info!(
        "Valoración recalculada para {}/{}: media {:.2} sobre {} reseñas",
        target_type.as_str(),
        target_id,
        average,
        count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackCategory, Sentiment, SentimentLabel};

    fn record_con_rating(rating: i64) -> FeedbackRecord {
        FeedbackRecord {
            id: format!("id-{rating}"),
            author_id: "autor".to_string(),
            target_type: TargetType::Spot,
            target_id: "destino".to_string(),
            rating,
            title: None,
            comment: "comentario".to_string(),
            sentiment: Some(Sentiment {
                score: 0.0,
                label: SentimentLabel::Neutral,
                confidence: 0.5,
            }),
            categories: vec![FeedbackCategory::Experience],
            tags: vec!["general".to_string()],
            helpful_count: 0,
            helpful_voters: Vec::new(),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_media_y_recuento() {
        let records: Vec<_> = [2, 4, 4].into_iter().map(record_con_rating).collect();
        let (average, count) = average_and_count(&records).unwrap();
        assert_eq!(average, 10.0 / 3.0);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_sin_resenas_no_hay_media() {
        assert!(average_and_count(&[]).is_none());
    }

    #[test]
    fn test_recomputo_idempotente() {
        // Con los mismos datos, recalcular dos veces da el mismo resultado.
        let records: Vec<_> = [5, 3].into_iter().map(record_con_rating).collect();
        let primera = average_and_count(&records);
        let segunda = average_and_count(&records);
        assert_eq!(primera, segunda);
        assert_eq!(primera, Some((4.0, 2)));
    }

    #[test]
    fn test_tabla_de_destinos_valorables() {
        assert_eq!(rated_label(TargetType::Spot), Some("Spot"));
        assert_eq!(rated_label(TargetType::Guide), Some("Guide"));
        assert_eq!(rated_label(TargetType::Booking), Some("Booking"));
        assert_eq!(rated_label(TargetType::Vendor), None);
        assert_eq!(rated_label(TargetType::Product), None);
        assert_eq!(rated_label(TargetType::Transport), None);
    }
}
