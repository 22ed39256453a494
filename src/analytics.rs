//! Resúmenes agregados de reseñas por destino: distribuciones de valoración
//! y sentimiento, categorías más mencionadas y reseñas recientes.

use std::collections::BTreeMap;

use neo4rs::Graph;
use serde::Serialize;

use crate::error::ApiResult;
use crate::feedback::{self, FeedbackFilters};
use crate::models::{is_valid_id, FeedbackCategory, FeedbackRecord, SentimentLabel, TargetType};
use crate::rating;

/// Número de entradas en los listados del resumen (categorías y recientes).
const TOP_N: usize = 5;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentDistribution {
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: FeedbackCategory,
    pub count: i64,
}

/// Extracto de una reseña para la lista de recientes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFeedback {
    pub id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}

/// Resumen agregado de las reseñas activas de un destino.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFeedbackSummary {
    pub total_feedback: i64,
    pub average_rating: f64,
    pub rating_distribution: BTreeMap<i64, i64>,
    pub sentiment_distribution: SentimentDistribution,
    pub top_categories: Vec<CategoryCount>,
    pub recent_feedback: Vec<RecentFeedback>,
}

/// Resumen bien formado con todo a cero, para destinos sin reseñas o con
/// identificador malformado.
pub fn empty_summary() -> TargetFeedbackSummary {
    TargetFeedbackSummary {
        total_feedback: 0,
        average_rating: 0.0,
        rating_distribution: (1..=5).map(|r| (r, 0)).collect(),
        sentiment_distribution: SentimentDistribution::default(),
        top_categories: Vec::new(),
        recent_feedback: Vec::new(),
    }
}

/// Calcula el resumen de un destino. Un identificador malformado no es un
/// error: se devuelve el resumen a cero. Operación de sólo lectura.
pub async fn summarize(
    graph: &Graph,
    target_type: TargetType,
    target_id: &str,
) -> ApiResult<TargetFeedbackSummary> {
    if !is_valid_id(target_id) {
        return Ok(empty_summary());
    }

    let records =
        feedback::query_feedback(graph, &FeedbackFilters::for_target(target_type, target_id))
            .await?;
    Ok(summarize_records(&records))
}

/// Agregación pura sobre un conjunto de reseñas ya cargadas, que se asumen
/// ordenadas de más reciente a más antigua (el orden natural del almacén).
pub fn summarize_records(records: &[FeedbackRecord]) -> TargetFeedbackSummary {
    let mut summary = empty_summary();
    summary.total_feedback = records.len() as i64;

    if let Some((average, _)) = rating::average_and_count(records) {
        summary.average_rating = average;
    }

    let mut categories: Vec<CategoryCount> = Vec::new();
    for record in records {
        if let Some(slot) = summary.rating_distribution.get_mut(&record.rating) {
            *slot += 1;
        }

        // Las reseñas sin sentimiento no entran en ninguna de las cubetas.
        if let Some(sentiment) = &record.sentiment {
            match sentiment.label {
                SentimentLabel::Positive => summary.sentiment_distribution.positive += 1,
                SentimentLabel::Neutral => summary.sentiment_distribution.neutral += 1,
                SentimentLabel::Negative => summary.sentiment_distribution.negative += 1,
            }
        }

        for category in &record.categories {
            match categories.iter_mut().find(|c| c.category == *category) {
                Some(entry) => entry.count += 1,
                None => categories.push(CategoryCount {
                    category: *category,
                    count: 1,
                }),
            }
        }
    }

    // Orden descendente por recuento; la ordenación estable conserva la
    // primera aparición como criterio de desempate.
    categories.sort_by(|a, b| b.count.cmp(&a.count));
    categories.truncate(TOP_N);
    summary.top_categories = categories;

    summary.recent_feedback = records
        .iter()
        .take(TOP_N)
        .map(|record| RecentFeedback {
            id: record.id.clone(),
            rating: record.rating,
            comment: record.comment.clone(),
            created_at: record.created_at.clone(),
        })
        .collect();

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackRecord, Sentiment, TargetType};

    fn record(rating: i64, label: Option<SentimentLabel>, categories: Vec<FeedbackCategory>) -> FeedbackRecord {
        FeedbackRecord {
            id: format!("id-{rating}-{}", categories.len()),
            author_id: "autor".to_string(),
            target_type: TargetType::Spot,
            target_id: "destino".to_string(),
            rating,
            title: None,
            comment: format!("reseña con {rating} estrellas"),
            sentiment: label.map(|label| Sentiment {
                score: 0.0,
                label,
                confidence: 0.5,
            }),
            categories,
            tags: Vec::new(),
            helpful_count: 0,
            helpful_voters: Vec::new(),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_resumen_vacio() {
        let summary = empty_summary();
        assert_eq!(summary.total_feedback, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.rating_distribution.len(), 5);
        assert!(summary.rating_distribution.values().all(|&v| v == 0));
        assert!(summary.top_categories.is_empty());
        assert!(summary.recent_feedback.is_empty());
    }

    #[test]
    fn test_totales_consistentes() {
        let records = vec![
            record(5, Some(SentimentLabel::Positive), vec![FeedbackCategory::Food]),
            record(4, Some(SentimentLabel::Positive), vec![]),
            record(1, Some(SentimentLabel::Negative), vec![FeedbackCategory::Service]),
            record(3, None, vec![]),
        ];
        let summary = summarize_records(&records);

        assert_eq!(summary.total_feedback, 4);
        let suma_distribucion: i64 = summary.rating_distribution.values().sum();
        assert_eq!(suma_distribucion, summary.total_feedback);
        // La reseña sin sentimiento queda fuera de las tres cubetas.
        assert_eq!(summary.sentiment_distribution.positive, 2);
        assert_eq!(summary.sentiment_distribution.neutral, 0);
        assert_eq!(summary.sentiment_distribution.negative, 1);
    }

    #[test]
    fn test_distribucion_escenario_2_4_4() {
        let records = vec![
            record(2, None, vec![]),
            record(4, None, vec![]),
            record(4, None, vec![]),
        ];
        let summary = summarize_records(&records);

        assert_eq!(summary.average_rating, 10.0 / 3.0);
        assert_eq!(summary.rating_distribution[&1], 0);
        assert_eq!(summary.rating_distribution[&2], 1);
        assert_eq!(summary.rating_distribution[&3], 0);
        assert_eq!(summary.rating_distribution[&4], 2);
        assert_eq!(summary.rating_distribution[&5], 0);
    }

    #[test]
    fn test_resena_unica_de_cinco_estrellas() {
        let records = vec![record(5, Some(SentimentLabel::Neutral), vec![FeedbackCategory::Experience])];
        let summary = summarize_records(&records);

        assert_eq!(summary.total_feedback, 1);
        assert_eq!(summary.average_rating, 5.0);
        assert_eq!(summary.rating_distribution[&5], 1);
        assert_eq!(summary.sentiment_distribution.neutral, 1);
    }

    #[test]
    fn test_top_categorias_desempata_por_primera_aparicion() {
        let records = vec![
            record(4, None, vec![FeedbackCategory::Location, FeedbackCategory::Food]),
            record(5, None, vec![FeedbackCategory::Food, FeedbackCategory::Staff]),
            record(3, None, vec![FeedbackCategory::Staff]),
        ];
        let summary = summarize_records(&records);

        // food y staff empatan a 2; food apareció antes.
        assert_eq!(summary.top_categories[0].category, FeedbackCategory::Food);
        assert_eq!(summary.top_categories[0].count, 2);
        assert_eq!(summary.top_categories[1].category, FeedbackCategory::Staff);
        assert_eq!(summary.top_categories[1].count, 2);
        assert_eq!(summary.top_categories[2].category, FeedbackCategory::Location);
        assert_eq!(summary.top_categories[2].count, 1);
    }

    #[test]
    fn test_recientes_respeta_el_orden_y_el_limite() {
        let records: Vec<_> = (1..=7)
            .map(|i| {
                let mut r = record(5, None, vec![]);
                r.id = format!("id-{i}");
                r
            })
            .collect();
        let summary = summarize_records(&records);

        assert_eq!(summary.recent_feedback.len(), 5);
        assert_eq!(summary.recent_feedback[0].id, "id-1");
        assert_eq!(summary.recent_feedback[4].id, "id-5");
    }

    #[test]
    fn test_forma_json_del_resumen() {
        let value = serde_json::to_value(empty_summary()).unwrap();
        assert!(value.get("totalFeedback").is_some());
        assert!(value.get("averageRating").is_some());
        assert!(value.get("ratingDistribution").unwrap().get("1").is_some());
        assert!(value.get("ratingDistribution").unwrap().get("5").is_some());
        assert!(value.get("sentimentDistribution").unwrap().get("positive").is_some());
        assert_eq!(value.get("topCategories").unwrap().as_array().unwrap().len(), 0);
        assert_eq!(value.get("recentFeedback").unwrap().as_array().unwrap().len(), 0);
    }
}
