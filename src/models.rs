//! Modelos de dominio del portal turístico: reseñas, destinos, guías y reservas.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Comprueba que un identificador tenga la forma esperada (UUID).
/// Los identificadores malformados en rutas de lectura no son un error:
/// se tratan como "no hay datos".
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

// --- Enumeraciones cerradas del dominio ---

/// Tipo de entidad sobre la que se puede dejar una reseña.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Spot,
    Guide,
    Vendor,
    Product,
    Transport,
    Booking,
}

impl TargetType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spot" => Some(Self::Spot),
            "guide" => Some(Self::Guide),
            "vendor" => Some(Self::Vendor),
            "product" => Some(Self::Product),
            "transport" => Some(Self::Transport),
            "booking" => Some(Self::Booking),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Guide => "guide",
            Self::Vendor => "vendor",
            Self::Product => "product",
            Self::Transport => "transport",
            Self::Booking => "booking",
        }
    }
}

/// Categorías temáticas que el análisis de IA puede asignar a una reseña.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Cleanliness,
    Service,
    Value,
    Location,
    Food,
    Amenities,
    Staff,
    Experience,
}

impl FeedbackCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cleanliness" => Some(Self::Cleanliness),
            "service" => Some(Self::Service),
            "value" => Some(Self::Value),
            "location" => Some(Self::Location),
            "food" => Some(Self::Food),
            "amenities" => Some(Self::Amenities),
            "staff" => Some(Self::Staff),
            "experience" => Some(Self::Experience),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cleanliness => "cleanliness",
            Self::Service => "service",
            Self::Value => "value",
            Self::Location => "location",
            Self::Food => "food",
            Self::Amenities => "amenities",
            Self::Staff => "staff",
            Self::Experience => "experience",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

// --- Análisis de sentimiento ---

/// Juicio estructurado de sentimiento sobre el texto de una reseña.
/// Invariantes: `score` en [-1, 1] y `confidence` en [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// Resultado completo del análisis de una reseña (real o por defecto).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    pub sentiment: Sentiment,
    pub categories: Vec<FeedbackCategory>,
    pub tags: Vec<String>,
}

impl FeedbackAnalysis {
    /// Resultado neutro que se aplica cuando el análisis no está disponible
    /// o la respuesta del modelo no se puede interpretar.
    pub fn neutral() -> Self {
        Self {
            sentiment: Sentiment {
                score: 0.0,
                label: SentimentLabel::Neutral,
                confidence: 0.5,
            },
            categories: vec![FeedbackCategory::Experience],
            tags: vec!["general".to_string()],
        }
    }
}

// --- Reseñas ---

/// Representa un nodo (:Feedback) en Neo4j.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub author_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub rating: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    pub categories: Vec<FeedbackCategory>,
    pub tags: Vec<String>,
    pub helpful_count: i64,
    pub helpful_voters: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload de creación de reseña tal y como llega por la API.
/// Todos los campos son opcionales para poder validar nosotros el orden
/// de los errores en lugar de delegarlo en el deserializador.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub author_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Reseña ya validada, lista para persistir.
#[derive(Debug, Clone)]
pub struct FeedbackDraft {
    pub author_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub rating: i64,
    pub title: Option<String>,
    pub comment: String,
}

impl NewFeedback {
    /// Valida el payload y devuelve el primer error encontrado, en este
    /// orden de prioridad: tipo de destino, identificador de destino,
    /// valoración, comentario.
    pub fn validate(&self) -> Result<FeedbackDraft, ApiError> {
        let target_type = self
            .target_type
            .as_deref()
            .and_then(TargetType::parse)
            .ok_or_else(|| {
                ApiError::Validation(
                    "Tipo de destino no válido (spot, guide, vendor, product, transport o booking)"
                        .to_string(),
                )
            })?;

        let target_id = self
            .target_id
            .as_deref()
            .filter(|id| is_valid_id(id))
            .ok_or_else(|| {
                ApiError::Validation("El identificador del destino no es válido".to_string())
            })?
            .to_string();

        let rating = self
            .rating
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| {
                ApiError::Validation("La valoración debe estar entre 1 y 5".to_string())
            })?;

        let comment = self
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ApiError::Validation("La reseña necesita un comentario".to_string())
            })?
            .to_string();

        if comment.chars().count() > 1000 {
            return Err(ApiError::Validation(
                "El comentario no puede superar los 1000 caracteres".to_string(),
            ));
        }

        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if let Some(t) = &title {
            if t.chars().count() > 100 {
                return Err(ApiError::Validation(
                    "El título no puede superar los 100 caracteres".to_string(),
                ));
            }
        }

        let author_id = self
            .author_id
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ApiError::Validation("Falta el autor de la reseña".to_string()))?
            .to_string();

        Ok(FeedbackDraft {
            author_id,
            target_type,
            target_id,
            rating,
            title,
            comment,
        })
    }
}

// --- Catálogo turístico ---

/// Representa un nodo (:Spot) en Neo4j.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpot {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub price: Option<f64>,
}

/// Representa un nodo (:Guide) en Neo4j.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub languages: Vec<String>,
    pub verified: bool,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuide {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub languages: Option<Vec<String>>,
}

/// Representa un nodo (:Booking) en Neo4j.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub spot_id: String,
    pub date: String,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user_id: Option<String>,
    pub spot_id: Option<String>,
    pub date: Option<String>,
}

// --- Planificador de itinerarios ---

/// Petición de itinerario, con la misma forma que el formulario del frontend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryRequest {
    pub destinations: Option<String>,
    pub days: Option<String>,
    pub budget: Option<String>,
    pub interests: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_base() -> NewFeedback {
        NewFeedback {
            author_id: Some("u-123".to_string()),
            target_type: Some("spot".to_string()),
            target_id: Some(Uuid::new_v4().to_string()),
            rating: Some(4),
            title: Some("Muy bien".to_string()),
            comment: Some("Una visita estupenda".to_string()),
        }
    }

    #[test]
    fn test_payload_valido() {
        let draft = payload_base().validate().expect("debería validar");
        assert_eq!(draft.target_type, TargetType::Spot);
        assert_eq!(draft.rating, 4);
        assert_eq!(draft.comment, "Una visita estupenda");
    }

    #[test]
    fn test_rechaza_rating_fuera_de_rango() {
        for rating in [0, 6, -1] {
            let mut payload = payload_base();
            payload.rating = Some(rating);
            let err = payload.validate().unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
    }

    #[test]
    fn test_rechaza_rating_ausente() {
        let mut payload = payload_base();
        payload.rating = None;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_prioridad_de_errores() {
        // Con varios campos mal, el primero reportado es el tipo de destino.
        let payload = NewFeedback {
            author_id: None,
            target_type: Some("castle".to_string()),
            target_id: Some("no-un-uuid".to_string()),
            rating: Some(99),
            title: None,
            comment: None,
        };
        match payload.validate().unwrap_err() {
            ApiError::Validation(msg) => assert!(msg.contains("Tipo de destino")),
            other => panic!("se esperaba error de validación, llegó {other:?}"),
        }

        // Corregido el tipo, el siguiente es el identificador.
        let payload = NewFeedback {
            target_type: Some("guide".to_string()),
            ..payload
        };
        match payload.validate().unwrap_err() {
            ApiError::Validation(msg) => assert!(msg.contains("identificador")),
            other => panic!("se esperaba error de validación, llegó {other:?}"),
        }
    }

    #[test]
    fn test_rechaza_comentario_vacio_o_largo() {
        let mut payload = payload_base();
        payload.comment = Some("   ".to_string());
        assert!(payload.validate().is_err());

        let mut payload = payload_base();
        payload.comment = Some("a".repeat(1001));
        assert!(payload.validate().is_err());

        let mut payload = payload_base();
        payload.comment = Some("a".repeat(1000));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_enumeraciones_cerradas() {
        assert_eq!(TargetType::parse("booking"), Some(TargetType::Booking));
        assert_eq!(TargetType::parse("Spot"), None);
        assert_eq!(FeedbackCategory::parse("food"), Some(FeedbackCategory::Food));
        assert_eq!(FeedbackCategory::parse("wifi"), None);
        assert_eq!(SentimentLabel::parse("negative"), Some(SentimentLabel::Negative));

        for tt in ["spot", "guide", "vendor", "product", "transport", "booking"] {
            assert_eq!(TargetType::parse(tt).unwrap().as_str(), tt);
        }
    }

    #[test]
    fn test_resultado_neutro() {
        let neutral = FeedbackAnalysis::neutral();
        assert_eq!(neutral.sentiment.score, 0.0);
        assert_eq!(neutral.sentiment.label, SentimentLabel::Neutral);
        assert_eq!(neutral.sentiment.confidence, 0.5);
        assert_eq!(neutral.categories, vec![FeedbackCategory::Experience]);
        assert_eq!(neutral.tags, vec!["general".to_string()]);
    }

    #[test]
    fn test_identificadores() {
        assert!(is_valid_id(&Uuid::new_v4().to_string()));
        assert!(!is_valid_id("not-a-valid-id"));
        assert!(!is_valid_id(""));
    }
}
