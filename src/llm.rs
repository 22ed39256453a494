//! Abstracción sobre Rig para trabajar con distintos proveedores de LLM.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use std::time::Duration;

use anyhow::Result;
use rig::completion::Prompt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::{AppConfig, LlmProvider};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    FeedbackAnalysis, FeedbackCategory, ItineraryRequest, Sentiment, SentimentLabel,
};

const ANALYSIS_PROMPT: &str = r#"
Analiza el texto de una reseña de cliente y determina:
1. Puntuación de sentimiento (-1 a 1, donde -1 es muy negativo, 0 neutro y 1 muy positivo).
2. Etiqueta de sentimiento (positive, neutral, negative).
3. Confianza (0 a 1).
4. Categorías relevantes (lista con valores de: cleanliness, service, value, location, food, amenities, staff, experience).
5. Etiquetas clave (lista de 3 a 5 palabras o frases importantes).

La salida DEBE ser un único objeto JSON válido con esta forma exacta. No incluyas explicaciones, solo el JSON:
{
  "sentiment": {
    "score": 0.0,
    "label": "neutral",
    "confidence": 0.0
  },
  "categories": ["categoria1", "categoria2"],
  "tags": ["tag1", "tag2", "tag3"]
}
"#;

const CHAT_PROMPT: &str = r#"
Eres el asistente virtual de un portal de promoción turística.
Respondes en español, de forma cercana y concisa, sobre destinos, guías,
reservas y experiencias locales. Si no conoces un dato, dilo explícitamente
en lugar de inventarlo.
"#;

const ITINERARY_PROMPT: &str = r#"
Eres un planificador de viajes. A partir de los destinos, la duración, el
presupuesto y los intereses del usuario, genera un itinerario día a día que
favorezca negocios y comunidades locales.

La salida DEBE ser un único objeto JSON válido, sin explicaciones, con esta forma:
{
  "destination": "...",
  "days": [
    { "day": 1, "title": "...", "activities": ["...", "..."] }
  ],
  "estimatedBudget": "...",
  "tips": ["...", "..."]
}
"#;

/// Gestor de LLMs: clasifica reseñas y atiende el chat y los itinerarios.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
    pub api_key_present: bool,
    pub timeout: Duration,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            api_key_present: cfg.llm_api_key.is_some(),
            timeout: Duration::from_secs(cfg.llm_timeout_secs),
        })
    }

    /// Indica si hay una capacidad de análisis configurada.
    pub fn is_configured(&self) -> bool {
        self.api_key_present
    }

    // ---------------------------------------------------------------------
    // ANÁLISIS DE RESEÑAS
    // ---------------------------------------------------------------------

    /// Analiza el texto de una reseña (título + comentario) y devuelve el
    /// juicio de sentimiento, categorías y etiquetas.
    ///
    /// Contrato de errores: texto vacío es `Validation`; servicio sin
    /// configurar o que no responde a tiempo es `ServiceUnavailable` (los
    /// llamadores del flujo de publicación lo sustituyen por el resultado
    /// neutro). Una respuesta del modelo que no se puede interpretar NO es
    /// un error: se degrada al resultado neutro y se deja constancia en el log.
    pub async fn classify_feedback(
        &self,
        title: Option<&str>,
        comment: &str,
    ) -> ApiResult<FeedbackAnalysis> {
        let text = format!("{} {}", title.unwrap_or(""), comment)
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(ApiError::Validation(
                "Se necesita texto para el análisis".to_string(),
            ));
        }

        if !self.is_configured() {
            return Err(ApiError::ServiceUnavailable(
                "El servicio de IA no está configurado para analizar reseñas".to_string(),
            ));
        }

        // Un único intento, sin reintentos.
        let response = self.prompt_with_timeout(ANALYSIS_PROMPT, &text).await?;

        match parse_analysis(&response) {
            Some(analysis) => Ok(analysis),
            None => {
                warn!(
                    "No se pudo parsear el JSON del análisis de sentimiento. Respuesta LLM: '{}'",
                    response
                );
                Ok(FeedbackAnalysis::neutral())
            }
        }
    }

    // ---------------------------------------------------------------------
    // CHAT E ITINERARIOS
    // ---------------------------------------------------------------------

    /// Responde a un mensaje del chat turístico.
    pub async fn chat(&self, message: &str) -> ApiResult<String> {
        if !self.is_configured() {
            return Err(ApiError::ServiceUnavailable(
                "El asistente de IA no está configurado".to_string(),
            ));
        }
        self.prompt_with_timeout(CHAT_PROMPT, message).await
    }

    /// Genera un itinerario estructurado. Si la respuesta del modelo no es
    /// JSON válido, se devuelve el texto crudo envuelto en un objeto en lugar
    /// de fallar.
    pub async fn generate_itinerary(&self, request: &ItineraryRequest) -> ApiResult<Value> {
        if !self.is_configured() {
            return Err(ApiError::ServiceUnavailable(
                "El planificador de IA no está configurado".to_string(),
            ));
        }

        let petition = format!(
            "Destinos: {}\nDuración: {} días\nPresupuesto: {}\nIntereses: {}",
            request.destinations.as_deref().unwrap_or("sin especificar"),
            request.days.as_deref().unwrap_or("sin especificar"),
            request.budget.as_deref().unwrap_or("sin especificar"),
            request.interests.as_deref().unwrap_or("sin especificar"),
        );

        let response = self.prompt_with_timeout(ITINERARY_PROMPT, &petition).await?;
        let cleaned = clean_model_json(&response);

        match serde_json::from_str::<Value>(cleaned) {
            Ok(itinerary) => Ok(itinerary),
            Err(err) => {
                warn!("El itinerario generado no es JSON válido ({err}); se devuelve como texto");
                Ok(json!({ "itinerary": response.trim() }))
            }
        }
    }

    // ---------------------------------------------------------------------
    // PROVEEDORES
    // ---------------------------------------------------------------------

    /// Lanza una petición al proveedor configurado acotada por el timeout.
    async fn prompt_with_timeout(&self, preamble: &str, input: &str) -> ApiResult<String> {
        match self.provider {
            LlmProvider::OpenAI => self.prompt_openai(preamble, input).await,
            ref other => Err(ApiError::ServiceUnavailable(format!(
                "Proveedor LLM {other:?} aún no implementado"
            ))),
        }
    }

    async fn prompt_openai(&self, preamble: &str, input: &str) -> ApiResult<String> {
        use rig::client::CompletionClient as _;
        use rig::providers::openai;

        let client = openai::Client::from_env();
        let agent = client
            .agent(&self.chat_model)
            .preamble(preamble)
            .build();

        match tokio::time::timeout(self.timeout, agent.prompt(input)).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(err)) => Err(ApiError::ServiceUnavailable(format!(
                "Error del proveedor LLM: {err}"
            ))),
            Err(_) => Err(ApiError::ServiceUnavailable(
                "La llamada al LLM superó el tiempo máximo de espera".to_string(),
            )),
        }
    }
}

// --- Limpieza y parseo de la respuesta del modelo ---

/// El modelo a veces envuelve el JSON en un bloque de código markdown;
/// se retiran los delimitadores antes de parsear.
pub fn clean_model_json(raw: &str) -> &str {
    let s = raw.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

#[derive(Debug, Deserialize)]
struct RawSentiment {
    score: f64,
    label: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    sentiment: RawSentiment,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Interpreta la respuesta cruda del modelo como un análisis de reseña.
/// Devuelve `None` si el JSON no tiene la forma esperada; los valores fuera
/// de rango se recortan y las categorías desconocidas se descartan.
pub fn parse_analysis(raw: &str) -> Option<FeedbackAnalysis> {
    let cleaned = clean_model_json(raw);
    let parsed: RawAnalysis = serde_json::from_str(cleaned).ok()?;
    let label = SentimentLabel::parse(&parsed.sentiment.label)?;

    let categories: Vec<FeedbackCategory> = parsed
        .categories
        .iter()
        .filter_map(|c| FeedbackCategory::parse(c))
        .collect();

    Some(FeedbackAnalysis {
        sentiment: Sentiment {
            score: parsed.sentiment.score.clamp(-1.0, 1.0),
            label,
            confidence: parsed.sentiment.confidence.clamp(0.0, 1.0),
        },
        categories,
        tags: parsed.tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPUESTA_MODELO: &str = r#"{
        "sentiment": { "score": 0.8, "label": "positive", "confidence": 0.9 },
        "categories": ["food", "service"],
        "tags": ["paella", "trato amable"]
    }"#;

    fn manager_sin_configurar() -> LlmManager {
        LlmManager {
            provider: LlmProvider::OpenAI,
            chat_model: "gpt-4o-mini".to_string(),
            api_key_present: false,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_limpieza_de_fences() {
        let con_fences = format!("```json\n{RESPUESTA_MODELO}\n```");
        assert_eq!(clean_model_json(&con_fences), RESPUESTA_MODELO.trim());
        assert_eq!(clean_model_json(RESPUESTA_MODELO), RESPUESTA_MODELO.trim());
        assert_eq!(clean_model_json("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_parse_con_fences_equivale_a_sin_fences() {
        let con_fences = format!("```json\n{RESPUESTA_MODELO}\n```");
        let a = parse_analysis(&con_fences).expect("debería parsear con fences");
        let b = parse_analysis(RESPUESTA_MODELO).expect("debería parsear sin fences");

        assert_eq!(a.sentiment.score, b.sentiment.score);
        assert_eq!(a.sentiment.label, b.sentiment.label);
        assert_eq!(a.sentiment.confidence, b.sentiment.confidence);
        assert_eq!(a.categories, b.categories);
        assert_eq!(a.tags, b.tags);
        assert_eq!(a.categories, vec![FeedbackCategory::Food, FeedbackCategory::Service]);
    }

    #[test]
    fn test_parse_invalido_devuelve_none() {
        assert!(parse_analysis("esto no es JSON").is_none());
        assert!(parse_analysis("{\"sentiment\": {}}").is_none());
        // Etiqueta fuera de la enumeración: también se considera no parseable.
        let mala_etiqueta = r#"{"sentiment": {"score": 0, "label": "happy", "confidence": 1}}"#;
        assert!(parse_analysis(mala_etiqueta).is_none());
    }

    #[test]
    fn test_valores_fuera_de_rango_se_recortan() {
        let exagerado = r#"{
            "sentiment": { "score": 3.5, "label": "positive", "confidence": -2.0 },
            "categories": ["food", "wifi"],
            "tags": []
        }"#;
        let analysis = parse_analysis(exagerado).unwrap();
        assert_eq!(analysis.sentiment.score, 1.0);
        assert_eq!(analysis.sentiment.confidence, 0.0);
        // "wifi" no pertenece a la enumeración y se descarta.
        assert_eq!(analysis.categories, vec![FeedbackCategory::Food]);
    }

    #[test]
    fn test_sin_configurar_devuelve_service_unavailable() {
        let manager = manager_sin_configurar();
        let result = tokio_test::block_on(manager.classify_feedback(None, "Un viaje estupendo"));
        assert!(matches!(result, Err(ApiError::ServiceUnavailable(_))));
    }

    #[test]
    fn test_texto_vacio_devuelve_validation() {
        // El texto vacío se rechaza antes de mirar la configuración.
        let manager = manager_sin_configurar();
        let result = tokio_test::block_on(manager.classify_feedback(Some("  "), "   "));
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
