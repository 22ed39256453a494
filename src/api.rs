use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use neo4rs::query;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::{
    analytics::{self, TargetFeedbackSummary},
    app_state::AppState,
    catalog,
    error::ApiError,
    feedback::{self, FeedbackFilters},
    models::{
        Booking, FeedbackAnalysis, FeedbackRecord, Guide, ItineraryRequest, NewBooking,
        NewFeedback, NewGuide, NewSpot, SentimentLabel, Spot, TargetType,
    },
    rating,
};

// --- Payloads de la API ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackQuery {
    target_type: Option<String>,
    target_id: Option<String>,
    author_id: Option<String>,
    rating: Option<String>,
    sentiment: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulPayload {
    user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AnalyzePayload {
    title: Option<String>,
    comment: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatPayload {
    message: Option<String>,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route(
            "/api/feedback",
            post(create_feedback_handler).get(list_feedback_handler),
        )
        .route(
            "/api/feedback/analytics/:target_type/:target_id",
            get(feedback_analytics_handler),
        )
        .route(
            "/api/feedback/:id",
            get(get_feedback_handler).delete(delete_feedback_handler),
        )
        .route("/api/feedback/:id/helpful", patch(mark_helpful_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/spots", get(list_spots_handler).post(create_spot_handler))
        .route("/api/guides", get(list_guides_handler).post(create_guide_handler))
        .route(
            "/api/bookings",
            get(list_bookings_handler).post(create_booking_handler),
        )
        .route("/api/ai-chat", post(ai_chat_handler))
        .route("/api/generate-itinerary", post(generate_itinerary_handler))
        .with_state(app_state)
}

// --- Handlers de reseñas ---

/// Alta de reseña: valida, clasifica (con recurso al resultado neutro),
/// persiste y dispara el recálculo de la valoración del destino.
#[axum::debug_handler]
async fn create_feedback_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewFeedback>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    let draft = payload.validate()?;

    // El análisis nunca bloquea la publicación: si el servicio no está
    // configurado, no responde a tiempo o falla, se aplica el resultado neutro.
    let analysis = match state
        .llm_manager
        .classify_feedback(draft.title.as_deref(), &draft.comment)
        .await
    {
        Ok(analysis) => analysis,
        Err(err) => {
            warn!("Análisis no disponible, se aplica el resultado neutro: {err}");
            FeedbackAnalysis::neutral()
        }
    };

    let record = feedback::create_feedback(&state.graph, &draft, &analysis).await?;

    // La reseña ya está publicada; un fallo aquí no debe deshacerla.
    if let Err(err) = rating::recompute(&state.graph, record.target_type, &record.target_id).await
    {
        error!(
            "No se pudo recalcular la valoración de {}/{}: {err}",
            record.target_type.as_str(),
            record.target_id
        );
    }

    Ok(Json(record))
}

#[axum::debug_handler]
async fn list_feedback_handler(
    State(state): State<AppState>,
    Query(params): Query<FeedbackQuery>,
) -> Result<Json<Vec<FeedbackRecord>>, ApiError> {
    let mut filters = FeedbackFilters::default();

    // Filtros malformados en la ruta de lectura equivalen a "no hay datos".
    if let Some(raw) = &params.target_type {
        match TargetType::parse(raw) {
            Some(target_type) => filters.target_type = Some(target_type),
            None => return Ok(Json(Vec::new())),
        }
    }
    if let Some(raw) = &params.rating {
        match raw.parse::<i64>() {
            Ok(rating) => filters.rating = Some(rating),
            Err(_) => return Ok(Json(Vec::new())),
        }
    }
    if let Some(raw) = &params.sentiment {
        match SentimentLabel::parse(raw) {
            Some(label) => filters.sentiment = Some(label),
            None => return Ok(Json(Vec::new())),
        }
    }
    filters.target_id = params.target_id.clone();
    filters.author_id = params.author_id.clone();

    let records = feedback::query_feedback(&state.graph, &filters).await?;
    Ok(Json(records))
}

#[axum::debug_handler]
async fn get_feedback_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    let record = feedback::get_feedback(&state.graph, &id).await?;
    Ok(Json(record))
}

#[axum::debug_handler]
async fn delete_feedback_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    let record = feedback::deactivate_feedback(&state.graph, &id).await?;
    Ok(Json(record))
}

#[axum::debug_handler]
async fn mark_helpful_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<HelpfulPayload>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    let user_id = payload
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el usuario del voto".to_string()))?;

    let record = feedback::mark_helpful(&state.graph, &id, user_id).await?;
    Ok(Json(record))
}

#[axum::debug_handler]
async fn feedback_analytics_handler(
    State(state): State<AppState>,
    Path((target_type, target_id)): Path<(String, String)>,
) -> Result<Json<TargetFeedbackSummary>, ApiError> {
    // Un tipo desconocido recibe el mismo trato que un id malformado:
    // resumen a cero, no un error.
    let Some(target_type) = TargetType::parse(&target_type) else {
        return Ok(Json(analytics::empty_summary()));
    };

    let summary = analytics::summarize(&state.graph, target_type, &target_id).await?;
    Ok(Json(summary))
}

// --- Handlers de IA ---

/// Análisis de texto bajo demanda. Si el servicio no está configurado se
/// devuelve el resultado neutro con 200, que es lo que espera el flujo de
/// publicación de reseñas; el texto vacío sí es un 400.
#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzePayload>,
) -> Result<Json<FeedbackAnalysis>, ApiError> {
    let comment = payload.comment.as_deref().unwrap_or("");

    match state
        .llm_manager
        .classify_feedback(payload.title.as_deref(), comment)
        .await
    {
        Ok(analysis) => Ok(Json(analysis)),
        Err(err @ ApiError::Validation(_)) => Err(err),
        Err(err) => {
            warn!("Análisis no disponible, se devuelve el resultado neutro: {err}");
            Ok(Json(FeedbackAnalysis::neutral()))
        }
    }
}

#[axum::debug_handler]
async fn ai_chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el mensaje".to_string()))?;

    let reply = state.llm_manager.chat(message).await?;
    Ok(Json(json!({ "reply": reply })))
}

#[axum::debug_handler]
async fn generate_itinerary_handler(
    State(state): State<AppState>,
    Json(payload): Json<ItineraryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload
        .destinations
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .is_none()
    {
        return Err(ApiError::Validation(
            "Faltan los destinos del itinerario".to_string(),
        ));
    }

    let itinerary = state.llm_manager.generate_itinerary(&payload).await?;
    Ok(Json(itinerary))
}

// --- Handlers del catálogo ---

#[axum::debug_handler]
async fn list_spots_handler(State(state): State<AppState>) -> Result<Json<Vec<Spot>>, ApiError> {
    Ok(Json(catalog::list_spots(&state.graph).await?))
}

#[axum::debug_handler]
async fn create_spot_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewSpot>,
) -> Result<Json<Spot>, ApiError> {
    Ok(Json(catalog::create_spot(&state.graph, &payload).await?))
}

#[axum::debug_handler]
async fn list_guides_handler(State(state): State<AppState>) -> Result<Json<Vec<Guide>>, ApiError> {
    Ok(Json(catalog::list_guides(&state.graph).await?))
}

#[axum::debug_handler]
async fn create_guide_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewGuide>,
) -> Result<Json<Guide>, ApiError> {
    Ok(Json(catalog::create_guide(&state.graph, &payload).await?))
}

#[axum::debug_handler]
async fn list_bookings_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(catalog::list_bookings(&state.graph).await?))
}

#[axum::debug_handler]
async fn create_booking_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewBooking>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(catalog::create_booking(&state.graph, &payload).await?))
}

// --- Salud del servicio ---

#[axum::debug_handler]
async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.graph.run(query("RETURN 1")).await?;
    Ok(Json(json!({
        "status": "ok",
        "chatModel": state.config.llm_chat_model,
        "aiConfigured": state.llm_manager.is_configured(),
    })))
}
