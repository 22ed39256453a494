//! Errores de la API y su traducción a códigos HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Taxonomía de errores del backend:
/// - `Validation`: el cliente envió datos incompletos o fuera de rango (400).
/// - `NotFound`: el identificador referenciado no existe (404).
/// - `ServiceUnavailable`: el servicio de IA no está configurado o no responde (503).
/// - `Internal`: fallo inesperado en el almacén u otra dependencia (500).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<neo4rs::Error> for ApiError {
    fn from(err: neo4rs::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(err) => {
                // El detalle se queda en el log; al cliente sólo le llega un mensaje genérico.
                error!("Error interno: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_por_variante() {
        let cases = [
            (ApiError::Validation("mal".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("no está".into()), StatusCode::NOT_FOUND),
            (
                ApiError::ServiceUnavailable("sin IA".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
