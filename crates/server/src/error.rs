use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use fluxis_db::models::log::LogError;
use fluxis_db::models::project::ProjectError;
use fluxis_db::models::status::StatusError;
use fluxis_db::models::task::TaskError;
use fluxis_services::error::ServiceError;
use fluxis_services::services::auth::AuthError;
use fluxis_utils::response::Problem;

/// The single place where error values become HTTP statuses and RFC-7807
/// bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::InvalidRefresh) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Service(err) => match err {
                ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ServiceError::Project(ProjectError::ProjectNotFound) => StatusCode::NOT_FOUND,
                ServiceError::Project(ProjectError::Database(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ServiceError::Status(StatusError::StatusNotFound) => StatusCode::NOT_FOUND,
                ServiceError::Status(StatusError::ProjectNotFound) => StatusCode::NOT_FOUND,
                ServiceError::Status(StatusError::ReorderConflict(_)) => StatusCode::BAD_REQUEST,
                ServiceError::Status(StatusError::Database(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ServiceError::Task(TaskError::TaskNotFound) => StatusCode::NOT_FOUND,
                ServiceError::Task(TaskError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::Log(LogError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error handling request: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = Problem::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error"),
            detail,
        );
        (status, axum::Json(body)).into_response()
    }
}

/// Body deserialization failures surface as 400s with a specific detail, the
/// same envelope as every other malformed input.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Request-body extractor. Delegates to [`axum::Json`] but funnels every
/// rejection through [`ApiError`], so malformed JSON, wrong field types, and
/// enum values out of range all come back as a problem body instead of
/// axum's plain-text rejection.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(request, state).await?;
        Ok(Json(value))
    }
}
