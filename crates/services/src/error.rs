use fluxis_db::models::log::LogError;
use fluxis_db::models::project::ProjectError;
use fluxis_db::models::status::StatusError;
use fluxis_db::models::task::TaskError;
use fluxis_db::search::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, PageQuery};
use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the domain services. `InvalidInput` covers every
/// precondition the services enforce themselves (malformed identifiers, enum
/// values out of range, empty required fields, ownership and reorder
/// violations); the transparent variants lift data-layer errors unchanged.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Log(#[from] LogError),
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid, ServiceError> {
    Uuid::try_parse(value)
        .map_err(|_| ServiceError::InvalidInput(format!("{field} must be a valid UUID")))
}

pub(crate) fn parse_uuid_list(values: &[String], field: &str) -> Result<Vec<Uuid>, ServiceError> {
    values
        .iter()
        .map(|value| parse_uuid(value, field))
        .collect()
}

pub(crate) fn non_empty(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn resolve_page(
    page_number: Option<i64>,
    page_size: Option<i64>,
) -> Result<PageQuery, ServiceError> {
    let page_number = page_number.unwrap_or(DEFAULT_PAGE_NUMBER);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_number < 1 {
        return Err(ServiceError::InvalidInput(
            "pageNumber must be at least 1".to_string(),
        ));
    }
    if page_size < 1 {
        return Err(ServiceError::InvalidInput(
            "pageSize must be at least 1".to_string(),
        ));
    }
    Ok(PageQuery {
        page_number,
        page_size,
    })
}

pub(crate) fn validate_priority(priority: i64) -> Result<(), ServiceError> {
    if priority < 1 {
        return Err(ServiceError::InvalidInput(
            "priority must be a positive integer".to_string(),
        ));
    }
    Ok(())
}
