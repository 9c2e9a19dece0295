use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-field validation messages, keyed by input field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// `Ok(())` when nothing was recorded, otherwise a `Validation` error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the error maps to when the envelope is served over HTTP.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::NotFound(_) => 404,
            AppError::Internal(_) => 500,
        }
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Internal(format!("Database error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("Token error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.add("title", "Title is required.");
        errors.add("tags", "At least one tag is required.");
        errors.add("title", "Title must be at least 5 characters.");

        assert_eq!(
            errors.get("title").unwrap(),
            ["Title is required.", "Title must be at least 5 characters."]
        );
        assert_eq!(
            errors.to_string(),
            "tags: At least one tag is required.; title: Title is required., Title must be at least 5 characters."
        );
    }

    #[test]
    fn test_empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
        let err = FieldErrors::single("content", "Body is required.")
            .into_result()
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.details().is_some());
    }

    #[test]
    fn test_db_error_maps_to_internal() {
        let err: AppError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status_code(), 500);
    }
}
