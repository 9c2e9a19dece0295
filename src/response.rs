//! Uniform result envelope handed to UI and page collaborators.
//!
//! Callers branch on `success` before touching `data`:
//! `{"success": true, "data": ..., "status"?: n}` or
//! `{"success": false, "error": {"message": ..., "details"?: {...}}, "status"?: n}`.

use serde::Serialize;

use crate::error::{AppError, FieldErrors};

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ActionResponse<T> {
    Success(SuccessResponse<T>),
    Error(ErrorResponse),
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        ActionResponse::Success(SuccessResponse {
            success: true,
            data,
            status: None,
        })
    }

    pub fn created(data: T) -> Self {
        ActionResponse::Success(SuccessResponse {
            success: true,
            data,
            status: Some(201),
        })
    }

    pub fn from_error(err: &AppError) -> Self {
        let message = match err {
            // The per-field messages travel in `details`.
            AppError::Validation(_) => "Validation failed".to_string(),
            other => other.to_string(),
        };
        ActionResponse::Error(ErrorResponse {
            success: false,
            error: ErrorBody {
                message,
                details: err.details().cloned(),
            },
            status: Some(err.status_code()),
        })
    }

    /// Envelope for a mutation that creates a resource: 201 on success.
    pub fn from_created(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::created(data),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResponse::Success(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ActionResponse::Success(s) => s.status,
            ActionResponse::Error(e) => e.status,
        }
    }
}

impl<T> From<Result<T, AppError>> for ActionResponse<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::from_error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let response = ActionResponse::ok(vec![1, 2]);
        assert!(response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": true, "data": [1, 2] })
        );

        let created = ActionResponse::from_created(Ok::<_, AppError>("q"));
        assert_eq!(created.status(), Some(201));
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            json!({ "success": true, "data": "q", "status": 201 })
        );
    }

    #[test]
    fn test_validation_envelope_carries_details() {
        let err = AppError::Validation(FieldErrors::single("tags", "Cannot add more than 3 tags."));
        let response: ActionResponse<()> = Err(err).into();
        assert!(!response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "error": {
                    "message": "Validation failed",
                    "details": { "tags": ["Cannot add more than 3 tags."] }
                },
                "status": 400
            })
        );
    }

    #[test]
    fn test_unauthorized_envelope_has_no_details() {
        let response: ActionResponse<()> =
            Err(AppError::Unauthorized("Not signed in".to_string())).into();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "error": { "message": "Unauthorized: Not signed in" },
                "status": 401
            })
        );
    }
}
