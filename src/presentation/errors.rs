// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::ValidationErrors;

use crate::application::use_cases::scrape_job::JobError;
use crate::utils::errors::ProfileError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(job_error) = self.0.downcast_ref::<JobError>() {
            return match job_error {
                JobError::Conflict { .. } => StatusCode::CONFLICT,
                JobError::UnknownSite(_) | JobError::UnknownCategory { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(ProfileError::UnknownSite(_)) = self.0.downcast_ref::<ProfileError>() {
            return StatusCode::NOT_FOUND;
        }
        if self.0.downcast_ref::<ValidationErrors>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.0.to_string() });
        if let Some(JobError::Conflict { current }) = self.0.downcast_ref::<JobError>() {
            body["currentJob"] = json!(current);
        }
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let conflict = AppError::from(JobError::Conflict {
            current: "adams:all".to_string(),
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let unknown = AppError::from(JobError::UnknownCategory {
            site: "adams".to_string(),
            category: "Toys".to_string(),
        });
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        assert_eq!(
            AppError::from(ValidationErrors::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
