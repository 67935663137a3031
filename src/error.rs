use actix_web::{HttpResponse, error::ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("refresh token is expired or already used")]
    TokenReuse,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::InvalidToken => "invalid_token",
            ApiError::TokenReuse => "token_reuse",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials
            | ApiError::Unauthenticated
            | ApiError::InvalidToken
            | ApiError::TokenReuse => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                return ApiError::Conflict("resource");
            }
        }
        tracing::error!("database error: {}", err);
        ApiError::Internal
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("password hashing error: {}", err);
        ApiError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::warn!("token error: {}", err);
        ApiError::InvalidToken
    }
}

/// Ownership guard shared by all owner-restricted mutations.
pub fn ensure_owner(owner: uuid::Uuid, caller: uuid::Uuid, what: &'static str) -> Result<()> {
    if owner == caller {
        Ok(())
    } else {
        Err(ApiError::Forbidden(what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn status_codes_match_kinds() {
        let cases = [
            (ApiError::InvalidArgument("x".into()), 400, "invalid_argument"),
            (ApiError::NotFound("video"), 404, "not_found"),
            (ApiError::InvalidCredentials, 401, "invalid_credentials"),
            (ApiError::Unauthenticated, 401, "unauthenticated"),
            (ApiError::InvalidToken, 401, "invalid_token"),
            (ApiError::TokenReuse, 401, "token_reuse"),
            (ApiError::Forbidden("not the owner"), 403, "forbidden"),
            (ApiError::Conflict("user"), 409, "conflict"),
            (ApiError::Internal, 500, "internal"),
        ];
        for (err, status, kind) in cases {
            assert_eq!(err.status_code().as_u16(), status);
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn ensure_owner_rejects_non_owner() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(ensure_owner(owner, owner, "video").is_ok());
        assert!(matches!(
            ensure_owner(owner, other, "video"),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn internal_error_hides_detail() {
        assert_eq!(ApiError::Internal.to_string(), "internal server error");
    }
}
