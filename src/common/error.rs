use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

pub type ServiceResult<T> = Result<T, AppError>;
pub type ServiceResponse<T> = ServiceResult<Json<T>>;

#[track_caller]
pub fn unexpected<T, E: Into<anyhow::Error>>(e: E) -> ServiceResult<T> {
    let caller = std::panic::Location::caller();
    error!("An unexpected error has occurred at {caller}: {}", e.into());
    Err(AppError::Unexpected)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Unexpected,
    Unauthenticated,
    Forbidden,
    DecodingRequestFailed,

    ConversationsInvalidParticipants,
    ConversationsNotFound,

    /// Carries the human readable reason the message was rejected
    MessagesInvalid(&'static str),

    RealtimePublishFailed,

    UsersNotFound,
    UsersAdminNotFound,
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    #[track_caller]
    fn from(e: E) -> Self {
        unexpected::<(), E>(e).unwrap_err()
    }
}

impl AppError {
    pub const fn code(&self) -> &'static str {
        match self {
            AppError::Unexpected => "unexpected",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::DecodingRequestFailed => "decoding_request_failed",

            AppError::ConversationsInvalidParticipants => "conversations.invalid_participants",
            AppError::ConversationsNotFound => "conversations.not_found",

            AppError::MessagesInvalid(_) => "messages.invalid",

            AppError::RealtimePublishFailed => "realtime.publish_failed",

            AppError::UsersNotFound => "users.not_found",
            AppError::UsersAdminNotFound => "users.admin_not_found",
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            AppError::Unexpected => "An unexpected error has occurred.",
            AppError::Unauthenticated => "You must be logged in to perform this action.",
            AppError::Forbidden => "You are not allowed to access this conversation.",
            AppError::DecodingRequestFailed => "Failed to decode request",

            AppError::ConversationsInvalidParticipants => {
                "A conversation requires two non-empty participant ids."
            }
            AppError::ConversationsNotFound => "Conversation not found",

            AppError::MessagesInvalid(reason) => *reason,

            AppError::RealtimePublishFailed => "The message could not be delivered in realtime.",

            AppError::UsersNotFound => "This user does not exist.",
            AppError::UsersAdminNotFound => "No administrator is available to receive messages.",
        }
    }

    pub const fn http_status_code(&self) -> StatusCode {
        match self {
            AppError::DecodingRequestFailed
            | AppError::ConversationsInvalidParticipants
            | AppError::MessagesInvalid(_) => StatusCode::BAD_REQUEST,

            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,

            AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::ConversationsNotFound | AppError::UsersNotFound => StatusCode::NOT_FOUND,

            AppError::UsersAdminNotFound => StatusCode::SERVICE_UNAVAILABLE,

            AppError::Unexpected | AppError::RealtimePublishFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub const fn response_parts(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.http_status_code();
        let response = ErrorResponse {
            code: self.code(),
            message: self.message(),
        };
        (status, Json(response))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.response_parts().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_carry_their_reason() {
        let error = AppError::MessagesInvalid("Message content is required.");
        assert_eq!(error.code(), "messages.invalid");
        assert_eq!(error.message(), "Message content is required.");
        assert_eq!(error.http_status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn foreign_errors_become_unexpected() {
        let error: AppError = anyhow::anyhow!("connection reset").into();
        assert_eq!(error, AppError::Unexpected);
        assert_eq!(error.http_status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn access_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::Unauthenticated.http_status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.http_status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::UsersAdminNotFound.http_status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
