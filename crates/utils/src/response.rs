use serde::{Deserialize, Serialize};

/// JSON envelope returned by every API route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T, E = T> {
    success: bool,
    data: Option<T>,
    error_data: Option<E>,
    message: Option<String>,
}

impl<T, E> ApiResponse<T, E> {
    /// Creates a successful response, with `data` and no message.
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            error_data: None,
        }
    }

    /// Creates an error response, with `message` and no data.
    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error_data: None,
        }
    }

    /// Creates an error response, with no `data`, no `message`, but with arbitrary `error_data`.
    pub fn error_with_data(data: E) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: Some(data),
            message: None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error_data(&self) -> Option<&E> {
        self.error_data.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_data_without_message() {
        let response: ApiResponse<u32> = ApiResponse::success(7);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 7);
        assert!(json["message"].is_null());
    }

    #[test]
    fn error_carries_message() {
        let response: ApiResponse<()> = ApiResponse::error("boom");
        assert!(!response.is_success());
        assert_eq!(response.message(), Some("boom"));
        assert!(response.data().is_none());
    }
}
