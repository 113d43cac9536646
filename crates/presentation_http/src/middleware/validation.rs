//! Request validation
//!
//! `ValidatedJson` deserializes a body and runs its `validator` rules,
//! rejecting with a 400 `ErrorResponse` before the handler sees the input.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

/// A JSON extractor that also validates the request body
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::BadRequest(describe(&e)))?;
        Ok(Self(value))
    }
}

/// `field: message` pairs joined with `; `, sorted by field
fn describe(errors: &ValidationErrors) -> String {
    let mut lines: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                format!("{field}: {message}")
            })
        })
        .collect();
    lines.sort();
    lines.join("; ")
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::StatusCode, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Rename {
        #[validate(length(min = 1, max = 10, message = "must be 1 to 10 characters"))]
        name: String,
    }

    async fn handler(ValidatedJson(body): ValidatedJson<Rename>) -> String {
        body.name
    }

    async fn post_json(body: &'static str) -> (StatusCode, String) {
        let response = Router::new()
            .route("/", post(handler))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let (status, body) = post_json(r#"{"name":"Nom"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Nom");
    }

    #[tokio::test]
    async fn rule_violation_is_bad_request() {
        let (status, body) = post_json(r#"{"name":""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("bad_request"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, _) = post_json(r#"{"name":"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
