use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// `Json<T>` followed by `T::validate()`.
///
/// Field errors are returned as `details` of a 400 `VALIDATION_ERROR`.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateFaq {
///     #[validate(length(min = 1, max = 500))]
///     question: String,
/// }
///
/// async fn create(ValidatedJson(input): ValidatedJson<CreateFaq>) { /* ... */ }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::post};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Input {
        #[validate(email)]
        email: String,
    }

    fn app() -> Router {
        Router::new().route(
            "/contact",
            post(|ValidatedJson(input): ValidatedJson<Input>| async move { input.email }),
        )
    }

    fn request(body: &str) -> axum::http::Request<Body> {
        axum::http::Request::post("/contact")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let response = app().oneshot(request(r#"{"email":"a@shop.test"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_field_reports_details() {
        let response = app().oneshot(request(r#"{"email":"nope"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["details"]["email"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let response = app().oneshot(request("{")).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
