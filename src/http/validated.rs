use crate::error::ApiError;
use axum::{extract::Request, Json};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Wrapper for validated JSON request bodies.
///
/// Deserializes the body, runs its `validator` rules, and rejects with a
/// structured 400 carrying per-field details before the handler runs.
pub struct ValidatedJson<T>(pub T);

impl<T, S> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(format!("Invalid JSON: {e}")))?;

        value.validate().map_err(|errors| {
            let details: Vec<String> = errors
                .field_errors()
                .iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |error| {
                        let msg = error
                            .message
                            .as_ref()
                            .map(|m| m.as_ref())
                            .unwrap_or_else(|| error.code.as_ref());
                        format!("{field}: {msg}")
                    })
                })
                .collect();

            ApiError::validation_details("Validation failed", details)
        })?;

        Ok(ValidatedJson(value))
    }
}
