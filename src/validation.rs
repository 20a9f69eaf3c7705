use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{ApiError, ValidationIssue};

/// ValidatedJson
///
/// Body extractor that deserializes JSON and runs the payload's `Validate` rules.
/// Every violated constraint across all fields is reported together as
/// `ApiError::Validation`; the handler is never invoked when any check fails.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(body_rejection)?;

        validate(&payload)?;
        Ok(Self(payload))
    }
}

/// Runs the payload's rules, converting failures into the API's issue list.
pub fn validate<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|errors| ApiError::Validation(collect_issues(&errors)))
}

/// Flattens `ValidationErrors` into `{field, message}` pairs, sorted by field.
pub fn collect_issues(errors: &ValidationErrors) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            let field = wire_name(&field);
            field_errors.iter().map(move |error| ValidationIssue {
                field: field.clone(),
                message: describe(error),
            })
        })
        .collect();

    // Stable: keeps the declared order of rules within a field.
    issues.sort_by(|a, b| a.field.cmp(&b.field));
    issues
}

fn body_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!(%rejection, "request body rejected before validation");
    ApiError::Validation(vec![ValidationIssue {
        field: "body".to_string(),
        message: rejection.body_text(),
    }])
}

fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("failed the {} check", error.code),
    }
}

/// Payload structs use snake_case fields but camelCase JSON keys.
fn wire_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}
