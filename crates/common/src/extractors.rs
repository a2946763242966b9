//! Request body extraction with validation

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::Error;

/// `Json<T>` that also runs `T`'s `validator` rules.
///
/// Malformed bodies, a missing JSON content type and failed rules all
/// reject with `Error::Validation`, so clients always see a 400 envelope.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| Error::Validation(e.body_text()))?;
        value
            .validate()
            .map_err(|e| Error::Validation(describe(&e)))?;
        Ok(ValidatedJson(value))
    }
}

/// One `field: reason` clause per failing field, by wire name, sorted
fn describe(errors: &ValidationErrors) -> String {
    let mut clauses: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .map(|err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("failed {}", err.code),
                })
                .unwrap_or_else(|| "invalid".to_string());
            format!("{}: {}", camel_case(&field), reason)
        })
        .collect();
    clauses.sort();
    clauses.join("; ")
}

/// Request bodies are camelCase on the wire; rule failures name Rust fields
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
