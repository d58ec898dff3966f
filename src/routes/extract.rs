//! Request parameter extraction
//!
//! Endpoints accept their parameters either in the query string or, for
//! POSTs, as an `application/x-www-form-urlencoded` body. Rejections go
//! through [`AppError`] so every endpoint reports bad input the same way.

use axum::{
    extract::{FromRequest, Query, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use serde::de::DeserializeOwned;

use crate::types::AppError;

/// Parameters from a urlencoded form body, else from the query string.
#[derive(Debug)]
pub struct Params<T>(pub T);

impl<S, T> FromRequest<S> for Params<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            return Ok(Params(value));
        }

        let Query(value) = Query::<T>::try_from_uri(req.uri())
            .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
        Ok(Params(value))
    }
}
