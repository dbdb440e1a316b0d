//! Request extractors whose rejections use the API error body.
//!
//! Axum's own `Json` and `Query` reject malformed input with a plain-text
//! body. These wrappers route the rejection through [`ApiError`] so every
//! failure reaches the dashboard as `{"error": "<message>"}` with status 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
