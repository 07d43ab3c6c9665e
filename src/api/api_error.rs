use crate::error::Error;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl APIError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<Error>() {
            return match err {
                Error::UnknownServer(_)
                | Error::SubnetNotFound(_)
                | Error::ReservationNotFound(_) => StatusCode::NOT_FOUND,
                Error::DhcpUnavailable(_)
                | Error::InvalidEntity { .. }
                | Error::InvalidGeneratedConfig(_) => StatusCode::BAD_REQUEST,
                Error::Conflict(_) => StatusCode::CONFLICT,
                Error::RemoteRead { .. }
                | Error::RemoteWrite { .. }
                | Error::RemoteCommand { .. }
                | Error::Transport(_) => StatusCode::BAD_GATEWAY,
                Error::RemoteTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return rejection.status();
        }
        if let Some(rejection) = self.0.downcast_ref::<QueryRejection>() {
            return rejection.status();
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        let body = Json(json!({
            "error": format!("{}", self.0),
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
