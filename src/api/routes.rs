use crate::api::api_error::APIError;
use crate::api::model::{MessageResult, ServerQuery};
use crate::api::server::AppState;
use crate::dhcpd::model::{Lease, Reservation, ReservationSpec, Subnet, SubnetSpec};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

type ServerId = WithRejection<Query<ServerQuery>, APIError>;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/api/dhcp/subnets", get(list_subnets).post(create_subnet))
        .route(
            "/api/dhcp/subnets/:subnet_id",
            patch(update_subnet).delete(delete_subnet),
        )
        .route(
            "/api/dhcp/reservations",
            get(list_reservations).post(create_reservation),
        )
        .route(
            "/api/dhcp/reservations/:reservation_id",
            patch(update_reservation).delete(delete_reservation),
        )
        .route("/api/dhcp/leases", get(list_leases))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn list_subnets(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ServerId,
) -> Result<Json<Vec<Subnet>>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(dhcp.list_subnets().await?))
}

async fn create_subnet(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ServerId,
    WithRejection(Json(payload), _): WithRejection<Json<SubnetSpec>, APIError>,
) -> Result<Json<Subnet>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(dhcp.create_subnet(payload).await?))
}

async fn update_subnet(
    State(state): State<AppState>,
    Path(subnet_id): Path<String>,
    WithRejection(Query(query), _): ServerId,
    WithRejection(Json(payload), _): WithRejection<Json<SubnetSpec>, APIError>,
) -> Result<Json<Subnet>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(dhcp.update_subnet(&subnet_id, payload).await?))
}

async fn delete_subnet(
    State(state): State<AppState>,
    Path(subnet_id): Path<String>,
    WithRejection(Query(query), _): ServerId,
) -> Result<Json<MessageResult>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    dhcp.delete_subnet(&subnet_id).await?;
    Ok(Json(MessageResult::new(format!("subnet {subnet_id} deleted"))))
}

async fn list_reservations(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ServerId,
) -> Result<Json<Vec<Reservation>>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(dhcp.list_reservations().await?))
}

async fn create_reservation(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ServerId,
    WithRejection(Json(payload), _): WithRejection<Json<ReservationSpec>, APIError>,
) -> Result<Json<Reservation>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(dhcp.create_reservation(payload).await?))
}

async fn update_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    WithRejection(Query(query), _): ServerId,
    WithRejection(Json(payload), _): WithRejection<Json<ReservationSpec>, APIError>,
) -> Result<Json<Reservation>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(
        dhcp.update_reservation(&reservation_id, payload).await?,
    ))
}

async fn delete_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    WithRejection(Query(query), _): ServerId,
) -> Result<Json<MessageResult>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    dhcp.delete_reservation(&reservation_id).await?;
    Ok(Json(MessageResult::new(format!(
        "reservation {reservation_id} deleted"
    ))))
}

async fn list_leases(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ServerId,
) -> Result<Json<Vec<Lease>>, APIError> {
    let dhcp = state.dhcp(&query.server_id)?;
    Ok(Json(dhcp.list_leases().await?))
}
