use crate::api::routes;
use crate::config::SharedConfig;
use crate::error::Error;
use crate::service::{DhcpService, Services};
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub services: Services,
}

impl AppState {
    /// The [`DhcpService`] of a configured, DHCP-enabled server.
    pub fn dhcp(&self, server_id: &str) -> Result<Arc<DhcpService>, Error> {
        self.config.dhcp_server(server_id)?;
        self.services
            .get(server_id)
            .cloned()
            .ok_or_else(|| Error::UnknownServer(server_id.to_string()))
    }
}

pub fn new(config: SharedConfig, services: Services) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr)
        .serve(routes::new(AppState { config, services }).into_make_service())
}
