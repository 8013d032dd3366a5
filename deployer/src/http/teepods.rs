//! Teepod API client

use openapi_client::models::{AvailableTeepodsResponse, Teepod};
use tracing::info;

use crate::errors::DeployError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Get the teepods currently available for deployment
    pub async fn get_available_teepods(&self) -> Result<Vec<Teepod>, DeployError> {
        info!("Requesting available teepods...");
        let response: AvailableTeepodsResponse = self.get("/teepods/available").await?;
        info!("Provider reports {} available teepod(s)", response.nodes.len());
        Ok(response.nodes)
    }
}
