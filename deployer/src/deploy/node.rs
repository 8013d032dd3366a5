//! Teepod selection

use openapi_client::models::Teepod;
use tracing::{info, warn};

use crate::errors::DeployError;

/// Pick the node a new CVM is created on
///
/// An explicit id must match one of `nodes`. Without one, nodes advertising
/// `image` win over nodes that do not, then the lowest `teepod_id` wins, so
/// the choice does not depend on the order the provider lists nodes in.
pub fn select_node(
    explicit: Option<&str>,
    nodes: &[Teepod],
    image: &str,
) -> Result<Teepod, DeployError> {
    if let Some(wanted) = explicit {
        let wanted = wanted.trim();
        let node = nodes
            .iter()
            .find(|n| matches_id(n, wanted))
            .ok_or_else(|| {
                DeployError::NodeNotFound(format!(
                    "teepod {} is not among the {} available node(s)",
                    wanted,
                    nodes.len()
                ))
            })?;
        if !node.supports_image(image) {
            warn!("Teepod {} does not advertise image {}", node.teepod_id, image);
        }
        info!("Using specified teepod ID: {}", node.teepod_id);
        return Ok(node.clone());
    }

    let node = nodes
        .iter()
        .min_by_key(|n| (!n.supports_image(image), n.teepod_id))
        .ok_or_else(|| {
            DeployError::NodeNotFound("no available teepods found, cannot proceed".to_string())
        })?;

    if !node.supports_image(image) {
        warn!("No available teepod advertises image {}", image);
    }
    info!(
        "Automatically selected teepod ID: {}{}",
        node.teepod_id,
        node.name
            .as_deref()
            .map(|name| format!(" ({})", name))
            .unwrap_or_default()
    );
    Ok(node.clone())
}

// Compared by value, so "007" names teepod 7
fn matches_id(node: &Teepod, wanted: &str) -> bool {
    wanted.parse::<u64>().is_ok_and(|id| node.teepod_id == id)
}
