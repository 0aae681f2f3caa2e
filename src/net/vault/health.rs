use serde::Deserialize;

/// Seal and init flags of one node at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub sealed: bool,
    pub initialized: bool,
}

/// Body of `GET /v1/sys/health`. Only `sealed` and `initialized` drive
/// decisions; the rest is kept for debug logging.
#[derive(Debug, Deserialize)]
pub(crate) struct HealthResponse {
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub standby: bool,
    pub sealed: bool,
    pub initialized: bool,
}

impl From<HealthResponse> for HealthStatus {
    fn from(resp: HealthResponse) -> Self {
        HealthStatus {
            sealed: resp.sealed,
            initialized: resp.initialized,
        }
    }
}

/// Status codes `sys/health` uses to encode node state. Each still carries a
/// full JSON health body.
pub(crate) fn carries_health_body(status: u16) -> bool {
    matches!(
        status,
        200 // initialized, unsealed, active
        | 429 // unsealed standby
        | 472 // DR secondary
        | 473 // performance standby
        | 501 // not initialized
        | 503 // sealed
    )
}
