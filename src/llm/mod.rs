pub mod gateway;

pub use gateway::GatewayClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
    #[error("Rate Limited")]
    RateLimited,
    #[error("Quota Exceeded")]
    QuotaExceeded,
}
