use async_trait::async_trait;

/// Tells whether the remote side currently answers.
#[async_trait]
pub trait ReachabilityCheck: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
