pub mod connectivity;
pub mod reachability;

pub use connectivity::ConnectivityMonitor;
pub use reachability::ReachabilityCheck;
