pub mod api_types;
pub mod client;
pub mod connectivity;
pub mod result;

pub use client::{QuickMartApi, QuickMartClient};
pub use connectivity::{FixedConnectivity, NetworkMonitor, TcpReachability};
pub use result::{safe_api_call, NetworkResult};
