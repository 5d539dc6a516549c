pub mod client;
pub mod resources;

pub use client::{ClusterApi, KubeCluster};
#[cfg(test)]
pub use client::MockClusterApi;
pub use resources::ObjectIdentity;
