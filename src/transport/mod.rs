pub mod traits;

#[cfg(test)]
pub mod sim;

pub use traits::{AutopilotLink, LinkConnector};
