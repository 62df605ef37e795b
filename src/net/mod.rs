//! Network layer: the platform REST client, the identity gateway and the
//! platform data client.

pub mod http;
pub mod identity;
pub mod platform;
