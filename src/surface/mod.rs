pub mod client;
pub mod protocol;
pub mod server;

pub use client::SurfaceClient;
pub use protocol::{GatewayToSurface, SurfaceToGateway};
pub use server::SurfaceServer;
