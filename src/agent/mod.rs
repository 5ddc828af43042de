pub mod client;
pub mod protocol;
pub mod server;

pub use client::AgentClient;
pub use server::AgentServer;
