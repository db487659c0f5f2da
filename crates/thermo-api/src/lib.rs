// thermo-api: Async Rust client for a robot's servo component over a JSON gateway

pub mod auth;
pub mod error;
pub mod robot;
pub mod servo;
pub mod transport;

pub use auth::ApiKeyCredential;
pub use error::Error;
pub use robot::RobotClient;
pub use servo::ServoClient;
pub use transport::{TlsMode, TransportConfig};
