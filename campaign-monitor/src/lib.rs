//! A client for managing Campaign Monitor subscriber lists and sending
//! transactional (smart) emails.
//!
//! ## Example
//!
//! ```no_run
//! use campaign_monitor::{models::SubscriberRequest, Client, Config, Payload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(Config::new("list-id", "base64-token")?)?;
//!
//!     let subscriber = SubscriberRequest {
//!         email_address: "jane@example.com".into(),
//!         name: Some("Jane".into()),
//!         resubscribe: true,
//!         ..Default::default()
//!     };
//!     let resp = client.add_subscriber(Payload::json(&subscriber)?).await?;
//!     println!("Added {resp}");
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{Client, PageSize};
pub use config::Config;
pub use error::Error;
pub use models::{ApiResponse, Payload};
pub use transport::Transport;
