//! Gitea REST API Client
//!
//! A Rust client library for the repository subset of the Gitea REST API.
//! Every operation is idempotent so callers can replay a partially applied
//! sequence of calls safely.
//!
//! # Example
//!
//! ```no_run
//! use gitea_client::{GiteaClient, NewRepo};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GiteaClient::new(
//!     "http://gitea-http.gitea:3000".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! // Look up a repository
//! let repo = client.get_repo("my-org", "my-repo").await?;
//!
//! // Create it as a mirror if it is missing
//! if repo.is_none() {
//!     let new = NewRepo {
//!         name: "my-repo".to_string(),
//!         description: "Mirror of upstream".to_string(),
//!         mirror: true,
//!         clone_addr: Some("https://github.com/example/my-repo.git".to_string()),
//!         mirror_interval: Some("8h".to_string()),
//!     };
//!     client.create_repo("my-org", &new).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod gitea_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::GiteaClient;
pub use common::HttpClient;
pub use error::GiteaError;
pub use models::*;
pub use gitea_trait::GiteaClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{InjectedFailure, MockGiteaClient, MockOperation};
