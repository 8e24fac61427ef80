//! # pan-api
//!
//! Client for the PAN-OS XML management API (`https://<device>/api/`).
//!
//! [`ApiClient`] generates an API key from operator credentials;
//! [`PanClient`] carries that key and reads device groups and rulebases, and
//! implements [`zone_engine::Transport`] so a zone-replacement plan can be
//! pushed with config `set` and `delete` calls.
//!
//! ```rust,no_run
//! use pan_api::{ApiClient, ApiSettings};
//!
//! # async fn example() -> Result<(), pan_api::ApiError> {
//! let api = ApiClient::new("fw.example.com", &ApiSettings::default())?;
//! let key = api.generate_key("admin", "secret").await?;
//! let client = api.authenticate(key);
//! let device = client.device_type().await?;
//! println!("{device}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{ApiClient, ApiSettings, PanClient};
pub use error::ApiError;
