//! Autodesk Platform Services implementations of the remote collaborators:
//! two-legged OAuth token exchange and the Data Management folder/item endpoints.

pub mod auth;
pub mod client;
pub mod config;
mod jsonapi;

pub use auth::ClientCredentials;
pub use client::DataManagementClient;
pub use config::ApsConfig;
