//! AFC portal client.
//!
//! This module provides:
//! - [`AfcClient`]: the login + inquiry exchange and its latest reply
//! - [`PortalTransport`]: the network seam, with [`HttpsTransport`] for production
//! - [`session`]: CSRF token and cookie handling for one exchange

pub mod client;
pub mod session;
pub mod transport;

pub use client::{AfcClient, Credentials, PortalEndpoints};
pub use transport::{HttpsTransport, PortalTransport};
