//! Handshake request model for bidirectional endpoints
//!
//! The transport layer fills a [`HandshakeRequestBuilder`] (directly, or from
//! parsed HTTP parts with [`HandshakeRequestBuilder::from_parts`]) and hands the
//! built [`HandshakeRequest`] to negotiation. Header names are matched
//! case-insensitively; the parameter map is always present.

pub mod headers;
pub mod parts;
pub mod request;
pub mod upgrade;

pub use headers::HeaderStore;
pub use request::{HandshakeRequest, HandshakeRequestBuilder, HttpSession, ParameterMap};

// Re-export auth types for convenience
pub use ras_auth_core::{AuthError, AuthenticatedUser, RoleCheck};
