//! Read-only helpers negotiation layers use on a handshake request

use crate::HandshakeRequest;

/// Headers consulted for the client address, in order of preference
const CLIENT_IP_HEADERS: [&str; 7] = [
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip", // Cloudflare
    "x-client-ip",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

impl HandshakeRequest {
    /// Extract an authentication token from the handshake headers
    pub fn extract_auth_token(&self) -> Option<String> {
        // Authorization header first, with or without the Bearer scheme
        if let Some(auth) = self.header("authorization") {
            return Some(auth.strip_prefix("Bearer ").unwrap_or(auth).to_string());
        }

        // Subprotocol of the form "token.{jwt}"
        if let Some(token) = self
            .header("sec-websocket-protocol")
            .and_then(|protocol| protocol.strip_prefix("token."))
        {
            return Some(token.to_string());
        }

        self.header("x-auth-token").map(str::to_string)
    }

    /// Extract the client address, as reported by proxies
    pub fn extract_client_ip(&self) -> Option<String> {
        CLIENT_IP_HEADERS.iter().find_map(|name| {
            // X-Forwarded-For lists hops; the client is the first one
            let value = self.header(name)?;
            let ip = value.split(',').next().unwrap_or(value).trim();
            (!ip.is_empty()).then(|| ip.to_string())
        })
    }

    pub fn extract_user_agent(&self) -> Option<String> {
        self.header("user-agent").map(str::to_string)
    }

    /// Connection metadata for logging and connection registries
    pub fn create_metadata(&self) -> serde_json::Value {
        let mut metadata = serde_json::Map::new();

        if let Some(ip) = self.extract_client_ip() {
            metadata.insert("client_ip".to_string(), serde_json::Value::String(ip));
        }

        if let Some(user_agent) = self.extract_user_agent() {
            metadata.insert(
                "user_agent".to_string(),
                serde_json::Value::String(user_agent),
            );
        }

        if let Some(user) = self.user_principal() {
            metadata.insert(
                "user_id".to_string(),
                serde_json::Value::String(user.user_id.clone()),
            );
        }

        metadata.insert(
            "request_path".to_string(),
            serde_json::Value::String(self.request_path().to_string()),
        );
        metadata.insert("secure".to_string(), serde_json::Value::Bool(self.is_secure()));
        metadata.insert(
            "connected_at".to_string(),
            serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
        );

        serde_json::Value::Object(metadata)
    }
}
