//! Populating a builder from already-parsed HTTP request parts

use crate::{HandshakeRequestBuilder, ParameterMap};
use http::request::Parts;
use tracing::debug;

impl HandshakeRequestBuilder {
    /// Start a builder from the parts of an upgrade request.
    ///
    /// Copies the URI, path, query, headers and query parameters, and marks
    /// the request secure for `https` / `wss` URIs. Principal, role check,
    /// session and connection are left for the caller to add.
    pub fn from_parts(parts: &Parts) -> Self {
        let uri = &parts.uri;
        let mut builder = HandshakeRequestBuilder::new()
            .request_uri(uri.clone())
            .request_path(uri.path())
            .secure(matches!(uri.scheme_str(), Some("https") | Some("wss")));

        if let Some(query) = uri.query() {
            builder = builder
                .query_string(query)
                .parameter_map_opt(Some(parse_query(query)));
        }

        for name in parts.headers.keys() {
            let values: Vec<String> = parts
                .headers
                .get_all(name)
                .iter()
                .filter_map(|value| match value.to_str() {
                    Ok(value) => Some(value.to_string()),
                    Err(_) => {
                        debug!("Skipping non-UTF-8 value of header {}", name);
                        None
                    }
                })
                .collect();

            if !values.is_empty() {
                builder = builder.header_values(name.as_str(), values);
            }
        }

        builder
    }
}

fn parse_query(query: &str) -> ParameterMap {
    let mut params = ParameterMap::new();
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}
