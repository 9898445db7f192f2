//! The handshake request model and its builder

use crate::HeaderStore;
use http::Uri;
use ras_auth_core::{AuthError, AuthenticatedUser, RoleCheck};
use ras_endpoint_types::ConnectionId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Request parameters: name to ordered values
pub type ParameterMap = HashMap<String, Vec<String>>;

/// Opaque session object supplied by the hosting container
pub type HttpSession = Arc<dyn Any + Send + Sync>;

/// An inbound upgrade request, frozen once built.
///
/// Two operations write to a built request: [`set_request_path`] (so path
/// templates can be resolved during negotiation) and
/// [`put_single_header`]. Both take `&mut self`; a request shared behind an
/// `Arc` is read-only.
///
/// [`set_request_path`]: HandshakeRequest::set_request_path
/// [`put_single_header`]: HandshakeRequest::put_single_header
#[derive(Clone)]
pub struct HandshakeRequest {
    request_uri: Uri,
    request_path: String,
    query_string: Option<String>,
    connection: Option<ConnectionId>,
    http_session: Option<HttpSession>,
    secure: bool,
    user_principal: Option<Arc<AuthenticatedUser>>,
    role_check: Option<Arc<dyn RoleCheck>>,
    headers: HeaderStore,
    parameter_map: ParameterMap,
}

impl HandshakeRequest {
    /// Create an empty builder
    pub fn builder() -> HandshakeRequestBuilder {
        HandshakeRequestBuilder::default()
    }

    /// All headers
    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// First value of the header `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Alias of [`HandshakeRequest::header`]
    pub fn first_header_value(&self, name: &str) -> Option<&str> {
        self.header(name)
    }

    /// Replace the header `name` with a single value
    pub fn put_single_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.put_single(name, value);
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// Rewrite the request path.
    ///
    /// Single writer only: set during negotiation, read afterwards.
    pub fn set_request_path(&mut self, path: impl Into<String>) {
        self.request_path = path.into();
    }

    pub fn request_uri(&self) -> &Uri {
        &self.request_uri
    }

    /// The request URI rendered as text
    pub fn request_uri_string(&self) -> String {
        self.request_uri.to_string()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Identity of the transport connection the request arrived on
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn http_session(&self) -> Option<&HttpSession> {
        self.http_session.as_ref()
    }

    /// The session object, if it is a `T`
    pub fn http_session_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.http_session
            .as_ref()
            .and_then(|session| session.downcast_ref::<T>())
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn user_principal(&self) -> Option<&AuthenticatedUser> {
        self.user_principal.as_deref()
    }

    /// The principal, or [`AuthError::AuthenticationRequired`] when the
    /// request is anonymous
    pub fn require_principal(&self) -> Result<&AuthenticatedUser, AuthError> {
        self.user_principal().ok_or(AuthError::AuthenticationRequired)
    }

    /// Whether the caller belongs to `role`.
    ///
    /// Without a role-check delegate the answer is always `false`.
    pub fn is_user_in_role(&self, role: &str) -> bool {
        self.role_check
            .as_ref()
            .is_some_and(|check| check.is_user_in_role(role))
    }

    /// Request parameters; empty when none were supplied
    pub fn parameter_map(&self) -> &ParameterMap {
        &self.parameter_map
    }

    /// First value of the parameter `name`
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameter_map
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

impl fmt::Debug for HandshakeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeRequest")
            .field("request_uri", &self.request_uri)
            .field("request_path", &self.request_path)
            .field("query_string", &self.query_string)
            .field("connection", &self.connection)
            .field("has_http_session", &self.http_session.is_some())
            .field("secure", &self.secure)
            .field("user_principal", &self.user_principal)
            .field("has_role_check", &self.role_check.is_some())
            .field("headers", &self.headers)
            .field("parameter_map", &self.parameter_map)
            .finish()
    }
}

/// Builder for [`HandshakeRequest`].
///
/// `build` borrows the builder, so it can be called repeatedly; every call
/// returns an independent request with the same field values.
#[derive(Clone, Default)]
pub struct HandshakeRequestBuilder {
    request_uri: Option<Uri>,
    request_path: Option<String>,
    query_string: Option<String>,
    connection: Option<ConnectionId>,
    http_session: Option<HttpSession>,
    secure: bool,
    user_principal: Option<Arc<AuthenticatedUser>>,
    role_check: Option<Arc<dyn RoleCheck>>,
    headers: HeaderStore,
    parameter_map: Option<ParameterMap>,
}

impl HandshakeRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request URI
    pub fn request_uri(mut self, uri: Uri) -> Self {
        self.request_uri = Some(uri);
        self
    }

    /// Set the request path. Defaults to the path of the request URI.
    pub fn request_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = Some(path.into());
        self
    }

    pub fn query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    pub fn connection(mut self, connection: ConnectionId) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn http_session<S: Any + Send + Sync>(mut self, session: S) -> Self {
        self.http_session = Some(Arc::new(session));
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn user_principal(mut self, principal: impl Into<Arc<AuthenticatedUser>>) -> Self {
        self.user_principal = Some(principal.into());
        self
    }

    /// Set the delegate answering [`HandshakeRequest::is_user_in_role`]
    pub fn role_check<R: RoleCheck + 'static>(mut self, check: R) -> Self {
        self.role_check = Some(Arc::new(check));
        self
    }

    /// Set a header, replacing any earlier value under the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.put_single(name, value);
        self
    }

    /// Set a header to a list of values, replacing any earlier value
    pub fn header_values(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.headers.put(name, values);
        self
    }

    /// Set the parameters from name / value-collection pairs.
    ///
    /// Each value collection becomes an ordered list. Replaces any parameters
    /// set earlier.
    pub fn parameter_map<I, K, V, S>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map: ParameterMap = raw
            .into_iter()
            .map(|(name, values)| (name.into(), values.into_iter().map(Into::into).collect()))
            .collect();
        self.parameter_map = Some(map);
        self
    }

    /// Set or clear the parameters. `None` clears them and `build` falls back
    /// to an empty map.
    pub fn parameter_map_opt(mut self, map: Option<ParameterMap>) -> Self {
        self.parameter_map = map;
        self
    }

    /// Forget any parameters set so far
    pub fn clear_parameter_map(self) -> Self {
        self.parameter_map_opt(None)
    }

    /// Build a request from the current field values
    pub fn build(&self) -> HandshakeRequest {
        let request_uri = self.request_uri.clone().unwrap_or_default();
        let request_path = self
            .request_path
            .clone()
            .unwrap_or_else(|| request_uri.path().to_string());

        HandshakeRequest {
            request_uri,
            request_path,
            query_string: self.query_string.clone(),
            connection: self.connection,
            http_session: self.http_session.clone(),
            secure: self.secure,
            user_principal: self.user_principal.clone(),
            role_check: self.role_check.clone(),
            headers: self.headers.clone(),
            parameter_map: self.parameter_map.clone().unwrap_or_default(),
        }
    }
}
