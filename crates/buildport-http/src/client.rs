//! The shared API client.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use buildport_nav::{NavigationBridge, Route};
use buildport_storage::CredentialCache;
use futures_util::future::BoxFuture;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ApiError;

/// Produces the `Authorization` header for an outgoing request.
///
/// Installed on the [`ApiClient`] for the lifetime of an authenticated
/// session. The future is boxed so the client can hold any implementation
/// behind a trait object.
pub trait RequestAuthorizer: Send + Sync {
    /// Returns the header value, e.g. `Bearer eyJ...`.
    ///
    /// # Errors
    /// [`ApiError::Unauthenticated`] when no valid credential can be
    /// produced. The request is not sent.
    fn authorize(&self) -> BoxFuture<'_, Result<HeaderValue, ApiError>>;
}

struct ClientInner {
    http: Client,
    base_url: String,
    error_route: Route,
    navigation: Arc<NavigationBridge>,
    authorizer: RwLock<Option<Arc<dyn RequestAuthorizer>>>,
    default_authorization: RwLock<Option<HeaderValue>>,
}

/// The process-wide backend client.
///
/// Cheap to clone: every clone shares the same connection pool,
/// authorizer and default headers, so installing an interceptor on one
/// handle affects them all.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn error_route(&self) -> &Route {
        &self.inner.error_route
    }

    /// Starts a request to `path` relative to the base URL.
    ///
    /// Authorization is NOT applied here; it is added by [`execute`](Self::execute)
    /// so a token refresh can happen right before sending.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = if path.starts_with('/') {
            format!("{}{}", self.inner.base_url, path)
        } else {
            format!("{}/{}", self.inner.base_url, path)
        };
        self.inner.http.request(method, url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.request(Method::PATCH, path).json(body)).await
    }

    /// Deletes a resource. The response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// Sends the request and decodes a JSON body.
    ///
    /// An empty body (e.g. `204 No Content`) decodes as JSON `null`, so
    /// `()`, `Option<T>` and `serde_json::Value` accept it.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes[..] };
        serde_json::from_slice(body).map_err(ApiError::Decode)
    }

    /// Authorizes and sends the request, applying the error policy.
    ///
    /// - 2xx → `Ok(response)`
    /// - ≥ 500 → navigates to the error route, then `Err(Status)`
    /// - anything else → `Err(Status)` with no navigation
    /// - no response → `Err(Request)` with no navigation
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = self.authorize(request).await?;
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() >= 500 {
            tracing::warn!(
                %url,
                status = status.as_u16(),
                "server fault, redirecting to error route"
            );
            self.inner.navigation.navigate(&self.inner.error_route);
        } else {
            tracing::debug!(%url, status = status.as_u16(), "request failed");
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Installs the authorizer used for every following request.
    /// Replaces any previous one.
    pub fn install_authorizer(&self, authorizer: Arc<dyn RequestAuthorizer>) {
        *self
            .inner
            .authorizer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(authorizer);
    }

    /// Removes the installed authorizer. Returns `true` if one was installed.
    pub fn remove_authorizer(&self) -> bool {
        self.inner
            .authorizer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub fn has_authorizer(&self) -> bool {
        self.inner
            .authorizer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Sets a default `Authorization` header, used when no authorizer is installed.
    ///
    /// # Errors
    /// [`ApiError::Configuration`] if `value` isn't a valid header value.
    pub fn set_default_authorization(&self, value: &str) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::Configuration(format!("authorization header: {e}")))?;
        *self
            .inner
            .default_authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }

    pub fn has_default_authorization(&self) -> bool {
        self.inner
            .default_authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        // Clone out of the lock; it must not be held across the await.
        let authorizer = self
            .inner
            .authorizer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(authorizer) = authorizer {
            let value = authorizer.authorize().await?;
            return Ok(request.header(header::AUTHORIZATION, value));
        }

        let default = self
            .inner
            .default_authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Ok(match default {
            Some(value) => request.header(header::AUTHORIZATION, value),
            None => request,
        })
    }
}

impl CredentialCache for ApiClient {
    fn clear_default_authorization(&self) {
        self.inner
            .default_authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("error_route", &self.inner.error_route)
            .field("has_authorizer", &self.has_authorizer())
            .finish()
    }
}

/// Builder for [`ApiClient`].
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    navigation: Option<Arc<NavigationBridge>>,
    error_route: Option<Route>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// The bridge used to redirect on server faults. Required.
    pub fn navigation(mut self, navigation: Arc<NavigationBridge>) -> Self {
        self.navigation = Some(navigation);
        self
    }

    /// Where server faults send the user. Default: `/error`.
    pub fn error_route(mut self, route: impl Into<Route>) -> Self {
        self.error_route = Some(route.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    /// [`ApiError::Configuration`] if the base URL or navigation bridge is
    /// missing, or the base URL doesn't parse.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Configuration("base_url is required".into()))?;
        reqwest::Url::parse(&base_url)
            .map_err(|e| ApiError::Configuration(format!("base_url {base_url:?}: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let navigation = self
            .navigation
            .ok_or_else(|| ApiError::Configuration("navigation bridge is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let mut client_builder = ClientBuilder::new().default_headers(headers);
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("buildport/", env!("CARGO_PKG_VERSION")).to_string()),
        );

        let http = client_builder.build()?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                error_route: self.error_route.unwrap_or_else(|| Route::new("/error")),
                navigation,
                authorizer: RwLock::new(None),
                default_authorization: RwLock::new(None),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use buildport_nav::MemoryLocation;

    use super::*;

    fn bridge() -> Arc<NavigationBridge> {
        Arc::new(NavigationBridge::new(Arc::new(MemoryLocation::new())))
    }

    #[test]
    fn test_build_requires_base_url() {
        let result = ApiClient::builder().navigation(bridge()).build();

        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn test_build_requires_navigation() {
        let result = ApiClient::builder().base_url("http://localhost:8080").build();

        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn test_build_rejects_unparseable_base_url() {
        let result = ApiClient::builder()
            .base_url("not a url")
            .navigation(bridge())
            .build();

        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn test_build_trims_trailing_slash_and_defaults_error_route() {
        let client = ApiClient::builder()
            .base_url("http://localhost:8080/api/")
            .navigation(bridge())
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(client.error_route().as_str(), "/error");
    }

    #[test]
    fn test_default_authorization_cleared_through_credential_cache() {
        let client = ApiClient::builder()
            .base_url("http://localhost:8080")
            .navigation(bridge())
            .build()
            .unwrap();
        client.set_default_authorization("Bearer abc").unwrap();
        assert!(client.has_default_authorization());

        client.clear_default_authorization();

        assert!(!client.has_default_authorization());
    }

    #[test]
    fn test_set_default_authorization_rejects_invalid_header() {
        let client = ApiClient::builder()
            .base_url("http://localhost:8080")
            .navigation(bridge())
            .build()
            .unwrap();

        let result = client.set_default_authorization("Bearer \n");

        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }
}
