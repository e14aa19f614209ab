//! The seam between the client and whatever actually performs HTTP.
//!
//! [`reqwest::Client`] is the default; embedders with their own outbound
//! HTTP facility implement [`Transport`] for it instead.

use crate::{endpoints::Method, error::TransportError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, Secret};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Pre-encoded basic auth credential, without the `Basic ` prefix.
    pub auth_token: Secret<String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.auth_token.expose_secret())
    }

    pub fn content_type_header(&self) -> &'static str {
        "application/json"
    }
}

/// A reply whose body has already been read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request with `Authorization` and `Content-Type` headers set
    /// from [`HttpRequest::authorization_header`] and
    /// [`HttpRequest::content_type_header`], and reads the whole body.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self
            .request(method, &request.url)
            .header(AUTHORIZATION, request.authorization_header())
            .header(CONTENT_TYPE, request.content_type_header());
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::ReadBody(Box::new(e)))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}
