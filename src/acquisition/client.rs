use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{MAX_REDIRECTS, USER_AGENT};

/// Shared HTTP client with the headers every request carries
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Client sending `Authorization: Bearer <token>` on every request
    pub fn authenticated(token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            ProcessingError::Config("EDL_TOKEN contains characters not allowed in a header".to_string())
        })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let inner = Self::builder().default_headers(headers).build()?;
        Ok(Self { inner })
    }

    /// Client without credentials, for public archives
    pub fn anonymous() -> Result<Self> {
        let inner = Self::builder().build()?;
        Ok(Self { inner })
    }

    fn builder() -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
    }

    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

/// Turn a non-2xx response into `HttpStatus`
pub fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProcessingError::HttpStatus {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}
