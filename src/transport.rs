//! The single suspension point of a query: one HTTP round trip

use async_trait::async_trait;
use log::{debug, error, trace};

use crate::error::Error;
use crate::request::{HttpRequest, HttpResponse};

/// Sends an encoded request and hands back status + raw body.
/// Status codes >= 400 are not errors at this layer; decoders
/// need the body to find the provider's own message.
#[async_trait]
pub trait Transport: Send + Sync
{   async fn send(&self, request: HttpRequest)
      -> Result<HttpResponse, Error>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport
{   http_client: reqwest::Client
}

impl ReqwestTransport
{   pub fn new() -> Self
    {   debug!("Creating ReqwestTransport");
        ReqwestTransport
        {   http_client: reqwest::Client::new()
        }
    }

    /// Wrap a preconfigured client (user agent, proxy, TLS roots)
    pub fn with_client(http_client: reqwest::Client) -> Self
    {   ReqwestTransport { http_client }
    }

    /// Client identifying itself as `altphrase/<version>`
    pub fn with_user_agent() -> Result<Self, Error>
    {   let http_client = reqwest::Client::builder()
          .user_agent(concat!("altphrase/", env!("CARGO_PKG_VERSION")))
          .build()
          .map_err(|e| Error::Http(e.to_string()))?;
        Ok(ReqwestTransport::with_client(http_client))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error
{   if e.is_timeout()
    {   error!("Request timed out: {}", e);
        Error::Timeout
    } else
    {   error!("HTTP error: {}", e);
        Error::Http(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport
{   async fn send(&self, request: HttpRequest)
      -> Result<HttpResponse, Error>
    {   let method = reqwest::Method::from_bytes(request.method.as_bytes())
          .map_err(|e| Error::Http(e.to_string()))?;
        debug!("{} request with {}s timeout",
          method, request.timeout.as_secs());

        let mut builder = self.http_client
          .request(method, &request.url)
          .timeout(request.timeout)
          .body(request.body.to_string());
        // Content-Type comes with the encoder's headers
        for (name, value) in &request.headers
        {   builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
          .send()
          .await
          .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        trace!("Response status: {}", status);

        let body = response
          .text()
          .await
          .map_err(map_reqwest_error)?;
        trace!("Response body: {} bytes", body.len());

        Ok(HttpResponse { status, body })
    }
}
