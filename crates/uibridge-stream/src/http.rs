use std::fmt;
use std::io::{ErrorKind, Read};
use std::pin::Pin;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use futures_util::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};
use url::Url;

use crate::config::HttpConnectorConfig;
use crate::error::{Result, StreamError};
use crate::supervisor::StreamConnector;

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Opens engine event streams with an HTTP `GET`.
///
/// Requests run on a private current-thread runtime so the supervisor can
/// keep polling from a plain thread. Body framing (chunked or read to close)
/// is decoded by the client.
#[derive(Debug, Clone)]
pub struct HttpStreamConnector {
    url: Url,
    config: HttpConnectorConfig,
    client: reqwest::Client,
    runtime: Arc<Runtime>,
}

impl HttpStreamConnector {
    /// Accepts `http://` URLs only.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, HttpConnectorConfig::default())
    }

    pub fn with_config(url: &str, config: HttpConnectorConfig) -> Result<Self> {
        let invalid = |reason: String| StreamError::InvalidUrl {
            url: url.to_string(),
            reason,
        };
        let parsed = Url::parse(url).map_err(|err| invalid(err.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme {:?}", parsed.scheme())));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .no_proxy()
            .build()?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            url: parsed,
            config,
            client,
            runtime: Arc::new(runtime),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &HttpConnectorConfig {
        &self.config
    }

    fn addr(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

impl StreamConnector for HttpStreamConnector {
    type Stream = HttpStream;

    fn open(&mut self) -> Result<HttpStream> {
        let request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/plain")
            .send();
        let header_timeout = self.config.header_timeout;
        let response = self
            .runtime
            .block_on(async move { tokio::time::timeout(header_timeout, request).await })
            .map_err(|_| {
                StreamError::Io(std::io::Error::new(
                    ErrorKind::TimedOut,
                    "timed out waiting for response headers",
                ))
            })?
            .map_err(|err| {
                if err.is_connect() {
                    StreamError::Connect {
                        addr: self.addr(),
                        source: err,
                    }
                } else {
                    StreamError::Http(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        info!(url = %self.url, status = status.as_u16(), "event stream opened");
        Ok(HttpStream {
            runtime: Arc::clone(&self.runtime),
            body: Box::pin(response.bytes_stream()),
            pending: Bytes::new(),
            finished: false,
            poll_window: self.config.poll_window,
        })
    }
}

/// Body of an event stream response.
///
/// Reads return `WouldBlock` when no data arrives within the poll window.
pub struct HttpStream {
    runtime: Arc<Runtime>,
    body: BodyStream,
    pending: Bytes,
    finished: bool,
    poll_window: std::time::Duration,
}

impl fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Read for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pending.is_empty() {
            if self.finished {
                return Ok(0);
            }
            let window = self.poll_window;
            let body = &mut self.body;
            let next = self
                .runtime
                .block_on(async move { tokio::time::timeout(window, body.next()).await });
            match next {
                Err(_) => return Err(ErrorKind::WouldBlock.into()),
                Ok(None) => {
                    debug!("event stream body ended");
                    self.finished = true;
                }
                Ok(Some(Ok(chunk))) => self.pending = chunk,
                Ok(Some(Err(err))) => {
                    self.finished = true;
                    return Err(std::io::Error::other(err));
                }
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}
