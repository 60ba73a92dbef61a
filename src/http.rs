//! Blocking HTTP glue producing [`ResponseStream`]s.
//!
//! Requests go through an async `reqwest::Client` driven by a private
//! tokio runtime, so none of these functions may be called from inside
//! another tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Body, Method, Response, StatusCode};
use tokio::runtime::Runtime;
use url::Url;

use crate::config::{Config, SessionConfig, StreamConfig};
use crate::source::{ChunkSource, Pull};
use crate::stream::ResponseStream;
use crate::{Error, Result};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/89.0.4389.90 Safari/537.36";

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,\
     application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,\
     application/signed-exchange;v=b3;q=0.9";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7";

/// Browser-like headers sent with every session request.
pub fn default_headers(user_agent: Option<&str>) -> Result<HeaderMap> {
    let user_agent = HeaderValue::from_str(
        user_agent.unwrap_or(DEFAULT_USER_AGENT),
    )
    .map_err(|e| Error::Config(format!("Invalid user agent: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert("Accept", HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
    );
    headers.insert("Dnt", HeaderValue::from_static("1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("User-Agent", user_agent);
    Ok(headers)
}

/// When a response status should turn into [`Error::Status`].
///
/// Only 4xx and 5xx statuses are ever raised.
#[derive(Clone, Copy, Debug, Default)]
pub enum RaiseForStatus {
    #[default]
    Never,
    Always,
    When(fn(StatusCode) -> bool),
}

impl RaiseForStatus {
    pub fn check(&self, status: StatusCode, url: &Url) -> Result<()> {
        let wanted = match self {
            Self::Never => false,
            Self::Always => true,
            Self::When(predicate) => predicate(status),
        };

        if wanted && (status.is_client_error() || status.is_server_error()) {
            return Err(Error::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

impl From<bool> for RaiseForStatus {
    fn from(raise: bool) -> Self {
        if raise {
            Self::Always
        } else {
            Self::Never
        }
    }
}

/// Chunk source reading a response body as it arrives.
pub struct ResponseSource {
    runtime: Arc<Runtime>,
    response: Response,
    done: bool,
}

impl ResponseSource {
    pub fn new(runtime: Arc<Runtime>, response: Response) -> Self {
        Self {
            runtime,
            response,
            done: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn url(&self) -> &Url {
        self.response.url()
    }

    /// Body length announced by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }
}

impl ChunkSource for ResponseSource {
    type Error = reqwest::Error;

    fn pull(&mut self) -> std::result::Result<Pull, Self::Error> {
        if self.done {
            return Ok(Pull::Exhausted);
        }

        let response = &mut self.response;
        match self.runtime.block_on(async { response.chunk().await })? {
            Some(chunk) => Ok(Pull::Chunk(chunk)),
            None => {
                self.done = true;
                Ok(Pull::Exhausted)
            }
        }
    }
}

/// Client with browser-like default headers and a status policy.
pub struct Session {
    runtime: Arc<Runtime>,
    client: reqwest::Client,
    raise_for_status: RaiseForStatus,
    stream_config: StreamConfig,
}

impl Session {
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        Self::with_config(
            &SessionConfig {
                user_agent: user_agent.map(str::to_owned),
                ..SessionConfig::default()
            },
            StreamConfig::default(),
        )
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(&config.session, config.stream.clone())
    }

    pub fn with_config(
        config: &SessionConfig,
        stream_config: StreamConfig,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers(config.user_agent.as_deref())?);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            runtime: Arc::new(Runtime::new()?),
            client: builder.build()?,
            raise_for_status: config.raise_for_status.into(),
            stream_config,
        })
    }

    pub fn raise_for_status(mut self, policy: RaiseForStatus) -> Self {
        self.raise_for_status = policy;
        self
    }

    /// Send a request and wait for the response head. The body is left
    /// unread.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Body>,
    ) -> Result<Response> {
        let url = Url::parse(url)?;
        log::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.body(body);
        }
        // send() arms the timeout timer, so it has to run on the runtime
        let response =
            self.runtime.block_on(async { request.send().await })?;
        log::debug!("{} answered {}", url, response.status());

        self.raise_for_status.check(response.status(), &url)?;
        Ok(response)
    }

    pub fn head(&self, url: &str) -> Result<Response> {
        self.request(Method::HEAD, url, None)
    }

    pub fn get(&self, url: &str) -> Result<ResponseStream<ResponseSource>> {
        let response = self.request(Method::GET, url, None)?;
        Ok(self.stream(response))
    }

    pub fn post<B: Into<Body>>(
        &self,
        url: &str,
        body: B,
    ) -> Result<ResponseStream<ResponseSource>> {
        let response = self.request(Method::POST, url, Some(body.into()))?;
        Ok(self.stream(response))
    }

    /// Whole response body of a GET.
    pub fn get_blob(&self, url: &str) -> Result<Bytes> {
        let response = self.request(Method::GET, url, None)?;
        Ok(self.runtime.block_on(async { response.bytes().await })?)
    }

    pub fn get_html(&self, url: &str) -> Result<String> {
        let response = self.request(Method::GET, url, None)?;
        Ok(self.runtime.block_on(async { response.text().await })?)
    }

    pub fn post_html<B: Into<Body>>(
        &self,
        url: &str,
        body: B,
    ) -> Result<String> {
        let response = self.request(Method::POST, url, Some(body.into()))?;
        Ok(self.runtime.block_on(async { response.text().await })?)
    }

    /// Seekable view over the body of `response`. It shares this session's
    /// runtime and stays usable after the session is dropped.
    pub fn stream(&self, response: Response) -> ResponseStream<ResponseSource> {
        ResponseStream::with_config(
            ResponseSource::new(self.runtime.clone(), response),
            &self.stream_config,
        )
    }
}

pub fn head(url: &str) -> Result<Response> {
    Session::new(None)?.head(url)
}

pub fn get(url: &str) -> Result<ResponseStream<ResponseSource>> {
    Session::new(None)?.get(url)
}

pub fn post<B: Into<Body>>(
    url: &str,
    body: B,
) -> Result<ResponseStream<ResponseSource>> {
    Session::new(None)?.post(url, body)
}

pub fn get_blob(url: &str) -> Result<Bytes> {
    Session::new(None)?.get_blob(url)
}

pub fn get_html(url: &str) -> Result<String> {
    Session::new(None)?.get_html(url)
}

pub fn post_html<B: Into<Body>>(url: &str, body: B) -> Result<String> {
    Session::new(None)?.post_html(url, body)
}
