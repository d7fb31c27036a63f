use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, ClientBuilder, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::Config;
use crate::domain::{Category, Credentials, Project, ProjectListing};
use crate::error::{ExportError, error_chain};
use crate::layout::write_atomic;

pub trait GlitchClient: Send + Sync {
    fn listing_url(&self, credentials: &Credentials, category: Category, limit: u32) -> String;
    fn list_projects(
        &self,
        credentials: &Credentials,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Project>, ExportError>;
    fn download_archive(
        &self,
        credentials: &Credentials,
        project: &Project,
        destination: &Path,
    ) -> Result<u64, ExportError>;
    /// Opens a session for one project's asset downloads. With `relax_tls` the
    /// session skips certificate validation; that setting dies with the session.
    fn asset_session(&self, relax_tls: bool) -> Result<Box<dyn AssetSession + '_>, ExportError>;
}

pub trait AssetSession {
    fn download(&self, url: &str, destination: &Path) -> Result<u64, ExportError>;
}

#[derive(Clone)]
pub struct GlitchHttpClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl GlitchHttpClient {
    pub fn new(config: &Config) -> Result<Self, ExportError> {
        let client = Self::builder(config.timeout())?
            .build()
            .map_err(|err| ExportError::GlitchHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url().to_string(),
            timeout: config.timeout(),
        })
    }

    fn builder(timeout: Option<Duration>) -> Result<ClientBuilder, ExportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("glitch-export/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ExportError::GlitchHttp(err.to_string()))?,
        );
        Ok(Client::builder().default_headers(headers).timeout(timeout))
    }

    pub fn download_url(&self) -> String {
        format!("{}/project/download/", self.base_url)
    }

    fn handle_status(response: Response) -> Result<Response, ExportError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(ExportError::GlitchStatus {
            status: response.status().as_u16(),
            url: redact_url(response.url()),
        })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, ExportError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying Glitch request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(attempt, "retrying Glitch request after transport error");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(ExportError::GlitchHttp(error_chain(&err.without_url())));
                }
            }
        }
    }
}

impl GlitchClient for GlitchHttpClient {
    fn listing_url(&self, credentials: &Credentials, category: Category, limit: u32) -> String {
        format!(
            "{}/v1/users/by/id/{}?id={}&limit={limit}",
            self.base_url,
            category.listing_segment(),
            credentials.user_id()
        )
    }

    fn list_projects(
        &self,
        credentials: &Credentials,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Project>, ExportError> {
        let url = format!(
            "{}/v1/users/by/id/{}",
            self.base_url,
            category.listing_segment()
        );
        let limit = limit.to_string();
        let response = self.send_with_retries(|| {
            self.client
                .get(&url)
                .header(AUTHORIZATION, credentials.token())
                .query(&[("id", credentials.user_id()), ("limit", limit.as_str())])
        })?;
        let response = Self::handle_status(response)?;
        let text = response
            .text()
            .map_err(|err| ExportError::GlitchHttp(error_chain(&err.without_url())))?;
        parse_listing(&text)
    }

    fn download_archive(
        &self,
        credentials: &Credentials,
        project: &Project,
        destination: &Path,
    ) -> Result<u64, ExportError> {
        let url = self.download_url();
        let response = self.send_with_retries(|| {
            self.client.get(&url).query(&[
                ("authorization", credentials.token()),
                ("projectId", project.id.as_str()),
            ])
        })?;
        let mut response = Self::handle_status(response)?;
        write_atomic(destination, &mut response)
    }

    fn asset_session(&self, relax_tls: bool) -> Result<Box<dyn AssetSession + '_>, ExportError> {
        if !relax_tls {
            return Ok(Box::new(HttpAssetSession {
                client: self.client.clone(),
            }));
        }
        tracing::warn!("certificate validation disabled for asset downloads");
        let client = Self::builder(self.timeout)?
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| ExportError::AssetHttp(error_chain(&err)))?;
        Ok(Box::new(HttpAssetSession { client }))
    }
}

pub struct HttpAssetSession {
    client: Client,
}

impl AssetSession for HttpAssetSession {
    fn download(&self, url: &str, destination: &Path) -> Result<u64, ExportError> {
        let url = Url::parse(url).map_err(|err| ExportError::InvalidUrl(format!("{url}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExportError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                url.scheme()
            )));
        }
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ExportError::AssetHttp(error_chain(&err.without_url())))?;
        if !response.status().is_success() {
            return Err(ExportError::AssetStatus {
                status: response.status().as_u16(),
            });
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|err| ExportError::Filesystem(err.to_string()))?;
        }
        write_atomic(destination, &mut response)
    }
}

/// Parses a listing response body; anything that is not a listing object is an error.
pub fn parse_listing(text: &str) -> Result<Vec<Project>, ExportError> {
    let listing: ProjectListing =
        serde_json::from_str(text).map_err(|err| ExportError::ListingParse(err.to_string()))?;
    Ok(listing.items)
}

/// Drops the query string so tokens never end up in logs.
fn redact_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
