//! GitHub REST contents API as a [`RemoteTreeSource`].

use std::fmt;

use reqwest::Url;
use serde::Deserialize;

use crate::error::{Result, SourceError};
use crate::http::{default_client, send_with_retry};
use crate::locator::RepositoryLocator;
use crate::source::{FileContent, RemoteTreeSource, TreeEntry};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";
/// Upper bound on followed `Link: rel="next"` pages for one directory.
const MAX_PAGES: usize = 200;
const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;
const DEFAULT_RATE_LIMIT_RETRIES: u32 = 3;

pub struct GitHubSource {
    client: reqwest::Client,
    api_url: Url,
    token: Option<String>,
    rate_limit_retries: u32,
}

impl fmt::Debug for GitHubSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSource")
            .field("client", &"<reqwest::Client>")
            .field("api_url", &self.api_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("rate_limit_retries", &self.rate_limit_retries)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<TreeEntry>),
    Single(FileContent),
}

#[derive(Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

impl GitHubSource {
    /// Source backed by the public GitHub API.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in API URL constant fails to parse.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: default_client(),
            api_url: Url::parse(DEFAULT_API_URL).expect("built-in API URL is valid"),
            token: None,
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
        }
    }

    /// Override the API base URL (GitHub Enterprise, tests).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidUrl`] if `url` is not an absolute base URL.
    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| SourceError::InvalidUrl(format!("{url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(format!("{url}: not a base URL")));
        }
        self.api_url = parsed;
        Ok(self)
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = retries;
        self
    }

    fn contents_url(&self, locator: &RepositoryLocator, path: &str, paged: bool) -> Result<Url> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| SourceError::InvalidUrl(self.api_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["repos", locator.owner(), locator.name(), "contents"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        let git_ref = locator.git_ref().as_query();
        if git_ref.is_some() || paged {
            let mut query = url.query_pairs_mut();
            if let Some(r) = git_ref {
                query.append_pair("ref", r);
            }
            if paged {
                query.append_pair("per_page", PER_PAGE);
            }
        }
        Ok(url)
    }

    async fn get(&self, url: &Url, path: &str) -> Result<(reqwest::header::HeaderMap, Vec<u8>)> {
        let response = send_with_retry(path, self.rate_limit_retries, || {
            let mut req = self
                .client
                .get(url.clone())
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", API_VERSION);
            if let Some(token) = &self.token {
                req = req.bearer_auth(token);
            }
            req.send()
        })
        .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = read_body(response, path).await?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<ApiMessage>(&body)
                .ok()
                .and_then(|m| m.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
            return Err(SourceError::remote(path, Some(status.as_u16()), reason));
        }
        Ok((headers, body))
    }
}

impl Default for GitHubSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteTreeSource for GitHubSource {
    async fn list_dir(&self, locator: &RepositoryLocator, path: &str) -> Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        let mut next = Some(self.contents_url(locator, path, true)?);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(SourceError::remote(
                    path,
                    None,
                    format!("more than {MAX_PAGES} pages in directory listing"),
                ));
            }

            let (headers, body) = self.get(&url, path).await?;
            match serde_json::from_slice::<ContentsResponse>(&body)? {
                ContentsResponse::Listing(page) => entries.extend(page),
                ContentsResponse::Single(_) => {
                    return Err(SourceError::remote(path, None, "path is not a directory"));
                }
            }

            next = next_page_link(&headers)
                .map(|link| {
                    Url::parse(&link).map_err(|e| {
                        SourceError::remote(path, None, format!("bad pagination link: {e}"))
                    })
                })
                .transpose()?;
        }

        tracing::debug!(path, pages, entries = entries.len(), "listed directory");
        Ok(entries)
    }

    async fn fetch_file(&self, locator: &RepositoryLocator, path: &str) -> Result<FileContent> {
        let url = self.contents_url(locator, path, false)?;
        let (_, body) = self.get(&url, path).await?;
        match serde_json::from_slice::<ContentsResponse>(&body)? {
            ContentsResponse::Single(file) => Ok(file),
            ContentsResponse::Listing(_) => {
                Err(SourceError::remote(path, None, "path is a directory"))
            }
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "github"
    }
}

/// Read a response body, refusing anything over [`MAX_RESPONSE_BYTES`]
/// before it is fully buffered.
async fn read_body(mut response: reqwest::Response, path: &str) -> Result<Vec<u8>> {
    let status = Some(response.status().as_u16());
    let too_large = |len: u64| {
        SourceError::remote(path, status, format!("response body too large ({len} bytes)"))
    };
    if let Some(len) = response.content_length()
        && len > MAX_RESPONSE_BYTES as u64
    {
        return Err(too_large(len));
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
            return Err(too_large((body.len() + chunk.len()) as u64));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn next_page_link(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    parse_next_link(value)
}

fn parse_next_link(value: &str) -> Option<String> {
    value.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_owned)
    })
}
