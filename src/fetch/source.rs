// src/fetch/source.rs

use reqwest::Client;
use std::{future::Future, path::PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::LoadError;

/// Placeholder substituted with the four-digit year.
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Anything that can hand over the archive bytes for one year.
pub trait ArchiveSource {
    /// Human-readable retrieval target for `year` (URL, path, ...).
    fn describe(&self, year: i32) -> String;

    fn fetch_bytes(&self, year: i32) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send;
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` has no {{year}} placeholder")]
    MissingPlaceholder(String),
    #[error("template `{template}` does not form a valid URL: {source}")]
    InvalidUrl {
        template: String,
        #[source]
        source: url::ParseError,
    },
}

fn fill(template: &str, year: i32) -> String {
    template.replace(YEAR_PLACEHOLDER, &year.to_string())
}

fn require_placeholder(template: &str) -> Result<(), TemplateError> {
    if template.contains(YEAR_PLACEHOLDER) {
        Ok(())
    } else {
        Err(TemplateError::MissingPlaceholder(template.to_string()))
    }
}

/// Downloads `ALL_<year>.zip` style archives over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpArchiveSource {
    client: Client,
    template: String,
}

impl HttpArchiveSource {
    pub fn new(client: Client, template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        require_placeholder(&template)?;
        Url::parse(&fill(&template, 2000)).map_err(|source| TemplateError::InvalidUrl {
            template: template.clone(),
            source,
        })?;
        Ok(Self { client, template })
    }

    pub fn url_for(&self, year: i32) -> String {
        fill(&self.template, year)
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn describe(&self, year: i32) -> String {
        self.url_for(year)
    }

    async fn fetch_bytes(&self, year: i32) -> Result<Vec<u8>, LoadError> {
        let url = self.url_for(year);
        debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::retrieval(&url, e))?
            .error_for_status()
            .map_err(|e| LoadError::retrieval(&url, e))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| LoadError::retrieval(&url, format!("reading body: {}", e)))?;
        debug!(%url, size = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }
}

/// Reads archives from a local directory mirror of the remote source.
#[derive(Debug, Clone)]
pub struct MirrorArchiveSource {
    dir: PathBuf,
    file_template: String,
}

impl MirrorArchiveSource {
    pub fn new(
        dir: impl Into<PathBuf>,
        file_template: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let file_template = file_template.into();
        require_placeholder(&file_template)?;
        Ok(Self {
            dir: dir.into(),
            file_template,
        })
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir.join(fill(&self.file_template, year))
    }
}

impl ArchiveSource for MirrorArchiveSource {
    fn describe(&self, year: i32) -> String {
        self.path_for(year).display().to_string()
    }

    async fn fetch_bytes(&self, year: i32) -> Result<Vec<u8>, LoadError> {
        let path = self.path_for(year);
        tokio::fs::read(&path)
            .await
            .map_err(|e| LoadError::retrieval(path.display().to_string(), e))
    }
}
