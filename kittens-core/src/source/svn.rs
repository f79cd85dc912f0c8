//! Minimal Subversion DAV client
//!
//! Only the `log-report` REPORT request is supported, which is all the model
//! needs to follow a repository.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use super::{LogLimit, RevisionRef, RevisionSource};
use crate::config::parse_source_url;
use crate::error::{ConfigError, SourceError};
use crate::types::Revision;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the `log-report` request of a Subversion DAV server
#[derive(Debug, Clone)]
pub struct SvnClient {
    url: Url,
    http: reqwest::Client,
    report: Method,
}

impl SvnClient {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let url = parse_source_url(url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let report =
            Method::from_bytes(b"REPORT").map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { url, http, report })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RevisionSource for SvnClient {
    async fn head(&self) -> Result<Revision, SourceError> {
        self.log(RevisionRef::Head, RevisionRef::Head, LogLimit::Max(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Malformed("empty log report for HEAD".to_string()))
    }

    async fn log(
        &self,
        start: RevisionRef,
        end: RevisionRef,
        limit: LogLimit,
    ) -> Result<Vec<Revision>, SourceError> {
        debug!(url = %self.url, %start, %end, ?limit, "Requesting log report");

        let body = self
            .http
            .request(self.report.clone(), self.url.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(log_request_payload(start, end, limit))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_log_report(&body)
    }
}

/// Body of a `log-report` REPORT request
fn log_request_payload(start: RevisionRef, end: RevisionRef, limit: LogLimit) -> String {
    let mut payload = String::from(r#"<?xml version="1.0"?><S:log-report xmlns:S="svn:">"#);
    payload.push_str(&format!(
        "<S:start-revision>{}</S:start-revision><S:end-revision>{}</S:end-revision>",
        start.as_raw(),
        end.as_raw()
    ));
    if let LogLimit::Max(n) = limit {
        payload.push_str(&format!("<S:limit>{n}</S:limit>"));
    }
    payload.push_str("<S:discover-changed-paths/></S:log-report>");
    payload
}

/// Elements of a `log-item` that carry revision data
#[derive(Debug, Clone, Copy)]
enum Field {
    VersionName,
    Comment,
    Date,
    Author,
    Path,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"version-name" => Some(Field::VersionName),
            b"comment" => Some(Field::Comment),
            b"date" => Some(Field::Date),
            b"creator-displayname" => Some(Field::Author),
            b"added-path" | b"modified-path" | b"replaced-path" | b"deleted-path" => {
                Some(Field::Path)
            }
            _ => None,
        }
    }
}

/// Revision being assembled from a `log-item`
#[derive(Default)]
struct PartialRevision {
    id: Option<i64>,
    comment: String,
    date: String,
    author: String,
    paths: Vec<String>,
}

impl PartialRevision {
    fn set(&mut self, field: Field, text: String) -> Result<(), SourceError> {
        match field {
            Field::VersionName => {
                let id = text.trim().parse::<i64>().map_err(|e| {
                    SourceError::Malformed(format!("bad version-name {text:?}: {e}"))
                })?;
                self.id = Some(id);
            }
            Field::Comment => self.comment = text,
            Field::Date => self.date = text,
            Field::Author => self.author = text,
            Field::Path => self.paths.push(text),
        }
        Ok(())
    }

    fn finish(self) -> Result<Revision, SourceError> {
        let id = self
            .id
            .ok_or_else(|| SourceError::Malformed("log-item without version-name".to_string()))?;
        Ok(Revision {
            id,
            comment: self.comment,
            date: self.date,
            author: self.author,
            paths: self.paths,
        })
    }
}

/// Parse the body of a `log-report` response
pub fn parse_log_report(xml: &str) -> Result<Vec<Revision>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut revisions = Vec::new();
    let mut item: Option<PartialRevision> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = start.local_name();
                if name.as_ref() == b"log-item" {
                    item = Some(PartialRevision::default());
                } else if item.is_some() {
                    field = Field::from_tag(name.as_ref());
                    text.clear();
                }
            }
            Event::Text(chunk) if field.is_some() => {
                let unescaped = chunk
                    .unescape()
                    .map_err(|e| SourceError::Malformed(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(chunk) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&chunk));
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"log-item" {
                    let finished = item
                        .take()
                        .ok_or_else(|| SourceError::Malformed("unbalanced log-item".to_string()))?;
                    revisions.push(finished.finish()?);
                    field = None;
                } else if let (Some(f), Some(partial)) = (field.take(), item.as_mut()) {
                    partial.set(f, std::mem::take(&mut text))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if item.is_some() {
        return Err(SourceError::Malformed(
            "log report ended inside a log-item".to_string(),
        ));
    }
    Ok(revisions)
}
