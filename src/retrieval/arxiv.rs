//! Scientific literature search over the arXiv Atom API

use super::{SearchHit, SearchProvider};
use crate::error::ResearchError;
use crate::models::Source;
use crate::Result;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub struct ArxivClient {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl ArxivClient {
    pub fn new(base_url: String, max_results: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            max_results,
        })
    }
}

#[async_trait]
impl SearchProvider for ArxivClient {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let search_query = format!("all:{}", query);
        let max_results = self.max_results.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResearchError::RetrievalError(format!("arXiv request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::RetrievalError(format!(
                "arXiv returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResearchError::RetrievalError(format!("arXiv body unreadable: {}", e)))?;

        let hits: Vec<SearchHit> = parse_atom_feed(&body)?
            .into_iter()
            .take(self.max_results)
            .map(|entry| SearchHit {
                source: Source::from_content(entry.link, entry.title, &entry.summary),
                content: entry.summary,
            })
            .collect();

        debug!(hits = hits.len(), "arXiv search completed");
        Ok(hits)
    }
}

/// One `<entry>` of an Atom feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
}

#[derive(Default)]
struct EntryBuilder {
    entry: FeedEntry,
    alternate_link: Option<String>,
    first_link: Option<String>,
}

impl EntryBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Id => &mut self.entry.id,
            Field::Title => &mut self.entry.title,
            Field::Summary => &mut self.entry.summary,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(text);
    }

    fn record_link(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let mut href = None;
        let mut rel = None;

        for attr in element.attributes() {
            let attr = attr.map_err(|e| feed_error(format!("bad link attribute: {}", e)))?;
            let value = attr
                .unescape_value()
                .map_err(|e| feed_error(e.to_string()))?
                .into_owned();
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }

        let Some(href) = href else {
            return Ok(());
        };

        // Atom treats a link without rel as rel="alternate".
        if matches!(rel.as_deref(), None | Some("alternate")) && self.alternate_link.is_none() {
            self.alternate_link = Some(href.clone());
        }
        if self.first_link.is_none() {
            self.first_link = Some(href);
        }
        Ok(())
    }

    fn finish(self) -> FeedEntry {
        let mut entry = self.entry;
        entry.title = collapse_whitespace(&entry.title);
        entry.summary = collapse_whitespace(&entry.summary);
        entry.id = entry.id.trim().to_string();
        entry.link = self
            .alternate_link
            .or(self.first_link)
            .unwrap_or_else(|| entry.id.clone());
        entry
    }
}

fn feed_error(message: String) -> ResearchError {
    ResearchError::RetrievalError(format!("Invalid Atom feed: {}", message))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the entries of an Atom feed document.
///
/// Feed-level elements are ignored; only `id`, `title`, `summary` and `link`
/// inside each `<entry>` are read.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"entry" => {
                    current = Some(EntryBuilder::default());
                    field = None;
                }
                b"id" if current.is_some() => field = Some(Field::Id),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"summary" if current.is_some() => field = Some(Field::Summary),
                b"link" => {
                    if let Some(builder) = current.as_mut() {
                        builder.record_link(&element)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(element)) => {
                if element.local_name().as_ref() == b"link" {
                    if let Some(builder) = current.as_mut() {
                        builder.record_link(&element)?;
                    }
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    let text = text.unescape().map_err(|e| feed_error(e.to_string()))?;
                    builder.push_text(f, &text);
                }
            }
            Ok(Event::CData(data)) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    let raw = data.into_inner();
                    builder.push_text(f, &String::from_utf8_lossy(&raw));
                }
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"entry" => {
                    if let Some(builder) = current.take() {
                        entries.push(builder.finish());
                    }
                    field = None;
                }
                b"id" | b"title" | b"summary" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(feed_error(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}
