//! Feed parsing logic for RSS and Atom formats.
//!
//! RSS bodies are read with a streaming reader so every field reaches the
//! output feeds exactly as the source wrote it. Atom bodies go through
//! `feed-rs`.

use std::collections::HashSet;

use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use super::types::{Entry, ParsedFeed};
use super::util::{body_preview, cleanup_xml};
use crate::error::FeedParseError;
use crate::TARGET_WEB_REQUEST;

/// Parse a feed body, retrying once on a cleaned-up copy if the first pass fails.
pub fn parse_feed(body: &str) -> Result<ParsedFeed, FeedParseError> {
    match parse_feed_once(body) {
        Ok(feed) => Ok(feed),
        Err(first_err) => {
            let cleaned = cleanup_xml(body);
            if !looks_like_feed(&cleaned) {
                return Err(FeedParseError::NotAFeed(body_preview(body)));
            }
            debug!(target: TARGET_WEB_REQUEST, "First parse failed ({}), retrying after XML cleanup", first_err);
            let feed = parse_feed_once(&cleaned)?;
            warn!(target: TARGET_WEB_REQUEST, "Feed parsed successfully after XML cleanup");
            Ok(feed)
        }
    }
}

fn looks_like_feed(body: &str) -> bool {
    body.contains("<rss") || body.contains("<rdf:RDF") || body.contains("<feed")
}

fn is_rss(body: &str) -> bool {
    body.contains("<rss") || body.contains("<rdf:RDF")
}

fn parse_feed_once(body: &str) -> Result<ParsedFeed, FeedParseError> {
    let feed = if is_rss(body) {
        parse_rss(body)?
    } else if body.contains("<feed") {
        parse_atom(body)?
    } else {
        return Err(FeedParseError::NotAFeed(body_preview(body)));
    };
    Ok(dedup_entries(feed))
}

/// Fields collected for one `<item>` while streaming.
#[derive(Default)]
struct ItemBuilder {
    title: String,
    link: String,
    guid: String,
    description: String,
    pub_date: String,
    dc_date: String,
    /// One entry per `<dc:creator>` element.
    creators: Vec<String>,
}

impl ItemBuilder {
    fn begin_field(&mut self, element: &str) {
        if element == "dc:creator" {
            self.creators.push(String::new());
        }
    }

    fn field_mut(&mut self, element: &str) -> Option<&mut String> {
        match element {
            "title" => Some(&mut self.title),
            "link" => Some(&mut self.link),
            "guid" => Some(&mut self.guid),
            "description" => Some(&mut self.description),
            "pubDate" => Some(&mut self.pub_date),
            "dc:date" => Some(&mut self.dc_date),
            "dc:creator" => self.creators.last_mut(),
            _ => None,
        }
    }

    fn build(self) -> Option<Entry> {
        let link = self.link.trim().to_string();
        if link.is_empty() {
            return None;
        }
        let guid = self.guid.trim();
        let id = if guid.is_empty() {
            link.clone()
        } else {
            guid.to_string()
        };
        let published = if self.pub_date.trim().is_empty() {
            self.dc_date.trim().to_string()
        } else {
            self.pub_date.trim().to_string()
        };
        let creators: Vec<&str> = self
            .creators
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        Some(Entry {
            id,
            title: self.title,
            link,
            summary: self.description,
            published,
            authors: (!creators.is_empty()).then(|| creators.join(", ")),
        })
    }
}

fn is_container(name: &str) -> bool {
    matches!(name, "rss" | "channel" | "rdf:RDF")
}

/// Where character data currently belongs.
enum Scope {
    Channel,
    Item(ItemBuilder),
}

fn parse_rss(body: &str) -> Result<ParsedFeed, FeedParseError> {
    let mut reader = Reader::from_str(body);

    let mut feed = ParsedFeed::default();
    let mut channel_title = String::new();
    let mut channel_build_date = String::new();
    let mut scope = Scope::Channel;
    let mut current_element = String::new();
    let mut depth_in_field = 0usize;
    let mut skipped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    scope = Scope::Item(ItemBuilder::default());
                    current_element.clear();
                } else if is_container(&name) {
                    continue;
                } else if current_element.is_empty() {
                    if let Scope::Item(item) = &mut scope {
                        item.begin_field(&name);
                    }
                    current_element = name;
                } else {
                    // Nested markup inside a field, e.g. XHTML in a description.
                    depth_in_field += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if depth_in_field > 0 {
                    depth_in_field -= 1;
                } else if is_container(&name) {
                    continue;
                } else if name == "item" {
                    if let Scope::Item(item) = std::mem::replace(&mut scope, Scope::Channel) {
                        match item.build() {
                            Some(entry) => feed.entries.push(entry),
                            None => {
                                skipped += 1;
                                warn!(target: TARGET_WEB_REQUEST, "Feed entry missing link, skipping");
                            }
                        }
                    }
                    current_element.clear();
                } else if name == current_element {
                    current_element.clear();
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FeedParseError::Xml(err.to_string()))?;
                append_text(
                    &mut scope,
                    &current_element,
                    &text,
                    &mut channel_title,
                    &mut channel_build_date,
                );
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                let text = String::from_utf8_lossy(&raw);
                append_text(
                    &mut scope,
                    &current_element,
                    &text,
                    &mut channel_title,
                    &mut channel_build_date,
                );
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(FeedParseError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    err
                )))
            }
        }
    }

    if skipped > 0 {
        debug!(target: TARGET_WEB_REQUEST, "Skipped {} entries without a link", skipped);
    }

    let channel_title = channel_title.trim();
    let channel_build_date = channel_build_date.trim();
    feed.title = (!channel_title.is_empty()).then(|| channel_title.to_string());
    feed.last_build_date = (!channel_build_date.is_empty()).then(|| channel_build_date.to_string());
    Ok(feed)
}

fn append_text(
    scope: &mut Scope,
    element: &str,
    text: &str,
    channel_title: &mut String,
    channel_build_date: &mut String,
) {
    match scope {
        Scope::Item(item) => {
            if let Some(field) = item.field_mut(element) {
                field.push_str(text);
            }
        }
        Scope::Channel => match element {
            "title" => channel_title.push_str(text),
            "lastBuildDate" => channel_build_date.push_str(text),
            _ => {}
        },
    }
}

fn parse_atom(body: &str) -> Result<ParsedFeed, FeedParseError> {
    let feed = parser::parse(body.as_bytes()).map_err(|e| FeedParseError::Atom(e.to_string()))?;

    let mut entries = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let Some(link) = entry.links.first().map(|link| link.href.clone()) else {
            warn!(target: TARGET_WEB_REQUEST, "Feed entry missing link, skipping");
            continue;
        };
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();
        let authors: Vec<String> = entry.authors.into_iter().map(|p| p.name).collect();
        let id = if entry.id.trim().is_empty() {
            link.clone()
        } else {
            entry.id
        };

        entries.push(Entry {
            id,
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link,
            summary,
            published: entry
                .published
                .or(entry.updated)
                .map(|d| d.to_rfc2822())
                .unwrap_or_default(),
            authors: (!authors.is_empty()).then(|| authors.join(", ")),
        });
    }

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content),
        last_build_date: feed.updated.map(|d| d.to_rfc2822()),
        entries,
    })
}

/// Drop repeated ids, keeping the first occurrence.
fn dedup_entries(mut feed: ParsedFeed) -> ParsedFeed {
    let mut seen = HashSet::new();
    let before = feed.entries.len();
    feed.entries.retain(|entry| seen.insert(entry.id.clone()));
    if feed.entries.len() < before {
        debug!(target: TARGET_WEB_REQUEST, "Dropped {} duplicate entries", before - feed.entries.len());
    }
    feed
}
