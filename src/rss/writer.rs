//! RSS 2.0 serialization and atomic output writes.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::{debug, info, warn};

use super::types::{ChannelInfo, Entry, ACCEPTED_FEED_FILE, REJECTED_FEED_FILE};
use crate::error::WriteError;
use crate::TARGET_FEED_WRITE;

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Render a complete RSS 2.0 document in memory.
pub fn render_feed(channel: &ChannelInfo, entries: &[Entry]) -> Result<Vec<u8>, WriteError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:dc", DC_NAMESPACE));
    emit(&mut writer, Event::Start(rss))?;
    emit(&mut writer, Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &channel.title)?;
    text_element(&mut writer, "link", &channel.link)?;
    text_element(&mut writer, "description", &channel.description)?;
    if let Some(last_build_date) = &channel.last_build_date {
        text_element(&mut writer, "lastBuildDate", last_build_date)?;
    }

    for entry in entries {
        write_item(&mut writer, entry)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("channel")))?;
    emit(&mut writer, Event::End(BytesEnd::new("rss")))?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, entry: &Entry) -> Result<(), WriteError> {
    emit(writer, Event::Start(BytesStart::new("item")))?;
    text_element(writer, "title", &entry.title)?;
    text_element(writer, "link", &entry.link)?;

    let mut guid = BytesStart::new("guid");
    if entry.id != entry.link {
        guid.push_attribute(("isPermaLink", "false"));
    }
    emit(writer, Event::Start(guid))?;
    emit(writer, Event::Text(BytesText::new(&entry.id)))?;
    emit(writer, Event::End(BytesEnd::new("guid")))?;

    text_element(writer, "description", &entry.summary)?;
    text_element(writer, "pubDate", &entry.published)?;
    if let Some(authors) = &entry.authors {
        text_element(writer, "dc:creator", authors)?;
    }
    emit(writer, Event::End(BytesEnd::new("item")))
}

fn text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<(), WriteError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    // Always emit the text event, even when empty, so the indenter keeps the
    // closing tag on the same line.
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), WriteError> {
    writer
        .write_event(event)
        .map_err(|e| WriteError::Serialize(e.to_string()))
}

fn sibling_path(path: &Path, tag: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "feed.xml".to_string());
    path.with_file_name(format!(".{}.{}.{}", file_name, tag, std::process::id()))
}

/// Write `bytes` next to `path` under a temporary name and return that name.
async fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf, WriteError> {
    let tmp_path = sibling_path(path, "tmp");
    if let Err(source) = tokio::fs::write(&tmp_path, bytes).await {
        discard(&tmp_path).await;
        return Err(WriteError::Io {
            path: tmp_path,
            source,
        });
    }
    Ok(tmp_path)
}

async fn discard(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

/// Write `bytes` to `path` through a temp file and rename, so a failure never
/// leaves a truncated document behind.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let tmp_path = stage(path, bytes).await?;

    if let Err(source) = tokio::fs::rename(&tmp_path, path).await {
        discard(&tmp_path).await;
        return Err(WriteError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!(target: TARGET_FEED_WRITE, "Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Move two staged files into place together.
///
/// The previous `first` is parked under a backup name until `second` is in
/// place, and put back if anything fails, so the pair is replaced as a unit.
async fn commit_pair(
    first_tmp: &Path,
    first: &Path,
    second_tmp: &Path,
    second: &Path,
) -> Result<(), WriteError> {
    let backup = sibling_path(first, "bak");
    let had_previous = match tokio::fs::rename(first, &backup).await {
        Ok(()) => true,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
        Err(source) => {
            discard(first_tmp).await;
            discard(second_tmp).await;
            return Err(WriteError::Io {
                path: first.to_path_buf(),
                source,
            });
        }
    };

    if let Err(source) = tokio::fs::rename(first_tmp, first).await {
        restore(had_previous, &backup, first).await;
        discard(first_tmp).await;
        discard(second_tmp).await;
        return Err(WriteError::Io {
            path: first.to_path_buf(),
            source,
        });
    }

    if let Err(source) = tokio::fs::rename(second_tmp, second).await {
        restore(had_previous, &backup, first).await;
        discard(second_tmp).await;
        return Err(WriteError::Io {
            path: second.to_path_buf(),
            source,
        });
    }

    if had_previous {
        discard(&backup).await;
    }
    Ok(())
}

async fn restore(had_previous: bool, backup: &Path, path: &Path) {
    if !had_previous {
        discard(path).await;
    } else if let Err(err) = tokio::fs::rename(backup, path).await {
        warn!(target: TARGET_FEED_WRITE, "Failed to restore {} from {}: {}", path.display(), backup.display(), err);
    }
}

/// Paths of the two files produced by a run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub accepted: PathBuf,
    pub rejected: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(out_dir: &Path) -> Self {
        Self {
            accepted: out_dir.join(ACCEPTED_FEED_FILE),
            rejected: out_dir.join(REJECTED_FEED_FILE),
        }
    }
}

/// Render both feeds, stage both, then swap both into place. On failure the
/// previous pair is left as it was.
pub async fn write_feeds(
    out_dir: &Path,
    accepted_channel: &ChannelInfo,
    accepted: &[Entry],
    rejected_channel: &ChannelInfo,
    rejected: &[Entry],
) -> Result<OutputPaths, WriteError> {
    let accepted_xml = render_feed(accepted_channel, accepted)?;
    let rejected_xml = render_feed(rejected_channel, rejected)?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| WriteError::CreateDir {
            path: out_dir.to_path_buf(),
            source,
        })?;

    let paths = OutputPaths::in_dir(out_dir);
    let accepted_tmp = stage(&paths.accepted, &accepted_xml).await?;
    let rejected_tmp = match stage(&paths.rejected, &rejected_xml).await {
        Ok(tmp) => tmp,
        Err(err) => {
            discard(&accepted_tmp).await;
            return Err(err);
        }
    };
    commit_pair(&accepted_tmp, &paths.accepted, &rejected_tmp, &paths.rejected).await?;

    info!(target: TARGET_FEED_WRITE, "Output files created: {} ({} items), {} ({} items)",
        paths.accepted.display(), accepted.len(), paths.rejected.display(), rejected.len());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::parse_feed;

    fn channel() -> ChannelInfo {
        ChannelInfo {
            title: "Filtered PubMed – Head and Neck Cancer".to_string(),
            link: "https://pubmed.ncbi.nlm.nih.gov/rss/search/abc/".to_string(),
            description: "Papers classified as related to head and neck cancer".to_string(),
            last_build_date: Some("Mon, 13 Oct 2025 10:00:00 -0400".to_string()),
        }
    }

    fn entry(n: u32, title: &str, summary: &str) -> Entry {
        Entry {
            id: format!("pubmed:{}", n),
            title: title.to_string(),
            link: format!("https://pubmed.ncbi.nlm.nih.gov/{}/?utm_source=rss&fc=1", n),
            summary: summary.to_string(),
            published: "Mon, 13 Oct 2025 06:00:00 -0400".to_string(),
            authors: Some("Smith J".to_string()),
        }
    }

    #[test]
    fn test_render_feed_structure() {
        let xml = render_feed(&channel(), &[entry(1, "Laryngeal carcinoma outcomes", "")]).unwrap();
        let xml = String::from_utf8(xml).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">"));
        assert!(xml.contains("<lastBuildDate>Mon, 13 Oct 2025 10:00:00 -0400</lastBuildDate>"));
        assert!(xml.contains("<title>Laryngeal carcinoma outcomes</title>"));
        assert!(xml.contains("<guid isPermaLink=\"false\">pubmed:1</guid>"));
        assert!(xml.contains("&amp;fc=1</link>"));
        assert!(xml.contains("<description></description>"));
        assert!(xml.contains("<dc:creator>Smith J</dc:creator>"));
    }

    #[test]
    fn test_render_feed_round_trips_through_parser() {
        let entries = vec![
            entry(1, "Laryngeal carcinoma & outcomes", "<b>Journal:</b> Oral Oncol<br/>Head and neck."),
            entry(2, "Oral cavity SCC staging", "Mentions oral cavity cancer <i>staging</i>."),
        ];
        let xml = render_feed(&channel(), &entries).unwrap();
        let parsed = parse_feed(&String::from_utf8(xml).unwrap()).unwrap();

        assert_eq!(parsed.entries, entries);
        assert_eq!(parsed.title.as_deref(), Some(channel().title.as_str()));
        assert_eq!(parsed.last_build_date, channel().last_build_date);
    }

    #[test]
    fn test_render_is_deterministic() {
        let entries = vec![entry(1, "A", "a"), entry(2, "B", "b")];
        assert_eq!(
            render_feed(&channel(), &entries).unwrap(),
            render_feed(&channel(), &entries).unwrap()
        );
    }

    #[tokio::test]
    async fn test_write_feeds_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("output");

        let first = vec![entry(1, "First", "")];
        write_feeds(&out_dir, &channel(), &first, &channel(), &[]).await.unwrap();

        let second = vec![entry(2, "Second", "")];
        let paths = write_feeds(&out_dir, &channel(), &second, &channel(), &first)
            .await
            .unwrap();

        let accepted = std::fs::read_to_string(&paths.accepted).unwrap();
        assert!(accepted.contains("Second"));
        assert!(!accepted.contains("First"));
        let rejected = std::fs::read_to_string(&paths.rejected).unwrap();
        assert!(rejected.contains("First"));

        assert!(leftovers(&out_dir).is_empty());
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.contains(".tmp.") || name.contains(".bak."))
            .collect()
    }

    #[tokio::test]
    async fn test_write_feeds_keeps_previous_pair_when_rejected_cannot_be_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("output");

        let old = vec![entry(1, "Old accepted", "")];
        let paths = write_feeds(&out_dir, &channel(), &old, &channel(), &[]).await.unwrap();

        std::fs::remove_file(&paths.rejected).unwrap();
        std::fs::create_dir(&paths.rejected).unwrap();
        std::fs::write(paths.rejected.join("keep"), "x").unwrap();

        let new = vec![entry(2, "New accepted", "")];
        let result = write_feeds(&out_dir, &channel(), &new, &channel(), &[]).await;
        assert!(matches!(result, Err(WriteError::Io { .. })));

        let accepted = std::fs::read_to_string(&paths.accepted).unwrap();
        assert!(accepted.contains("Old accepted"));
        assert!(!accepted.contains("New accepted"));
        assert!(paths.rejected.join("keep").exists());
        assert!(leftovers(&out_dir).is_empty());
    }

    #[tokio::test]
    async fn test_write_feeds_leaves_no_accepted_file_when_first_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::in_dir(dir.path());
        std::fs::create_dir(&paths.rejected).unwrap();
        std::fs::write(paths.rejected.join("keep"), "x").unwrap();

        let result = write_feeds(dir.path(), &channel(), &[entry(1, "A", "")], &channel(), &[]).await;
        assert!(result.is_err());
        assert!(!paths.accepted.exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_write_feeds_fails_when_output_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("output");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = write_feeds(&blocker, &channel(), &[], &channel(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::CreateDir { .. }));
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
    }
}
