//! RSS feed parsing shared by the Torznab and Newznab clients.
//!
//! Both protocols deliver results as RSS 2.0 documents whose `<item>`
//! elements carry protocol extensions as namespaced `attr` elements
//! (`<torznab:attr name="seeders" value="4"/>`). Parsing collects those into
//! a string map per item; typed coercion happens afterwards so that one
//! malformed number costs a field, never the whole response.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use super::IndexerError;

/// One `<item>` from a feed, before canonicalization.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: String,
    /// Degrades to empty string when the feed omits it.
    pub link: String,
    /// Degrades to empty string when the feed omits it.
    pub guid: String,
    pub publish_date: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_length: Option<u64>,
    /// Namespaced attribute extensions, name -> raw value.
    pub attrs: HashMap<String, String>,
}

impl FeedItem {
    /// Coerce an attribute to an integer count; absent or malformed -> None.
    pub fn attr_u32(&self, name: &str) -> Option<u32> {
        self.attrs.get(name).and_then(|v| v.parse().ok())
    }

    /// Coerce an attribute to a size in bytes; absent or malformed -> None.
    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attrs.get(name).and_then(|v| v.parse().ok())
    }
}

/// Parse an RSS document into its items.
///
/// A document with no `<rss>`/`<channel>` envelope is a hard failure: the
/// indexer answered with something that is not a result feed at all.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, IndexerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut current_tag = String::new();
    let mut saw_channel = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "channel" {
                    saw_channel = true;
                } else if tag == "item" {
                    current = Some(FeedItem::default());
                } else if current.is_some() && is_extension_attr(&tag) {
                    read_extension_attr(e, current.as_mut().unwrap());
                } else if current.is_some() && tag == "enclosure" {
                    read_enclosure(e, current.as_mut().unwrap());
                }
                current_tag = tag;
            }
            Ok(Event::Empty(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if let Some(ref mut item) = current {
                    if is_extension_attr(&tag) {
                        read_extension_attr(e, item);
                    } else if tag == "enclosure" {
                        read_enclosure(e, item);
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(ref mut item) = current {
                    let text = e.unescape().unwrap_or_default().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    match current_tag.as_str() {
                        "title" => item.title = text,
                        "link" => {
                            if item.link.is_empty() {
                                item.link = text;
                            }
                        }
                        "guid" => {
                            if item.guid.is_empty() {
                                item.guid = text;
                            }
                        }
                        "pubDate" => item.publish_date = parse_feed_date(&text),
                        "category" => item.categories.push(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IndexerError::MalformedFeed(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
    }

    if !saw_channel {
        return Err(IndexerError::MalformedFeed(
            "response has no rss/channel envelope".to_string(),
        ));
    }

    Ok(items)
}

fn is_extension_attr(tag: &str) -> bool {
    tag == "torznab:attr" || tag == "newznab:attr"
}

fn read_extension_attr(e: &quick_xml::events::BytesStart, item: &mut FeedItem) {
    let mut name = String::new();
    let mut value = String::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let val = String::from_utf8_lossy(&attr.value).to_string();
        if key == "name" {
            name = val;
        } else if key == "value" {
            value = val;
        }
    }
    if !name.is_empty() {
        item.attrs.insert(name, value);
    }
}

fn read_enclosure(e: &quick_xml::events::BytesStart, item: &mut FeedItem) {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let val = String::from_utf8_lossy(&attr.value).to_string();
        match key.as_str() {
            "url" => {
                if item.link.is_empty() {
                    item.link = val.clone();
                }
                item.enclosure_url = Some(val);
            }
            "length" => item.enclosure_length = val.parse().ok(),
            _ => {}
        }
    }
}

/// Parse a `t=caps` capabilities document into its category list, flattening
/// subcategories. The caps shape is shared by Torznab and Newznab.
pub fn parse_caps_categories(xml: &str) -> Result<Vec<super::Category>, IndexerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut categories = Vec::new();
    let mut saw_caps = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag.as_str() {
                    "caps" | "categories" => saw_caps = true,
                    "category" | "subcat" => {
                        let mut id = String::new();
                        let mut name = String::new();
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                            let val = String::from_utf8_lossy(&attr.value).to_string();
                            if key == "id" {
                                id = val;
                            } else if key == "name" {
                                name = val;
                            }
                        }
                        if !id.is_empty() {
                            categories.push(super::Category { id, name });
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IndexerError::MalformedFeed(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
    }

    if !saw_caps {
        return Err(IndexerError::MalformedFeed(
            "capabilities response has no caps envelope".to_string(),
        ));
    }

    Ok(categories)
}

/// Parse the date formats indexer feeds actually emit.
pub fn parse_feed_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some indexers omit the timezone entirely.
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc());
    }
    warn!(date = s, "Failed to parse feed date");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torznab="http://torznab.com/schemas/2015/feed">
  <channel>
    <title>indexer</title>
    <item>
      <title>Hollow Depths v1.0.3 Repack</title>
      <guid>http://tracker.local/details/42</guid>
      <link>http://tracker.local/download/42.torrent</link>
      <pubDate>Sat, 18 Jan 2025 14:30:00 +0000</pubDate>
      <category>4050</category>
      <enclosure url="http://tracker.local/download/42.torrent" length="734003200" type="application/x-bittorrent"/>
      <torznab:attr name="seeders" value="12"/>
      <torznab:attr name="peers" value="20"/>
      <torznab:attr name="size" value="734003200"/>
      <torznab:attr name="downloadvolumefactor" value="0"/>
    </item>
    <item>
      <title>Sparse Item</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 2);

        let full = &items[0];
        assert_eq!(full.title, "Hollow Depths v1.0.3 Repack");
        assert_eq!(full.guid, "http://tracker.local/details/42");
        assert_eq!(full.link, "http://tracker.local/download/42.torrent");
        assert_eq!(full.categories, vec!["4050".to_string()]);
        assert_eq!(full.enclosure_length, Some(734003200));
        assert_eq!(full.attr_u32("seeders"), Some(12));
        assert_eq!(full.attr_u64("size"), Some(734003200));
        assert!(full.publish_date.is_some());
    }

    #[test]
    fn test_missing_link_and_guid_degrade_to_empty() {
        let items = parse_feed(FEED).unwrap();
        let sparse = &items[1];
        assert_eq!(sparse.title, "Sparse Item");
        assert_eq!(sparse.link, "");
        assert_eq!(sparse.guid, "");
        assert!(sparse.attrs.is_empty());
    }

    #[test]
    fn test_malformed_numeric_attr_degrades_to_absent() {
        let xml = r#"<rss><channel><item>
            <title>t</title>
            <torznab:attr name="seeders" value="many"/>
        </item></channel></rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0].attrs.get("seeders").map(String::as_str), Some("many"));
        assert_eq!(items[0].attr_u32("seeders"), None);
    }

    #[test]
    fn test_missing_envelope_is_hard_failure() {
        let err = parse_feed("<html><body>login page</body></html>").unwrap_err();
        assert!(matches!(err, IndexerError::MalformedFeed(_)));

        let err = parse_feed("{\"error\": \"nope\"}").unwrap_err();
        assert!(matches!(err, IndexerError::MalformedFeed(_)));
    }

    #[test]
    fn test_empty_channel_is_empty_success() {
        let items = parse_feed("<rss><channel><title>x</title></channel></rss>").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_caps_categories() {
        let xml = r#"<caps>
            <server title="local"/>
            <categories>
                <category id="1000" name="Console">
                    <subcat id="1010" name="Console/NDS"/>
                </category>
                <category id="4050" name="PC/Games"/>
            </categories>
        </caps>"#;
        let cats = parse_caps_categories(xml).unwrap();
        assert_eq!(cats.len(), 3);
        assert_eq!(cats[0].id, "1000");
        assert_eq!(cats[1].id, "1010");
        assert_eq!(cats[2].name, "PC/Games");
    }

    #[test]
    fn test_parse_caps_rejects_non_caps_document() {
        let err = parse_caps_categories("<error code=\"100\"/>").unwrap_err();
        assert!(matches!(err, IndexerError::MalformedFeed(_)));
    }

    #[test]
    fn test_parse_feed_date_formats() {
        assert!(parse_feed_date("Sat, 18 Jan 2025 14:30:00 +0000").is_some());
        assert!(parse_feed_date("2025-01-18T14:30:00Z").is_some());
        assert!(parse_feed_date("2025-01-18T14:30:00+02:00").is_some());
        assert!(parse_feed_date("2025-01-18T14:30:00").is_some());
        assert!(parse_feed_date("yesterday").is_none());
    }
}
