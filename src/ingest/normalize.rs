// src/ingest/normalize.rs
//! Map accepted payloads (digest JSON or raw RSS markup) to `Article`s.

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use crate::error::FeedError;
use crate::ingest::types::{Article, DigestDocument, RawPayload};

static RE_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=['"]([^'"]+)['"]"#).expect("img regex"));

/// Item child elements we read, matched by local name.
const FIELD_COUNT: usize = 6;
const FIELDS: [&str; FIELD_COUNT] = ["title", "link", "guid", "pubDate", "description", "tags"];

pub fn normalize_payload(payload: &RawPayload, label: &str) -> Vec<Article> {
    match payload {
        RawPayload::Digest(doc) => parse_digest(doc, label),
        RawPayload::Markup(xml) => parse_markup(xml, label),
    }
}

/// Text content of an HTML fragment, as a browser would render it into a
/// detached element: tags dropped, entities decoded.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// First `<img src>` in raw (unstripped) HTML.
pub fn extract_image(raw_html: &str) -> Option<String> {
    RE_IMG
        .captures(raw_html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/* ----------------------------
Digest (rss2json) items
---------------------------- */

/// One digest item, read field by field: a field that is missing, null or of
/// an unexpected type is treated as absent without affecting its siblings.
type DigestItem = serde_json::Map<String, Value>;

pub fn parse_digest(doc: &DigestDocument, label: &str) -> Vec<Article> {
    doc.items
        .iter()
        .enumerate()
        .map(|(index, raw)| match decode_digest_item(index, raw) {
            Ok(item) => digest_article(item, label),
            Err(e) => {
                tracing::debug!(error = %e, feed = label, "degrading malformed digest item");
                Article::empty(label)
            }
        })
        .collect()
}

/// Only a non-object item is malformed as a whole.
fn decode_digest_item(index: usize, raw: &Value) -> Result<&DigestItem, FeedError> {
    raw.as_object().ok_or_else(|| FeedError::MalformedItem {
        index,
        reason: format!("expected an object, got `{raw}`"),
    })
}

fn str_field<'a>(item: &'a DigestItem, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

fn digest_article(item: &DigestItem, label: &str) -> Article {
    let tags = item
        .get("categories")
        .and_then(Value::as_array)
        .map(|cats| {
            cats.iter()
                .filter_map(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let enclosure_thumb = item
        .get("enclosure")
        .and_then(Value::as_object)
        .and_then(|e| str_field(e, "thumbnail"));
    let image = non_empty(str_field(item, "thumbnail")).or_else(|| non_empty(enclosure_thumb));

    Article {
        title: html_escape::decode_html_entities(str_field(item, "title").unwrap_or_default())
            .into_owned(),
        link: str_field(item, "link").unwrap_or_default().to_string(),
        pub_date: str_field(item, "pubDate").unwrap_or_default().to_string(),
        desc: strip_html(str_field(item, "description").unwrap_or_default()),
        tags,
        image,
        source: label.to_string(),
        score: None,
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|v| !v.is_empty()).map(str::to_string)
}

/* ----------------------------
Raw RSS markup
---------------------------- */

/// First-occurrence text of each wanted field inside one `<item>`.
#[derive(Debug, Default)]
struct ItemCapture {
    depth: usize,
    fields: [Option<String>; FIELD_COUNT],
    // (field index, element depth, buffer)
    active: Vec<(usize, usize, String)>,
}

impl ItemCapture {
    fn get(&self, name: &str) -> &str {
        FIELDS
            .iter()
            .position(|f| *f == name)
            .and_then(|i| self.fields[i].as_deref())
            .map(str::trim)
            .unwrap_or_default()
    }

    fn push_text(&mut self, text: &str) {
        for (_, _, buf) in self.active.iter_mut() {
            buf.push_str(text);
        }
    }

    fn into_article(self, label: &str) -> Article {
        let raw_desc = self.get("description");
        let link = match self.get("link") {
            "" => self.get("guid"),
            l => l,
        };
        Article {
            title: self.get("title").to_string(),
            link: link.to_string(),
            pub_date: self.get("pubDate").to_string(),
            // Image first: stripping removes the tag.
            image: extract_image(raw_desc),
            desc: strip_html(raw_desc),
            tags: self
                .get("tags")
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            source: label.to_string(),
            score: None,
        }
    }
}

fn field_index(local_name: &[u8]) -> Option<usize> {
    FIELDS.iter().position(|f| f.as_bytes() == local_name)
}

/// Select every `item` element at any depth and read its fields.
/// A document that breaks part-way keeps the items completed before the error.
pub fn parse_markup(xml: &str, label: &str) -> Vec<Article> {
    let t0 = std::time::Instant::now();
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<ItemCapture> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let local = e.local_name();
                if let Some(item) = current.as_mut() {
                    if let Some(i) = field_index(local.as_ref()) {
                        let capturing = item.active.iter().any(|(f, _, _)| *f == i);
                        if item.fields[i].is_none() && !capturing {
                            item.active.push((i, depth, String::new()));
                        }
                    }
                } else if local.as_ref() == b"item" {
                    current = Some(ItemCapture {
                        depth,
                        ..Default::default()
                    });
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(item) = current.as_mut() {
                    if let Some(i) = field_index(e.local_name().as_ref()) {
                        let capturing = item.active.iter().any(|(f, _, _)| *f == i);
                        if item.fields[i].is_none() && !capturing {
                            item.fields[i] = Some(String::new());
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(item) = current.as_mut() {
                    let decoded = t.unescape().map(|c| c.into_owned()).ok();
                    let text = decoded.unwrap_or_else(|| {
                        // Entities XML does not know (e.g. &nbsp;) are HTML entities.
                        let raw = String::from_utf8_lossy(&t.into_inner()).into_owned();
                        html_escape::decode_html_entities(&raw).into_owned()
                    });
                    item.push_text(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(item) = current.as_mut() {
                    item.push_text(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(item) = current.as_mut() {
                    while let Some(pos) = item.active.iter().position(|(_, d, _)| *d == depth) {
                        let (i, _, buf) = item.active.remove(pos);
                        if item.fields[i].is_none() {
                            item.fields[i] = Some(buf);
                        }
                    }
                    if item.depth == depth {
                        if let Some(done) = current.take() {
                            out.push(done.into_article(label));
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    feed = label,
                    position = reader.buffer_position(),
                    kept = out.len(),
                    "markup parse stopped early"
                );
                break;
            }
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    metrics::histogram!("ingest_parse_ms").record(ms);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_decodes_entities_and_drops_tags() {
        assert_eq!(strip_html("<p>Hello&nbsp;<b>world</b> &amp; more</p>"), "Hello\u{a0}world & more");
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn image_is_taken_from_first_img_tag() {
        let raw = r#"<p>x</p><IMG class="a" src="http://x/1.jpg"><img src='http://x/2.jpg'>"#;
        assert_eq!(extract_image(raw).as_deref(), Some("http://x/1.jpg"));
        assert_eq!(extract_image("<p>none</p>"), None);
    }

    #[test]
    fn link_falls_back_to_guid() {
        let xml = r#"<rss><channel><item>
            <title>T</title><link></link><guid>urn:guid:1</guid>
        </item></channel></rss>"#;
        let items = parse_markup(xml, "Feed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "urn:guid:1");
    }

    #[test]
    fn empty_link_element_falls_back_to_guid() {
        let xml = r#"<rss><channel><item><title>T</title><link/><guid>g-2</guid></item></channel></rss>"#;
        let items = parse_markup(xml, "Feed");
        assert_eq!(items[0].link, "g-2");
    }

    #[test]
    fn first_descendant_wins() {
        let xml = r#"<rss><channel><item>
            <title>First</title>
            <media:group xmlns:media="http://search.yahoo.com/mrss/"><media:title>Second</media:title></media:group>
        </item></channel></rss>"#;
        let items = parse_markup(xml, "Feed");
        assert_eq!(items[0].title, "First");
    }

    #[test]
    fn missing_fields_yield_empty_article() {
        let items = parse_markup("<rss><channel><item></item></channel></rss>", "Feed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], Article::empty("Feed"));
    }

    #[test]
    fn rdf_items_outside_channel_are_found() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
            <channel><title>Chan</title></channel>
            <item><title>A</title><link>https://a.test/1</link></item>
            <item><title>B</title><link>https://a.test/2</link></item>
        </rdf:RDF>"#;
        let items = parse_markup(xml, "Feed");
        let titles: Vec<_> = items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn truncated_document_keeps_completed_items() {
        let xml = "<rss><channel><item><title>Done</title></item><item><title>Half</ti";
        let items = parse_markup(xml, "Feed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Done");
    }

    #[test]
    fn digest_image_prefers_thumbnail_then_enclosure() {
        let doc: DigestDocument = serde_json::from_str(
            r#"{"status":"ok","items":[
                {"title":"a","thumbnail":"http://t/1.jpg","enclosure":{"thumbnail":"http://e/1.jpg"}},
                {"title":"b","thumbnail":"","enclosure":{"thumbnail":"http://e/2.jpg"}},
                {"title":"c","enclosure":{}}
            ]}"#,
        )
        .unwrap();
        let items = parse_digest(&doc, "Feed");
        assert_eq!(items[0].image.as_deref(), Some("http://t/1.jpg"));
        assert_eq!(items[1].image.as_deref(), Some("http://e/2.jpg"));
        assert_eq!(items[2].image, None);
    }

    #[test]
    fn non_object_digest_item_degrades_to_empty_article() {
        let doc: DigestDocument = serde_json::from_str(
            r#"{"status":"ok","items":["just text",{"title":"ok","link":"https://a.test"}]}"#,
        )
        .unwrap();
        let items = parse_digest(&doc, "Feed");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Article::empty("Feed"));
        assert_eq!(items[1].link, "https://a.test");
    }

    #[test]
    fn odd_digest_fields_only_blank_themselves() {
        let doc: DigestDocument = serde_json::from_str(
            r#"{"status":"ok","items":[
                {"title":"Iran talks","link":"https://a.test/1","categories":null,"thumbnail":7},
                {"title":42,"link":"https://a.test/2","categories":["a",5,""],"enclosure":[]},
                {"title":"Iran vote","link":"https://a.test/3","thumbnail":null,"enclosure":{"thumbnail":"http://e/3.jpg"}}
            ]}"#,
        )
        .unwrap();
        let items = parse_digest(&doc, "Feed");
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title, "Iran talks");
        assert_eq!(items[0].link, "https://a.test/1");
        assert!(items[0].tags.is_empty());
        assert_eq!(items[0].image, None);

        assert_eq!(items[1].title, "");
        assert_eq!(items[1].link, "https://a.test/2");
        assert_eq!(items[1].tags, vec!["a".to_string()]);

        assert_eq!(items[2].image.as_deref(), Some("http://e/3.jpg"));
    }
}
