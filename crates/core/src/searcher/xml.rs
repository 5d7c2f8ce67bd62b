//! Small typed readers over the XML documents providers return.
//!
//! Item lists (newznab/torznab results, RSS and Atom feeds) are flattened
//! into [`RawItem`]s: the direct children of each `<item>`/`<entry>`, with
//! every field optional. Capability documents get their own reader.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::SearchError;

/// One direct child of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemField {
    /// Element with text content; `name` is the lowercased local name.
    Element { name: String, text: String },
    /// `<newznab:attr name=".." value=".."/>` style attribute pair.
    Attr { name: String, value: String },
    /// `<enclosure url=..>` or Atom `<link href=..>`.
    Link {
        href: String,
        media_type: Option<String>,
        length: Option<String>,
    },
}

/// Fields of one `<item>` or `<entry>`, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub fields: Vec<ItemField>,
}

impl RawItem {
    /// Text of the first non-empty element with this (lowercase) local name.
    pub fn element(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            ItemField::Element { name: n, text } if n == name && !text.is_empty() => {
                Some(text.as_str())
            }
            _ => None,
        })
    }

    /// Value of the first attribute pair with this name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            ItemField::Attr { name: n, value } if n.eq_ignore_ascii_case(name) && !value.is_empty() => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, Option<&str>, Option<&str>)> {
        self.fields.iter().filter_map(|f| match f {
            ItemField::Link {
                href,
                media_type,
                length,
            } => Some((href.as_str(), media_type.as_deref(), length.as_deref())),
            _ => None,
        })
    }
}

/// A parsed item-list document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDocument {
    /// Lowercased local name of the root element.
    pub root: String,
    /// `description` of an `<error>` root.
    pub error: Option<String>,
    pub items: Vec<RawItem>,
}

impl ItemDocument {
    /// Turn an `<error>` root into a provider error.
    pub fn into_items(self) -> Result<Vec<RawItem>, SearchError> {
        match self.error {
            Some(description) => Err(SearchError::Provider(description)),
            None => Ok(self.items),
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

/// Attribute value by local name, unescaped.
fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .map(|a| match a.unescape_value() {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(&a.value).to_string(),
        })
}

/// A link-like child (`enclosure`, `link href=`) as an [`ItemField::Link`].
fn link_field(name: &str, e: &BytesStart<'_>) -> Option<ItemField> {
    let href = match name {
        "enclosure" => attribute(e, "url"),
        "link" => attribute(e, "href"),
        _ => None,
    }?;
    Some(ItemField::Link {
        href,
        media_type: attribute(e, "type"),
        length: attribute(e, "length"),
    })
}

fn attr_field(e: &BytesStart<'_>) -> Option<ItemField> {
    Some(ItemField::Attr {
        name: attribute(e, "name")?,
        value: attribute(e, "value").unwrap_or_default(),
    })
}

fn malformed(e: impl std::fmt::Display) -> SearchError {
    SearchError::Malformed(e.to_string())
}

/// Parse an item list. Unknown elements are kept as fields and ignored by
/// callers; only unreadable XML or a document without a root is an error.
pub fn parse_items(body: &str) -> Result<ItemDocument, SearchError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut doc = ItemDocument::default();
    let mut depth = 0usize;
    // depth of the open <item>, if any
    let mut item_depth: Option<usize> = None;
    let mut current: Option<RawItem> = None;
    // open direct child of the item: (name, text)
    let mut child: Option<(String, String)> = None;
    let mut buffer = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buffer).map_err(malformed)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = local_name(e);

                if depth == 0 && doc.root.is_empty() {
                    doc.root = name.clone();
                    if name == "error" {
                        doc.error = Some(
                            attribute(e, "description")
                                .unwrap_or_else(|| "unknown error".to_string()),
                        );
                    }
                }

                match item_depth {
                    None if name == "item" || name == "entry" => {
                        if !is_empty {
                            item_depth = Some(depth);
                            current = Some(RawItem::default());
                        }
                    }
                    Some(d) if depth == d + 1 => {
                        if let Some(item) = current.as_mut() {
                            if name == "attr" {
                                item.fields.extend(attr_field(e));
                            } else if let Some(link) = link_field(&name, e) {
                                item.fields.push(link);
                            }
                        }
                        if !is_empty {
                            child = Some((name, String::new()));
                        }
                    }
                    _ => {}
                }

                if !is_empty {
                    depth += 1;
                }
            }
            Event::Text(ref e) => {
                if let Some((_, text)) = child.as_mut() {
                    let unescaped = e.unescape().map_err(malformed)?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = child.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match item_depth {
                    Some(d) if depth == d + 1 => {
                        if let (Some(item), Some((name, text))) = (current.as_mut(), child.take()) {
                            item.fields.push(ItemField::Element {
                                name,
                                text: text.trim().to_string(),
                            });
                        }
                    }
                    Some(d) if depth == d => {
                        item_depth = None;
                        doc.items.extend(current.take());
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buffer.clear();
    }

    if doc.root.is_empty() {
        return Err(SearchError::Malformed("empty document".to_string()));
    }
    Ok(doc)
}

/// `available="yes|no"` as a bool; absent or other values are unknown.
fn availability(e: &BytesStart<'_>) -> Option<bool> {
    match attribute(e, "available")?.to_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapsSubcategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapsCategory {
    pub id: String,
    pub name: String,
    pub subcats: Vec<CapsSubcategory>,
}

/// What a `t=caps` document advertises.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapsDocument {
    pub search_available: Option<bool>,
    pub book_search_available: Option<bool>,
    pub audio_search_available: Option<bool>,
    pub categories: Vec<CapsCategory>,
}

/// Parse a capability document.
pub fn parse_caps(body: &str) -> Result<CapsDocument, SearchError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut doc = CapsDocument::default();
    let mut root: Option<String> = None;
    let mut in_searching = false;
    let mut category: Option<CapsCategory> = None;
    let mut buffer = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buffer).map_err(malformed)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = local_name(e);

                if root.is_none() {
                    match name.as_str() {
                        "caps" => {}
                        "error" => {
                            return Err(SearchError::Provider(
                                attribute(e, "description")
                                    .unwrap_or_else(|| "unknown error".to_string()),
                            ))
                        }
                        other => {
                            return Err(SearchError::Malformed(format!(
                                "unexpected root element <{}>",
                                other
                            )))
                        }
                    }
                    root = Some(name);
                } else {
                    match name.as_str() {
                        "searching" => in_searching = !is_empty,
                        "search" if in_searching => doc.search_available = availability(e),
                        "book-search" if in_searching => doc.book_search_available = availability(e),
                        "audio-search" if in_searching => {
                            doc.audio_search_available = availability(e)
                        }
                        "category" => {
                            let cat = CapsCategory {
                                id: attribute(e, "id").unwrap_or_default(),
                                name: attribute(e, "name").unwrap_or_default(),
                                subcats: Vec::new(),
                            };
                            if is_empty {
                                doc.categories.push(cat);
                            } else {
                                category = Some(cat);
                            }
                        }
                        "subcat" => {
                            if let Some(cat) = category.as_mut() {
                                cat.subcats.push(CapsSubcategory {
                                    id: attribute(e, "id").unwrap_or_default(),
                                    name: attribute(e, "name").unwrap_or_default(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"searching" => in_searching = false,
                b"category" => doc.categories.extend(category.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buffer.clear();
    }

    if root.is_none() {
        return Err(SearchError::Malformed("empty document".to_string()));
    }
    Ok(doc)
}
