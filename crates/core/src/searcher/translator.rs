//! Search-type translation: logical request to indexer query parameters.

use tracing::debug;

use super::{SearchRequest, SearchType};
use crate::provider::{CapabilityVerb, Provider};

/// Parameters for one indexer `api` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerQuery {
    /// Verb sent as `t=`.
    pub verb: String,
    /// Remaining parameters, in the order they are sent.
    pub params: Vec<(String, String)>,
}

impl IndexerQuery {
    fn new(verb: &str) -> Self {
        Self {
            verb: verb.to_string(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Full request URL against a provider base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        let mut url = format!("{}/api?t={}", base_url, urlencoding::encode(&self.verb));
        for (key, value) in &self.params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }
}

/// Fold accented Latin letters to their ASCII base letter.
pub fn unaccented(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => out.push('A'),
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
            'Æ' => out.push_str("AE"),
            'æ' => out.push_str("ae"),
            'Ç' => out.push('C'),
            'ç' => out.push('c'),
            'È' | 'É' | 'Ê' | 'Ë' => out.push('E'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'Ì' | 'Í' | 'Î' | 'Ï' => out.push('I'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'Ñ' => out.push('N'),
            'ñ' => out.push('n'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => out.push('O'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => out.push('o'),
            'Œ' => out.push_str("OE"),
            'œ' => out.push_str("oe"),
            'Ù' | 'Ú' | 'Û' | 'Ü' => out.push('U'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'Ý' | 'Ÿ' => out.push('Y'),
            'ý' | 'ÿ' => out.push('y'),
            'ß' => out.push_str("ss"),
            'Ł' => out.push('L'),
            'ł' => out.push('l'),
            'Š' => out.push('S'),
            'š' => out.push('s'),
            'Ž' => out.push('Z'),
            'ž' => out.push('z'),
            _ => out.push(c),
        }
    }
    out
}

/// Unaccent, then keep ASCII alphanumerics, `-_.() `, and `extras`.
pub fn clean_name(name: &str, extras: &str) -> String {
    unaccented(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "-_.() ".contains(*c) || extras.contains(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Cleaned `(author, title)` used for book and audio searches.
///
/// `postfix` lists lowercase author-name suffixes to drop (`jr`, `phd`, ...).
pub fn search_terms(request: &SearchRequest, st: SearchType, postfix: &[String]) -> (String, String) {
    let mut author = clean_name(&request.author, "'");
    let mut title = clean_name(&request.title, "'");

    // "Spike Milligan: Man of Letters" stored as title == author
    if title == author {
        if let Some(sub) = request.subtitle.as_deref().filter(|s| !s.is_empty()) {
            title = clean_name(sub, "");
        }
    }

    if !author.is_empty() && title.len() > author.len() && title.starts_with(&author) {
        title = title.get(author.len() + 1..).unwrap_or("").to_string();
    }
    title = title.trim().to_string();

    // L. E. Modesitt Jr. -> Modesitt, Charles H. Elliott PhD -> Charles Elliott
    if author.contains(' ') {
        author = author
            .split(' ')
            .map(|w| w.trim_matches(|c| c == '.' || c == '_'))
            .filter(|w| w.len() > 1 && !postfix.iter().any(|p| p.eq_ignore_ascii_case(w)))
            .collect::<Vec<_>>()
            .join(" ");
    }

    if st.is_short() {
        if let Some(idx) = title.find('(') {
            title = title[..idx].trim().to_string();
        }
    }

    (author, title)
}

/// Free-text term with colons stripped; short variants cut at `(`.
fn free_text(term: &str, short: bool) -> String {
    let term = if short {
        term.split('(').next().unwrap_or("")
    } else {
        term
    };
    unaccented(&term.replace(':', "")).trim().to_string()
}

fn extended_flag(extended: bool) -> &'static str {
    if extended {
        "1"
    } else {
        "0"
    }
}

/// Build the indexer query for `request`, or `None` when this provider has
/// no verb/category combination able to serve it.
pub fn build_query(
    provider: &Provider,
    request: &SearchRequest,
    st: SearchType,
    postfix: &[String],
) -> Option<IndexerQuery> {
    let caps = provider.caps()?;
    let general = caps.general_search.as_deref().filter(|v| !v.is_empty());

    let query = match st {
        SearchType::Book | SearchType::ShortBook | SearchType::Audio | SearchType::ShortAudio => {
            let (verb, categories) = match st.dedicated_verb() {
                Some(CapabilityVerb::Audio) => (caps.verb(CapabilityVerb::Audio), &caps.audio_categories),
                _ => (caps.verb(CapabilityVerb::Book), &caps.book_categories),
            };
            if categories.is_empty() {
                None
            } else {
                let (author, title) = search_terms(request, st, postfix);
                let cat = categories.join(",");
                if let Some(verb) = verb {
                    Some(
                        IndexerQuery::new(verb)
                            .param("title", title)
                            .param("author", author)
                            .param("cat", cat),
                    )
                } else {
                    general.map(|verb| {
                        IndexerQuery::new(verb)
                            .param("q", format!("{} {}", author, title).trim().to_string())
                            .param("cat", cat)
                    })
                }
            }
        }
        SearchType::Magazine => {
            let verb = caps
                .mag_search
                .as_deref()
                .filter(|v| !v.is_empty())
                .or(general);
            match verb {
                Some(verb) if !caps.mag_categories.is_empty() => Some(
                    IndexerQuery::new(verb)
                        .param("cat", caps.mag_categories.join(","))
                        .param("q", free_text(&request.term, false))
                        .param("extended", extended_flag(caps.extended)),
                ),
                _ => None,
            }
        }
        SearchType::General | SearchType::ShortGeneral => general.map(|verb| {
            IndexerQuery::new(verb)
                .param("q", free_text(&request.term, st.is_short()))
                .param("extended", extended_flag(caps.extended))
        }),
    };

    match query {
        Some(query) => {
            let query = match provider.api_key() {
                Some(key) => query.param("apikey", key),
                None => query,
            };
            debug!(
                provider = %provider.name,
                search_type = %st,
                verb = %query.verb,
                "Search parameters set"
            );
            Some(query)
        }
        None => {
            debug!(
                provider = %provider.name,
                search_type = %st,
                "No matching search parameters"
            );
            None
        }
    }
}
