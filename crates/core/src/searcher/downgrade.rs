//! Withdrawal of dedicated search verbs a provider has rejected.

use tracing::error;

use super::SearchType;
use crate::metrics::SEARCH_TYPE_DOWNGRADES;
use crate::provider::{Provider, ProviderStore};

/// Lowercase fragments of errors meaning "this query shape is unsupported".
const UNSUPPORTED_PHRASES: &[&str] = &[
    "no such function",
    "unknown parameter",
    "unknown function",
    "bad request",
    "bad_request",
    "incorrect parameter",
    "does not support",
];

pub fn is_unsupported_error(message: &str) -> bool {
    let message = message.to_lowercase();
    UNSUPPORTED_PHRASES.iter().any(|p| message.contains(p))
}

/// Clear the dedicated verb `st` used if `message` says it is unsupported.
///
/// The stored provider is located by host and updated even when its
/// capabilities are pinned by hand. Returns true when the verb was cleared,
/// in which case `provider` is updated in memory as well.
pub async fn maybe_disable_search_type(
    st: SearchType,
    message: &str,
    provider: &mut Provider,
    store: &dyn ProviderStore,
) -> bool {
    let Some(verb) = st.dedicated_verb() else {
        return false;
    };
    let Some(current) = provider.caps().and_then(|c| c.verb(verb)).map(str::to_string) else {
        return false;
    };
    if !is_unsupported_error(message) {
        return false;
    }

    let stored = match store.find_by_host(&provider.host).await {
        Some(stored) => stored,
        None => {
            error!(
                provider = %provider.name,
                search_type = %st,
                "Unable to disable search type, provider not in store"
            );
            return false;
        }
    };

    let result = store
        .update(
            &stored.name,
            Box::new(move |p: &mut Provider| {
                if let Some(settings) = p.indexer_mut() {
                    settings.caps.clear_verb(verb);
                }
            }),
        )
        .await;

    match result {
        Ok(_) => {
            if let Some(settings) = provider.indexer_mut() {
                settings.caps.clear_verb(verb);
            }
            error!(
                provider = %provider.name,
                verb = verb.as_str(),
                value = %current,
                "Disabled search verb"
            );
            SEARCH_TYPE_DOWNGRADES
                .with_label_values(&[verb.as_str()])
                .inc();
            true
        }
        Err(e) => {
            error!(
                provider = %provider.name,
                search_type = %st,
                error = %e,
                "Unable to disable search type"
            );
            false
        }
    }
}
