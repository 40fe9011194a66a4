use chrono::Utc;
use studio_core::{CtaCache, CtaSource, CtaSuggestion, FetchRecord, NoticeFlags, RecentList};

use crate::store::{keys, ProgressStore};

/// Most recent fetches first; an identical query replaces its older entry.
pub fn record_fetch(store: &ProgressStore, record: FetchRecord) -> bool {
    let mut history = fetch_history(store);
    history.push_replacing(record, FetchRecord::same_query);
    store.save(keys::FETCH_HISTORY, &history)
}

pub fn fetch_history(store: &ProgressStore) -> RecentList<FetchRecord> {
    store.load(keys::FETCH_HISTORY).unwrap_or_default()
}

pub fn cache_ctas(store: &ProgressStore, source: &CtaSource, ctas: &[CtaSuggestion]) -> bool {
    let cache = CtaCache {
        last_source: Some(source.clone()),
        ctas: ctas.to_vec(),
        updated_at: Some(Utc::now()),
    };
    store.save(keys::CTA_CACHE, &cache)
}

pub fn cached_ctas(store: &ProgressStore) -> Option<CtaCache> {
    store.load(keys::CTA_CACHE)
}

pub fn dismiss_notice(store: &ProgressStore, notice_id: &str) -> bool {
    let mut flags: NoticeFlags = store.load(keys::DISMISSED_NOTICES).unwrap_or_default();
    if !flags.dismiss(notice_id) {
        return true;
    }
    store.save(keys::DISMISSED_NOTICES, &flags)
}

pub fn is_notice_dismissed(store: &ProgressStore, notice_id: &str) -> bool {
    store
        .load::<NoticeFlags>(keys::DISMISSED_NOTICES)
        .is_some_and(|flags| flags.is_dismissed(notice_id))
}
