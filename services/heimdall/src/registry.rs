//! Site registry: reconciles polled snapshots with push updates

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::channel::ChannelState;
use crate::error::{HeimdallError, Result};
use crate::site::{Site, SiteMessage};

/// The registry keeps at most this many messages per site
pub const MESSAGE_CACHE_LIMIT: usize = 3;

/// In-memory mapping from site id to the latest received snapshot, plus the
/// bounded per-site message cache.
///
/// The registry always reflects the most recently received snapshot for a
/// site regardless of source; last-write-wins by arrival time is the only
/// ordering guarantee between overlapping poll and push arrivals.
#[derive(Debug, Default)]
pub struct Registry {
    sites: HashMap<i64, Site>,
    messages: HashMap<i64, Vec<SiteMessage>>,
    connection: ChannelState,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one page of a full-list fetch.
    ///
    /// Every incoming record replaces the cached one wholesale. Returns the
    /// ids whose message cache went stale: newly seen sites and sites whose
    /// `latest_message_timestamp` changed.
    pub fn apply_full_page(&mut self, page: Vec<Site>) -> Vec<i64> {
        let mut stale = Vec::new();
        for site in page {
            let id = site.id;
            if self.replace(site) {
                stale.push(id);
            }
        }
        stale
    }

    /// Apply a single push update.
    ///
    /// A record with a zero id is malformed and rejected without touching
    /// the registry. Returns the site id if its message cache went stale.
    pub fn apply_push_update(&mut self, site: Site) -> Result<Option<i64>> {
        if site.id == 0 {
            return Err(HeimdallError::MalformedPayload(
                "push update with missing or zero site id".to_string(),
            ));
        }
        let id = site.id;
        Ok(self.replace(site).then_some(id))
    }

    /// Replace the cached snapshot, returning whether a message refresh is
    /// warranted (first appearance, or latest-message marker mismatch).
    fn replace(&mut self, site: Site) -> bool {
        let stale = match self.sites.get(&site.id) {
            Some(cached) => cached.latest_message_timestamp != site.latest_message_timestamp,
            None => true,
        };
        self.sites.insert(site.id, site);
        stale
    }

    /// Replace a site's cached messages with at most the newest
    /// [`MESSAGE_CACHE_LIMIT`], in server order (newest-first, no re-sort).
    pub fn store_messages(&mut self, site_id: i64, mut messages: Vec<SiteMessage>) {
        messages.truncate(MESSAGE_CACHE_LIMIT);
        self.messages.insert(site_id, messages);
    }

    pub fn site(&self, id: i64) -> Option<&Site> {
        self.sites.get(&id)
    }

    pub fn messages(&self, site_id: i64) -> Option<&[SiteMessage]> {
        self.messages.get(&site_id).map(Vec::as_slice)
    }

    /// All cached sites, ordered by id
    pub fn sites(&self) -> Vec<&Site> {
        let mut sites: Vec<&Site> = self.sites.values().collect();
        sites.sort_by_key(|s| s.id);
        sites
    }

    /// Ids of every site currently flagged online, ordered by id
    pub fn online_site_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .sites
            .values()
            .filter(|s| s.online)
            .map(|s| s.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn connection(&self) -> ChannelState {
        self.connection
    }

    /// Mirror the push-channel state for read-only consumers
    pub fn set_connection(&mut self, state: ChannelState) {
        self.connection = state;
    }
}

/// Thread-safe registry handle shared between the engine and the dashboard
pub type StateHandle = Arc<RwLock<Registry>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(Registry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: i64, latest_message_timestamp: i64) -> Site {
        Site {
            id,
            name: format!("site-{}", id),
            latest_message_timestamp,
            online: true,
            ..Site::default()
        }
    }

    fn message(id: i64, site_id: i64) -> SiteMessage {
        SiteMessage {
            id,
            site: site_id,
            timestamp: id * 10,
            text: format!("msg {}", id),
            tag: "info".to_string(),
        }
    }

    #[test]
    fn full_page_inserts_new_sites_as_stale() {
        let mut registry = Registry::new();
        let stale = registry.apply_full_page(vec![site(1, 100), site(2, 50)]);
        assert_eq!(stale, vec![1, 2]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reapplying_identical_page_is_idempotent() {
        let mut registry = Registry::new();
        let page = vec![site(1, 100), site(2, 50)];
        registry.apply_full_page(page.clone());
        let before: Vec<Site> = registry.sites().into_iter().cloned().collect();

        let stale = registry.apply_full_page(page);
        assert!(stale.is_empty());
        let after: Vec<Site> = registry.sites().into_iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn full_page_flags_changed_message_marker() {
        let mut registry = Registry::new();
        registry.apply_full_page(vec![site(1, 100), site(2, 50)]);

        let stale = registry.apply_full_page(vec![site(1, 200), site(2, 50)]);
        assert_eq!(stale, vec![1]);
    }

    #[test]
    fn full_page_replaces_wholesale() {
        let mut registry = Registry::new();
        registry.apply_full_page(vec![site(1, 100)]);

        let mut updated = site(1, 100);
        updated.name = "renamed".to_string();
        updated.total_requests = 9;
        registry.apply_full_page(vec![updated]);

        let cached = registry.site(1).unwrap();
        assert_eq!(cached.name, "renamed");
        assert_eq!(cached.total_requests, 9);
    }

    #[test]
    fn push_update_same_marker_no_refresh() {
        let mut registry = Registry::new();
        registry.apply_full_page(vec![site(1, 100)]);

        let stale = registry.apply_push_update(site(1, 100)).unwrap();
        assert_eq!(stale, None);
    }

    #[test]
    fn push_update_changed_marker_flags_refresh() {
        let mut registry = Registry::new();
        registry.apply_full_page(vec![site(1, 100)]);

        let stale = registry.apply_push_update(site(1, 200)).unwrap();
        assert_eq!(stale, Some(1));
    }

    #[test]
    fn push_update_first_appearance_inserts() {
        let mut registry = Registry::new();
        let stale = registry.apply_push_update(site(5, 10)).unwrap();
        assert_eq!(stale, Some(5));
        assert!(registry.site(5).is_some());
    }

    #[test]
    fn push_update_zero_id_rejected() {
        let mut registry = Registry::new();
        registry.apply_full_page(vec![site(1, 100)]);

        let mut malformed = site(1, 999);
        malformed.id = 0;
        let err = registry.apply_push_update(malformed).unwrap_err();
        assert!(matches!(err, HeimdallError::MalformedPayload(_)));

        // Registry untouched by the rejected update
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.site(1).unwrap().latest_message_timestamp, 100);
    }

    #[test]
    fn messages_truncated_to_limit() {
        let mut registry = Registry::new();
        registry.store_messages(1, (0..5).map(|i| message(i, 1)).collect());

        let cached = registry.messages(1).unwrap();
        assert_eq!(cached.len(), MESSAGE_CACHE_LIMIT);
        // Server order kept: newest-first as returned, no re-sort
        assert_eq!(cached[0].id, 0);
        assert_eq!(cached[2].id, 2);
    }

    #[test]
    fn message_refresh_is_idempotent() {
        let mut registry = Registry::new();
        let msgs: Vec<SiteMessage> = (0..3).map(|i| message(i, 1)).collect();
        registry.store_messages(1, msgs.clone());
        registry.store_messages(1, msgs.clone());
        assert_eq!(registry.messages(1).unwrap(), msgs.as_slice());
    }

    #[test]
    fn online_ids_filters_and_sorts() {
        let mut registry = Registry::new();
        let mut offline = site(3, 0);
        offline.online = false;
        registry.apply_full_page(vec![site(2, 0), offline, site(1, 0)]);

        assert_eq!(registry.online_site_ids(), vec![1, 2]);
    }

    #[test]
    fn sites_ordered_by_id() {
        let mut registry = Registry::new();
        registry.apply_full_page(vec![site(9, 0), site(1, 0), site(4, 0)]);
        let ids: Vec<i64> = registry.sites().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 4, 9]);
    }

    #[test]
    fn connection_state_mirrored() {
        let mut registry = Registry::new();
        assert_eq!(registry.connection(), ChannelState::Disconnected);
        registry.set_connection(ChannelState::Connected);
        assert_eq!(registry.connection(), ChannelState::Connected);
    }
}
