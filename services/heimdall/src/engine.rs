//! Engine: drives the sync loop over polls, push events, and the countdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelEvent, ChannelState, PushChannel};
use crate::config::SchedulerConfig;
use crate::poller::SiteApi;
use crate::registry::StateHandle;
use crate::scheduler::Countdown;

/// Orchestrates the site registry: an initial paginated sync, then a
/// 1-second tick loop interleaved with push events and focus changes.
///
/// Single-task and cooperative: every mutation of the registry goes through
/// this engine, so poll and push arrivals interleave but never race.
pub struct Engine {
    api: SiteApi,
    channel: Arc<dyn PushChannel>,
    state: StateHandle,
    countdown: Countdown,
    connection: ChannelState,
    focused_interval: Duration,
    unfocused_interval: Duration,
    focus_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        api: SiteApi,
        channel: Arc<dyn PushChannel>,
        state: StateHandle,
        config: &SchedulerConfig,
        focus_rx: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            channel,
            state,
            countdown: Countdown::new(config.focused_interval),
            connection: ChannelState::Disconnected,
            focused_interval: config.focused_interval,
            unfocused_interval: config.unfocused_interval,
            focus_rx,
            cancel,
        }
    }

    /// Full-list fetch: apply every page to the registry and refresh the
    /// message cache of each site the reconciler flagged stale.
    pub async fn initial_sync(&mut self) {
        let sites = self.api.fetch_all_sites().await;
        let count = sites.len();

        let stale = self.state.write().await.apply_full_page(sites);
        tracing::info!(
            "Initial sync: {} sites, {} message caches stale",
            count,
            stale.len()
        );
        for site_id in stale {
            self.refresh_messages(site_id).await;
        }
    }

    /// Run the tick/event loop until the cancellation token fires, then
    /// close the channel so nothing outlives the loop.
    pub async fn run(&mut self) {
        let cancel = self.cancel.clone();
        let channel = Arc::clone(&self.channel);
        let mut focus_rx = self.focus_rx.clone();
        let mut focus_signal_live = true;

        // First tick lands one second in, matching the wall-clock cadence
        let start = tokio::time::Instant::now() + Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(start, Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = focus_rx.changed(), if focus_signal_live => {
                    match changed {
                        Ok(()) => {
                            let focused = *focus_rx.borrow_and_update();
                            self.apply_focus(focused).await;
                        }
                        // Signal source gone; stay at the current cadence
                        Err(_) => focus_signal_live = false,
                    }
                }
                event = channel.recv() => self.handle_event(event).await,
                _ = ticker.tick() => {
                    if self.countdown.tick() {
                        self.act().await;
                    }
                }
            }
        }

        if let Err(e) = self.channel.close().await {
            tracing::warn!("Closing push channel: {}", e);
        }
        self.set_connection(ChannelState::Disconnected).await;
        tracing::debug!("Engine loop stopped");
    }

    /// The scheduled action: request updates while connected, otherwise
    /// start a reconnect attempt.
    pub async fn act(&mut self) {
        match self.connection {
            ChannelState::Connected => {
                let ids = self.state.read().await.online_site_ids();
                tracing::debug!("Requesting updates for {} online sites", ids.len());
                for id in ids {
                    if let Err(e) = self.channel.send_site_id(id).await {
                        tracing::warn!("Update request for site {} failed: {}", id, e);
                        break;
                    }
                }
            }
            ChannelState::Disconnected => {
                self.set_connection(ChannelState::Connecting).await;
                if let Err(e) = self.channel.connect().await {
                    tracing::warn!("Push channel connect failed: {}", e);
                    self.set_connection(ChannelState::Disconnected).await;
                }
            }
            // An attempt is already in flight
            ChannelState::Connecting => {}
        }
    }

    /// Reconcile one channel event into the registry
    pub async fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                tracing::info!("Push channel connected");
                self.set_connection(ChannelState::Connected).await;
            }
            ChannelEvent::Closed => {
                tracing::info!("Push channel disconnected");
                self.set_connection(ChannelState::Disconnected).await;
            }
            ChannelEvent::SiteUpdate(site) => {
                let applied = self.state.write().await.apply_push_update(site);
                match applied {
                    Ok(Some(site_id)) => self.refresh_messages(site_id).await,
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Discarding push update: {}", e),
                }
            }
        }
    }

    async fn refresh_messages(&self, site_id: i64) {
        match self.api.fetch_site_messages(site_id).await {
            Ok(messages) => {
                tracing::debug!("Refreshed {} messages for site {}", messages.len(), site_id);
                self.state.write().await.store_messages(site_id, messages);
            }
            // Not retried; the next staleness trigger refetches
            Err(e) => tracing::warn!("Message refresh for site {} failed: {}", site_id, e),
        }
    }

    async fn apply_focus(&mut self, focused: bool) {
        if focused {
            tracing::debug!("Focus regained, restoring fast cadence");
            self.countdown.set_interval(self.focused_interval);
            self.countdown.expire();
        } else {
            tracing::debug!("Focus lost, slowing cadence");
            self.countdown.set_interval(self.unfocused_interval);
        }
    }

    async fn set_connection(&mut self, state: ChannelState) {
        self.connection = state;
        self.state.write().await.set_connection(state);
    }

    pub fn connection(&self) -> ChannelState {
        self.connection
    }
}
