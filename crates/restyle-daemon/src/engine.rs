//! Page sessions and the registry that keeps their watchers in step with
//! the enabled flag. A session is the daemon-side stand-in for one open
//! chat tab: a document fed by snapshot + fragments, plus the watcher
//! driving the rewrite pipeline over it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use restyle::completion::CompletionConfig;
use restyle::dom::{Document, NodeId, SharedDocument};
use restyle::rewrite::Rewriter;
use restyle::settings::SettingsStore;
use restyle::swap;
use restyle::watcher::ResponseWatcher;
use tracing::{info, warn};

pub struct PageSession {
    pub id: u64,
    document: SharedDocument,
    watcher: Mutex<ResponseWatcher>,
}

impl PageSession {
    fn new(
        id: u64,
        html: &str,
        rewriter: Arc<dyn Rewriter>,
        settings: SettingsStore,
        completion: CompletionConfig,
    ) -> Arc<Self> {
        let document = Document::parse(html).into_shared();
        let watcher = ResponseWatcher::new(document.clone(), rewriter, settings)
            .with_completion_config(completion);
        Arc::new(PageSession {
            id,
            document,
            watcher: Mutex::new(watcher),
        })
    }

    pub fn start(&self) {
        self.watcher.lock().unwrap().start();
    }

    pub fn stop(&self) {
        self.watcher.lock().unwrap().stop();
    }

    pub fn is_observing(&self) -> bool {
        self.watcher.lock().unwrap().is_observing()
    }

    /// Apply one host-page mutation: parse `html` and append it under
    /// `parent` (arena index), defaulting to the page body.
    pub fn append_fragment(&self, parent: Option<usize>, html: &str) -> Option<Vec<NodeId>> {
        let mut doc = self.document.lock().unwrap();
        let target = match parent {
            Some(index) => doc.node_at(index)?,
            None => doc.body().unwrap_or_else(|| doc.root()),
        };
        Some(doc.append_html(target, html))
    }

    pub fn html(&self) -> String {
        self.document.lock().unwrap().html()
    }

    /// Toggle a swapped container between its rewritten and original view.
    pub fn toggle(&self, node: usize) -> Option<bool> {
        let mut doc = self.document.lock().unwrap();
        let element = doc.node_at(node)?;
        swap::toggle_view(&mut doc, element)
    }
}

pub struct Engine {
    settings: SettingsStore,
    rewriter: Arc<dyn Rewriter>,
    completion: CompletionConfig,
    sessions: Mutex<HashMap<u64, Arc<PageSession>>>,
    next_id: AtomicU64,
}

impl Engine {
    pub fn new(settings: SettingsStore, rewriter: Arc<dyn Rewriter>) -> Self {
        Engine {
            settings,
            rewriter,
            completion: CompletionConfig::default(),
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_completion_config(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Attach a page snapshot. The watcher starts immediately when the
    /// extension is enabled.
    pub fn create_session(&self, html: &str) -> Arc<PageSession> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = PageSession::new(
            id,
            html,
            self.rewriter.clone(),
            self.settings.clone(),
            self.completion.clone(),
        );
        if self.settings.get().enabled {
            session.start();
        }
        self.sessions.lock().unwrap().insert(id, session.clone());
        info!(session = id, "page session attached");
        session
    }

    pub fn session(&self, id: u64) -> Option<Arc<PageSession>> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    pub fn session_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.sessions.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn all_sessions(&self) -> Vec<Arc<PageSession>> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }

    /// Make sure every session has a running watcher. Idempotent; this is
    /// the `injectContentScript` path.
    pub fn ensure_started(&self) {
        for session in self.all_sessions() {
            session.start();
        }
    }

    pub fn stop_all(&self) {
        for session in self.all_sessions() {
            session.stop();
        }
    }

    pub fn apply_enabled(&self, enabled: bool) {
        if enabled {
            self.ensure_started();
        } else {
            self.stop_all();
        }
    }

    /// React to settings changes for as long as the engine lives. Changes
    /// to anything but `enabled` need no action here: watchers read the
    /// store on every event.
    pub fn spawn_settings_listener(engine: Arc<Engine>) {
        let mut rx = engine.settings.subscribe();
        tokio::spawn(async move {
            let mut enabled = rx.borrow().enabled;
            while rx.changed().await.is_ok() {
                let now_enabled = rx.borrow_and_update().enabled;
                if now_enabled != enabled {
                    enabled = now_enabled;
                    info!(enabled, "extension toggled");
                    engine.apply_enabled(enabled);
                }
            }
            warn!("settings channel closed");
        });
    }
}
