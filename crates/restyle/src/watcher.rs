//! Watches a document for assistant responses and drives the rewrite
//! pipeline for each one.
//!
//! One watcher owns one document's mutation subscription and the
//! container-state table. A container is either processing or processed,
//! never both, and is rewritten at most once per document lifetime.
//! Stopping the watcher tears down observation but lets in-flight
//! rewrites finish and apply.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::completion::{self, CompletionConfig};
use crate::detect;
use crate::dom::{DomEvent, NodeId, SharedDocument};
use crate::extract;
use crate::rewrite::Rewriter;
use crate::settings::SettingsStore;
use crate::swap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Processing,
    Processed,
}

pub struct ResponseWatcher {
    context: ProcessContext,
    observer: Option<Observer>,
}

struct Observer {
    subscription_id: usize,
    event_loop: JoinHandle<()>,
}

#[derive(Clone)]
struct ProcessContext {
    document: SharedDocument,
    rewriter: Arc<dyn Rewriter>,
    settings: SettingsStore,
    completion: CompletionConfig,
    states: Arc<Mutex<HashMap<NodeId, ContainerState>>>,
}

impl ResponseWatcher {
    pub fn new(
        document: SharedDocument,
        rewriter: Arc<dyn Rewriter>,
        settings: SettingsStore,
    ) -> Self {
        ResponseWatcher {
            context: ProcessContext {
                document,
                rewriter,
                settings,
                completion: CompletionConfig::default(),
                states: Arc::new(Mutex::new(HashMap::new())),
            },
            observer: None,
        }
    }

    pub fn with_completion_config(mut self, completion: CompletionConfig) -> Self {
        self.context.completion = completion;
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.context.document
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    pub fn state_of(&self, container: NodeId) -> Option<ContainerState> {
        self.context.states.lock().unwrap().get(&container).copied()
    }

    /// Begin observing. Idempotent: an already-active watcher is left
    /// alone. Containers present before observation began are swept once.
    pub fn start(&mut self) {
        if self.observer.is_some() {
            debug!("observer already active");
            return;
        }

        let subscription = self.context.document.lock().unwrap().subscribe();
        let subscription_id = subscription.id();
        let context = self.context.clone();
        let event_loop = tokio::spawn(run_event_loop(context, subscription));
        self.observer = Some(Observer {
            subscription_id,
            event_loop,
        });
        info!("started observing");

        self.sweep();
    }

    /// Stop observing. In-flight container tasks are not cancelled; a
    /// pending rewrite may still complete and apply its result.
    pub fn stop(&mut self) {
        let Some(observer) = self.observer.take() else {
            return;
        };
        self.context
            .document
            .lock()
            .unwrap()
            .unsubscribe(observer.subscription_id);
        observer.event_loop.abort();
        info!("stopped observing");
    }

    /// Process containers that already exist in the document.
    fn sweep(&self) {
        if !self.context.settings.get().enabled {
            return;
        }
        let containers = {
            let doc = self.context.document.lock().unwrap();
            detect::find_all_containers(&doc)
        };
        for container in containers {
            tokio::spawn(process_container(self.context.clone(), container));
        }
    }
}

impl Drop for ResponseWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_event_loop(context: ProcessContext, mut subscription: crate::dom::Subscription) {
    while let Some(DomEvent::ChildAdded(node)) = subscription.events.recv().await {
        if !context.settings.get().enabled {
            continue;
        }
        let candidates = {
            let doc = context.document.lock().unwrap();
            detect::collect_candidates(&doc, node)
        };
        for container in candidates {
            tokio::spawn(process_container(context.clone(), container));
        }
    }
}

async fn process_container(context: ProcessContext, container: NodeId) {
    if context.states.lock().unwrap().contains_key(&container) {
        return;
    }

    let text_element = {
        let doc = context.document.lock().unwrap();
        detect::find_text_element(&doc, container)
    };
    // No text-bearing element is a silent skip; the container stays unseen.
    let Some(text_element) = text_element else {
        return;
    };

    {
        let mut states = context.states.lock().unwrap();
        if states.contains_key(&container) {
            return;
        }
        states.insert(container, ContainerState::Processing);
    }
    debug!(container = container.index(), "processing message container");

    let complete =
        completion::wait_for_completion(&context.document, text_element, &context.completion).await;
    if !complete {
        // Back to unseen; a future mutation pass may pick it up again.
        context.states.lock().unwrap().remove(&container);
        debug!("response still streaming, skipping");
        return;
    }
    context
        .states
        .lock()
        .unwrap()
        .insert(container, ContainerState::Processed);

    let (original_html, original_text) = {
        let doc = context.document.lock().unwrap();
        if swap::is_rewritten(&doc, text_element) {
            debug!("already rewritten, skipping");
            return;
        }
        (
            doc.inner_html(text_element),
            extract::extract_text(&doc, text_element),
        )
    };
    if original_text.trim().is_empty() {
        debug!("empty response, skipping");
        return;
    }

    {
        let mut doc = context.document.lock().unwrap();
        swap::add_loading_indicator(&mut doc, text_element);
    }

    match context.rewriter.rewrite(&original_text).await {
        Ok(modified) => {
            let mut doc = context.document.lock().unwrap();
            swap::swap_content(&mut doc, text_element, &modified, &original_html);
            info!("successfully rewrote response");
        }
        Err(error) => {
            error!(%error, "failed to rewrite response");
            {
                let mut doc = context.document.lock().unwrap();
                swap::remove_loading_indicator(&mut doc, text_element);
            }
            swap::add_error_indicator(&context.document, text_element, &error.to_string());
        }
    }
}
