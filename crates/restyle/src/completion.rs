//! Streaming-completion detection.
//!
//! The host page renders responses progressively, so extraction must wait
//! until the text has settled. The detector samples the element's text on a
//! fixed interval and calls the response complete once the same sample has
//! been observed a configured number of consecutive times with no active
//! streaming indicator. Timing out is a normal outcome, not an error: the
//! container is skipped and stays eligible for a future mutation pass.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::detect::{STOP_BUTTON_ATTR, STOP_BUTTON_VALUE, STREAMING_CLASS};
use crate::dom::{Document, NodeId, SharedDocument};

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// How often the element text is sampled.
    pub interval: Duration,
    /// Consecutive identical samples required to call the text stable.
    pub stable_samples: u32,
    /// Wall-clock budget; elapsing it yields `false`.
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            interval: Duration::from_millis(500),
            stable_samples: 3,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Wait until `element`'s text stops changing, an in-progress indicator
/// notwithstanding. Returns `false` on timeout or when the element is
/// removed from the document, which also tears the timer down.
pub async fn wait_for_completion(
    document: &SharedDocument,
    element: NodeId,
    config: &CompletionConfig,
) -> bool {
    let started = Instant::now();
    let mut ticks = interval_at(started + config.interval, config.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last = {
        let doc = document.lock().unwrap();
        if !doc.contains(element) {
            return false;
        }
        doc.text_content(element)
    };
    let mut unchanged = 0u32;

    loop {
        ticks.tick().await;

        let sample = {
            let doc = document.lock().unwrap();
            if !doc.contains(element) {
                debug!("element removed while waiting for completion");
                return false;
            }
            Sample {
                text: doc.text_content(element),
                streaming: is_streaming(&doc, element),
            }
        };

        if sample.streaming {
            unchanged = 0;
            last = sample.text;
        } else if sample.text == last {
            unchanged += 1;
            if unchanged >= config.stable_samples {
                return true;
            }
        } else {
            unchanged = 0;
            last = sample.text;
        }

        if started.elapsed() >= config.timeout {
            debug!("completion wait timed out");
            return false;
        }
    }
}

struct Sample {
    text: String,
    streaming: bool,
}

/// Whether the page is still producing output for `element`: a streaming
/// marker under its closest `article` ancestor or under the element itself,
/// or a stop button anywhere in the document.
fn is_streaming(doc: &Document, element: NodeId) -> bool {
    let article = doc
        .ancestors(element)
        .into_iter()
        .find(|id| doc.tag(*id) == Some("article"));
    if let Some(article) = article {
        if doc
            .descendants(article)
            .into_iter()
            .any(|id| doc.has_class(id, STREAMING_CLASS))
        {
            return true;
        }
    }
    if doc
        .descendants(element)
        .into_iter()
        .any(|id| doc.has_class(id, STREAMING_CLASS))
    {
        return true;
    }
    doc.descendants(doc.root())
        .into_iter()
        .any(|id| doc.attr(id, STOP_BUTTON_ATTR) == Some(STOP_BUTTON_VALUE))
}
