use std::sync::mpsc;

use docflow_core::{ProjectId, StaleTag};
use docflow_logging::flow_debug;

struct Subscriber {
    project: Option<ProjectId>,
    tx: mpsc::Sender<StaleTag>,
}

/// Fans stale-data notifications out to whoever caches server data.
#[derive(Default)]
pub struct InvalidationBus {
    subscribers: Vec<Subscriber>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to tags of one project, or of every project with `None`.
    pub fn subscribe(&mut self, project: Option<ProjectId>) -> mpsc::Receiver<StaleTag> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(Subscriber { project, tx });
        rx
    }

    /// Delivers each distinct tag once to every interested subscriber.
    /// Subscribers whose receiver is gone are dropped.
    pub fn publish(&mut self, tags: &[StaleTag]) -> usize {
        let mut distinct: Vec<&StaleTag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !distinct.contains(&tag) {
                distinct.push(tag);
            }
        }

        let mut delivered = 0;
        self.subscribers.retain(|subscriber| {
            for tag in &distinct {
                let wanted = subscriber
                    .project
                    .map_or(true, |project| tag.concerns(project));
                if !wanted {
                    continue;
                }
                if subscriber.tx.send(**tag).is_err() {
                    return false;
                }
                delivered += 1;
            }
            true
        });
        flow_debug!("Invalidated {:?} ({} deliveries)", distinct, delivered);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
