use crate::PhaseSummary;

/// Message used when the transport drops before a terminal event.
pub const CONNECTION_LOST: &str = "Connection lost. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    ItemProgress,
    /// One unit finished; `success == false` is an item-level failure.
    ItemDone { success: bool },
    PhaseDone,
    /// Fatal for the whole phase. `transport` marks a synthesized disconnect.
    Error { transport: bool },
}

/// One decoded event from a live phase stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub message: String,
    pub current_item: Option<String>,
    /// Secondary label for the unit being processed, e.g. the spec being parsed.
    pub sub_item: Option<String>,
    pub current_index: Option<u32>,
    pub total_items: Option<u32>,
    pub result: Option<PhaseSummary>,
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            current_item: None,
            sub_item: None,
            current_index: None,
            total_items: None,
            result: None,
            error: None,
        }
    }

    pub fn start(message: impl Into<String>, total_items: Option<u32>) -> Self {
        Self {
            total_items,
            ..Self::new(EventKind::Start, message)
        }
    }

    pub fn item_progress(item: impl Into<String>, index: u32, total: Option<u32>) -> Self {
        let item = item.into();
        Self {
            message: format!("Processing {item}"),
            current_item: Some(item),
            current_index: Some(index),
            total_items: total,
            ..Self::new(EventKind::ItemProgress, String::new())
        }
    }

    pub fn item_done(item: impl Into<String>, success: bool) -> Self {
        let item = item.into();
        Self {
            message: if success {
                format!("Finished {item}")
            } else {
                format!("Failed {item}")
            },
            current_item: Some(item),
            ..Self::new(EventKind::ItemDone { success }, String::new())
        }
    }

    pub fn phase_done(message: impl Into<String>, result: Option<PhaseSummary>) -> Self {
        Self {
            result,
            ..Self::new(EventKind::PhaseDone, message)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: Some(message.clone()),
            ..Self::new(EventKind::Error { transport: false }, message)
        }
    }

    /// Synthesized when the channel closes without a terminal event.
    pub fn connection_lost(cause: impl Into<String>) -> Self {
        Self {
            error: Some(cause.into()),
            ..Self::new(EventKind::Error { transport: true }, CONNECTION_LOST)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::PhaseDone | EventKind::Error { .. })
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.current_index = Some(index);
        self
    }

    pub fn with_total(mut self, total: u32) -> Self {
        self.total_items = Some(total);
        self
    }
}
