use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use docflow_logging::flow_warn;
use tokio::runtime::Handle;

/// Latched Ctrl-C request, polled by the command loops.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    /// Raises the latch on every Ctrl-C delivered to the process.
    pub fn listen(runtime: &Handle) -> Self {
        let interrupt = Self::default();
        let latch = interrupt.clone();
        runtime.spawn(async move {
            loop {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    flow_warn!("Ctrl-C handler unavailable: {}", err);
                    return;
                }
                latch.raise();
            }
        });
        interrupt
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Consumes a pending request.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }
}
