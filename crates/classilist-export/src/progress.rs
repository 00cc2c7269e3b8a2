use classilist_abstraction::{ProgressEvent, ProgressSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

/// Logs export progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink {
    completed: AtomicU64,
    total: AtomicU64,
}

impl TracingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records reported so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => {
                self.completed.store(0, Ordering::Relaxed);
                self.total.store(total.unwrap_or(0), Ordering::Relaxed);
                info!(total = ?total, "export started");
            }
            ProgressEvent::Step { increment } => {
                let done = self.completed.fetch_add(increment, Ordering::Relaxed) + increment;
                let total = self.total.load(Ordering::Relaxed);
                if total > 0 {
                    debug!("export progress {done}/{total}");
                } else {
                    debug!("export progress {done}");
                }
            }
            ProgressEvent::Finished { written } => info!(written, "export finished"),
        }
    }
}

/// Cloneable stop request shared between the caller and a running export.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wraps a progress sink and reports stop requests from a [`StopHandle`].
#[derive(Debug)]
pub struct StoppableProgress<P> {
    inner: P,
    stop: StopHandle,
}

impl<P: ProgressSink> StoppableProgress<P> {
    pub fn new(inner: P, stop: StopHandle) -> Self {
        Self { inner, stop }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: ProgressSink> ProgressSink for StoppableProgress<P> {
    fn on_event(&self, event: ProgressEvent) {
        self.inner.on_event(event);
    }

    fn is_stopped(&self) -> bool {
        self.stop.is_stop_requested() || self.inner.is_stopped()
    }
}
