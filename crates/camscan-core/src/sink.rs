// ── Result sinks ──
//
// A sink receives the decoded text exactly once. It is `FnOnce`, so a
// session physically cannot invoke it twice.

use tokio::sync::watch;

/// Caller-supplied receiver for the decoded value.
pub type ScanSink = Box<dyn FnOnce(String) + Send + 'static>;

/// A text slot standing in for the form field a scan trigger points at.
///
/// Cloneable; every clone observes the same value.
#[derive(Debug, Clone)]
pub struct TargetField {
    value: watch::Sender<Option<String>>,
}

impl Default for TargetField {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetField {
    pub fn new() -> Self {
        let (value, _) = watch::channel(None);
        Self { value }
    }

    pub fn value(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    pub fn set(&self, text: String) {
        self.value.send_replace(Some(text));
    }

    /// Wait until a value is written, returning it.
    pub async fn filled(&self) -> Option<String> {
        let mut rx = self.value.subscribe();
        rx.wait_for(Option::is_some).await.ok()?.clone()
    }
}

/// Build a sink that writes into `target`, or hands the text to `fallback`
/// when the trigger's target could not be found.
pub fn field_sink<F>(target: Option<TargetField>, fallback: F) -> ScanSink
where
    F: FnOnce(String) + Send + 'static,
{
    match target {
        Some(field) => Box::new(move |text| field.set(text)),
        None => Box::new(fallback),
    }
}
