use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Last millisecond value handed out, so that two operations started within
// the same millisecond still get distinct keys.
static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

/// Identifies one request/response session. Sent as the `key` query
/// parameter when connecting and echoed in the request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn generate() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::issue(now)
    }

    fn issue(millis: u64) -> Self {
        let mut prev = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let next = millis.max(prev + 1);
            match LAST_ISSUED.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return CorrelationKey(format!("key-{}", next)),
                Err(current) => prev = current,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
