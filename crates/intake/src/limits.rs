use serde::{Deserialize, Serialize};

const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_ROWS: u64 = 50_000;

/// Intake ceilings, enforced before full decoding to bound memory use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntakeLimits {
    pub max_bytes: u64,
    pub max_rows: u64,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        IntakeLimits {
            max_bytes: DEFAULT_MAX_BYTES,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl IntakeLimits {
    pub fn new(max_bytes: u64, max_rows: u64) -> Self {
        IntakeLimits {
            max_bytes,
            max_rows,
        }
    }
}
