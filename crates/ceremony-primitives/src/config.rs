use serde::{Deserialize, Serialize};

/// Explicit configuration record for the environment knobs the engine reads.
///
/// This replaces the dynamic key/value maps the system was distilled from
/// (Design Note: "Dynamic key/value maps ... become explicit configuration
/// records").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Width (digit count) of the zero-padded `zkeyIndex` counter. Driven by
    /// the length of the source's `FIRST_ZKEY_INDEX` string, default
    /// `"00000"` (width 5).
    pub first_zkey_index_width: usize,
    /// Percentage tolerance added on top of the dynamic contribution budget,
    /// 0..=100. Used as the DYNAMIC timeout default for a circuit setup that
    /// names neither `dynamicTolerancePct` nor `fixedWindowMillis`.
    pub timeout_tolerance_pct: u8,
    /// Default length of an evicted participant's timeout, expressed the way
    /// the ceremony's `penalty` field does: minutes. Used when a ceremony
    /// setup request omits `penaltyMinutes`.
    pub retry_penalty_minutes: i64,
    /// Chunk size used to split an artifact into multi-part upload parts,
    /// advertised to contributor clients via the contribution snapshot.
    pub chunk_size_mb: u64,
    /// Lifetime, in seconds, of a pre-signed object-store URL.
    pub url_expiration_secs: u64,
    /// Cadence, in seconds, of the scheduler's periodic jobs.
    pub scheduler_tick_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            first_zkey_index_width: 5,
            timeout_tolerance_pct: 20,
            retry_penalty_minutes: 60,
            chunk_size_mb: 50,
            url_expiration_secs: 7200,
            scheduler_tick_secs: 300,
        }
    }
}

impl EngineConfig {
    /// Validates the configuration is usable. A missing/zero
    /// `first_zkey_index_width` is a fatal configuration error per Design
    /// Note 9: "behavior if absent is undefined in the source, so treat as
    /// fatal configuration error".
    pub fn validate(&self) -> Result<(), String> {
        if self.first_zkey_index_width == 0 {
            return Err("first_zkey_index_width must be > 0".to_string());
        }
        if self.timeout_tolerance_pct > 100 {
            return Err("timeout_tolerance_pct must be <= 100".to_string());
        }
        if self.chunk_size_mb == 0 {
            return Err("chunk_size_mb must be > 0".to_string());
        }
        Ok(())
    }
}
