//! On-media layout of the threshold record.
//!
//! ```text
//! offset  size  field
//!      0     2  trip_delay_samples  i16 LE
//!      2     4  soft_limit_amps     f32 LE
//!      6     4  abs_limit_amps      f32 LE
//! ```

use crate::settings::ThresholdConfig;

use super::StorageError;

/// Size of one persisted threshold record in bytes.
pub const RECORD_SIZE: usize = 10;

/// Serialize `config` into its fixed-size record.
pub fn encode(config: &ThresholdConfig) -> Result<[u8; RECORD_SIZE], StorageError> {
    let mut buf = [0u8; RECORD_SIZE];
    let used = postcard::to_slice(config, &mut buf)
        .map_err(|_| StorageError::Encode)?
        .len();
    if used != RECORD_SIZE {
        return Err(StorageError::Encode);
    }
    Ok(buf)
}

/// Parse a record. Range validation is the caller's job.
pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Result<ThresholdConfig, StorageError> {
    postcard::from_bytes(bytes).map_err(|_| StorageError::Decode)
}
