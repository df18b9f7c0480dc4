//! Entry id generation: `YYYY-MM-DDTHH-MM-SS-<ms>Z_<6hex>`.
//!
//! Lexicographically monotonic within a process (the timestamp component
//! increases, and ties are broken by an independent random suffix); not
//! guaranteed monotonic across process restarts per spec §6.

use chrono::{DateTime, Utc};

pub fn generate(now: DateTime<Utc>) -> String {
    let ms = now.timestamp_subsec_millis();
    let stamp = now.format("%Y-%m-%dT%H-%M-%S");
    let suffix: u32 = rand::random::<u32>() & 0x00FF_FFFF;
    format!("{stamp}-{ms:03}Z_{suffix:06x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches_spec_shape() {
        let now = Utc::now();
        let id = generate(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].len(), 6);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
