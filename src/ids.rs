use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

/// Source of the current time. Swappable so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of random bits used for id and filename suffixes.
pub trait Entropy: Send + Sync {
    fn next_u64(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngEntropy;

impl Entropy for ThreadRngEntropy {
    fn next_u64(&self) -> u64 {
        rand::thread_rng().gen()
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix appended to ids and upload names.
pub const SUFFIX_LEN: usize = 6;

/// Encode the low digits of `value` as a fixed-width lowercase base36 string.
pub fn base36(mut value: u64, width: usize) -> String {
    let mut out = vec![b'0'; width];
    for slot in out.iter_mut().rev() {
        *slot = BASE36[(value % 36) as usize];
        value /= 36;
    }
    // BASE36 is pure ASCII
    String::from_utf8(out).unwrap_or_default()
}

/// ISO-8601 UTC with millisecond precision, e.g. `2026-10-18T09:12:44.123Z`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate a post id from the clock's millisecond timestamp.
///
/// The bare timestamp is used when free; otherwise a random base36 suffix is
/// appended and re-drawn until `is_taken` rejects nothing.
pub fn unique_id(
    now: DateTime<Utc>,
    entropy: &dyn Entropy,
    is_taken: impl Fn(&str) -> bool,
) -> String {
    let base = now.timestamp_millis().to_string();
    if !is_taken(&base) {
        return base;
    }
    loop {
        let candidate = format!("{}-{}", base, base36(entropy.next_u64(), SUFFIX_LEN));
        if !is_taken(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counter(AtomicU64);

    impl Entropy for Counter {
        fn next_u64(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn at_millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn base36_is_fixed_width() {
        assert_eq!(base36(0, 6), "000000");
        assert_eq!(base36(35, 6), "00000z");
        assert_eq!(base36(36, 6), "000010");
        assert_eq!(base36(u64::MAX, 6).len(), 6);
    }

    #[test]
    fn timestamp_uses_millis_and_z_suffix() {
        assert_eq!(timestamp(at_millis(1_700_000_000_123)), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn unique_id_prefers_bare_millis() {
        let entropy = Counter(AtomicU64::new(0));
        let id = unique_id(at_millis(1_700_000_000_000), &entropy, |_| false);
        assert_eq!(id, "1700000000000");
    }

    #[test]
    fn unique_id_appends_suffix_on_collision() {
        let entropy = Counter(AtomicU64::new(0));
        let taken = ["1700000000000", "1700000000000-000000"];
        let id = unique_id(at_millis(1_700_000_000_000), &entropy, |c| {
            taken.contains(&c)
        });
        assert_eq!(id, "1700000000000-000001");
    }

    #[test]
    fn thread_rng_entropy_varies() {
        let e = ThreadRngEntropy;
        let draws: std::collections::HashSet<u64> = (0..16).map(|_| e.next_u64()).collect();
        assert!(draws.len() > 1);
    }
}
