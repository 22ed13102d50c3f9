use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Maximum number of rate samples to keep (1 minute at 1-second ticks)
const MAX_SAMPLE_HISTORY: usize = 60;

/// Unit system used when displaying sizes and rates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Powers of 1000 (MB, Mbit)
    #[default]
    Decimal,
    /// Powers of 1024 (MiB, Mibit)
    Binary,
}

impl UnitSystem {
    pub fn mega(&self) -> f64 {
        match self {
            UnitSystem::Decimal => 1_000_000.0,
            UnitSystem::Binary => 1_048_576.0,
        }
    }

    pub fn byte_label(&self) -> &'static str {
        match self {
            UnitSystem::Decimal => "MB",
            UnitSystem::Binary => "MiB",
        }
    }

    pub fn bit_label(&self) -> &'static str {
        match self {
            UnitSystem::Decimal => "Mbit",
            UnitSystem::Binary => "Mibit",
        }
    }
}

impl std::str::FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "decimal" | "si" | "1000" => Ok(Self::Decimal),
            "binary" | "iec" | "1024" => Ok(Self::Binary),
            _ => Err(format!(
                "invalid unit system '{}', expected 'decimal' or 'binary'",
                s
            )),
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitSystem::Decimal => write!(f, "decimal"),
            UnitSystem::Binary => write!(f, "binary"),
        }
    }
}

/// Bytes moved during one sampling interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateSample {
    pub bytes: u64,
    pub units: UnitSystem,
}

impl RateSample {
    pub fn bits(&self) -> u64 {
        self.bytes * 8
    }

    /// Megabits (or mebibits) in the interval
    pub fn megabits(&self) -> f64 {
        self.bits() as f64 / self.units.mega()
    }

    /// Megabytes (or mebibytes) in the interval
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / self.units.mega()
    }
}

/// Byte accumulator shared between the frame loop and the sampling tick
pub struct RateCounter {
    units: UnitSystem,
    accumulated: AtomicU64,
    peak: AtomicU64,
    history: Mutex<VecDeque<RateSample>>,
}

impl RateCounter {
    pub fn new(units: UnitSystem) -> Self {
        Self {
            units,
            accumulated: AtomicU64::new(0),
            peak: AtomicU64::new(0),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn add(&self, bytes: u64) {
        self.accumulated.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn pending(&self) -> u64 {
        self.accumulated.load(Ordering::Relaxed)
    }

    /// Take the bytes accumulated since the last sample and reset to zero
    pub fn sample(&self) -> RateSample {
        let bytes = self.accumulated.swap(0, Ordering::Relaxed);
        self.peak.fetch_max(bytes, Ordering::Relaxed);

        let sample = RateSample {
            bytes,
            units: self.units,
        };
        let mut history = self.history.lock();
        history.push_back(sample);
        if history.len() > MAX_SAMPLE_HISTORY {
            history.pop_front();
        }
        sample
    }

    /// Largest per-interval byte count seen so far
    pub fn peak(&self) -> RateSample {
        RateSample {
            bytes: self.peak.load(Ordering::Relaxed),
            units: self.units,
        }
    }

    pub fn history(&self) -> Vec<RateSample> {
        self.history.lock().iter().copied().collect()
    }
}

/// Final counters of a sending session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderTotals {
    pub frames: u64,
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u32>,
    pub cancelled: bool,
    pub duration_ms: u64,
    pub throughput_mbps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_mbps: Option<f64>,
    pub units: UnitSystem,
}

/// Final counters of a receiving session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverTotals {
    pub frames: u64,
    pub bytes: u64,
    pub errors: u64,
    pub lost: u64,
    pub checksum_errors: u64,
    pub truncated: u64,
    pub backward: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u32>,
    /// Session ended on a frame carrying the stop flag
    pub completed: bool,
    pub duration_ms: u64,
    pub throughput_mbps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_mbps: Option<f64>,
    pub units: UnitSystem,
}

/// Average throughput in Mbit/s (or Mibit/s) over `elapsed`
pub fn throughput(bytes: u64, elapsed: Duration, units: UnitSystem) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 * 8.0) / (secs * units.mega())
    } else {
        0.0
    }
}

pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub fn bytes_to_human(bytes: u64, units: UnitSystem) -> String {
    let (k, labels) = match units {
        UnitSystem::Decimal => (1000u64, ["KB", "MB", "GB", "TB"]),
        UnitSystem::Binary => (1024u64, ["KiB", "MiB", "GiB", "TiB"]),
    };
    let kb = k;
    let mb = kb * k;
    let gb = mb * k;
    let tb = gb * k;

    if bytes >= tb {
        format!("{:.2} {}", bytes as f64 / tb as f64, labels[3])
    } else if bytes >= gb {
        format!("{:.2} {}", bytes as f64 / gb as f64, labels[2])
    } else if bytes >= mb {
        format!("{:.2} {}", bytes as f64 / mb as f64, labels[1])
    } else if bytes >= kb {
        format!("{:.2} {}", bytes as f64 / kb as f64, labels[0])
    } else {
        format!("{} B", bytes)
    }
}

pub fn mbps_to_human(mbps: f64, units: UnitSystem) -> String {
    let (giga, mega) = match units {
        UnitSystem::Decimal => ("Gbit/s", "Mbit/s"),
        UnitSystem::Binary => ("Gibit/s", "Mibit/s"),
    };
    let step = match units {
        UnitSystem::Decimal => 1000.0,
        UnitSystem::Binary => 1024.0,
    };
    if mbps >= step {
        format!("{:.2} {}", mbps / step, giga)
    } else {
        format!("{:.1} {}", mbps, mega)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_resets_accumulator() {
        let rate = RateCounter::new(UnitSystem::Decimal);
        rate.add(1500);
        rate.add(500);
        assert_eq!(rate.pending(), 2000);

        let sample = rate.sample();
        assert_eq!(sample.bytes, 2000);
        assert_eq!(sample.bits(), 16000);
        assert_eq!(rate.pending(), 0);
        assert_eq!(rate.sample().bytes, 0);
    }

    #[test]
    fn test_decimal_and_binary_units() {
        let n = 3_145_728u64;

        let decimal = RateCounter::new(UnitSystem::Decimal);
        decimal.add(n);
        let sample = decimal.sample();
        assert_eq!(sample.megabytes(), n as f64 / 1_000_000.0);
        assert_eq!(sample.megabits(), n as f64 * 8.0 / 1_000_000.0);

        let binary = RateCounter::new(UnitSystem::Binary);
        binary.add(n);
        let sample = binary.sample();
        assert_eq!(sample.megabytes(), 3.0);
        assert_eq!(sample.megabits(), 24.0);
    }

    #[test]
    fn test_concurrent_sampling_loses_no_bytes() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicBool;

        const ADDS: u64 = 1_000_000;
        let rate = Arc::new(RateCounter::new(UnitSystem::Decimal));
        let done = Arc::new(AtomicBool::new(false));

        let sampler = {
            let rate = rate.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut sampled = 0u64;
                while !done.load(Ordering::Acquire) {
                    sampled += rate.sample().bytes;
                }
                sampled
            })
        };

        for _ in 0..ADDS {
            rate.add(3);
        }
        done.store(true, Ordering::Release);

        let sampled = sampler.join().unwrap();
        assert_eq!(sampled + rate.pending(), 3 * ADDS);
    }

    #[test]
    fn test_peak_and_history() {
        let rate = RateCounter::new(UnitSystem::Decimal);
        for bytes in [100, 900, 300] {
            rate.add(bytes);
            rate.sample();
        }
        assert_eq!(rate.peak().bytes, 900);
        let history: Vec<u64> = rate.history().iter().map(|s| s.bytes).collect();
        assert_eq!(history, vec![100, 900, 300]);
    }

    #[test]
    fn test_history_is_bounded() {
        let rate = RateCounter::new(UnitSystem::Decimal);
        for i in 0..(MAX_SAMPLE_HISTORY as u64 + 10) {
            rate.add(i);
            rate.sample();
        }
        let history = rate.history();
        assert_eq!(history.len(), MAX_SAMPLE_HISTORY);
        assert_eq!(history[0].bytes, 10);
    }

    #[test]
    fn test_throughput() {
        let mbps = throughput(1_250_000, Duration::from_secs(1), UnitSystem::Decimal);
        assert_eq!(mbps, 10.0);
        assert_eq!(throughput(100, Duration::ZERO, UnitSystem::Decimal), 0.0);
    }

    #[test]
    fn test_bytes_to_human() {
        assert_eq!(bytes_to_human(500, UnitSystem::Decimal), "500 B");
        assert_eq!(bytes_to_human(1000, UnitSystem::Decimal), "1.00 KB");
        assert_eq!(bytes_to_human(1024, UnitSystem::Binary), "1.00 KiB");
        assert_eq!(bytes_to_human(1024 * 1024, UnitSystem::Binary), "1.00 MiB");
        assert_eq!(bytes_to_human(2_500_000_000, UnitSystem::Decimal), "2.50 GB");
    }

    #[test]
    fn test_mbps_to_human() {
        assert_eq!(mbps_to_human(500.0, UnitSystem::Decimal), "500.0 Mbit/s");
        assert_eq!(mbps_to_human(1500.0, UnitSystem::Decimal), "1.50 Gbit/s");
        assert_eq!(mbps_to_human(2048.0, UnitSystem::Binary), "2.00 Gibit/s");
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("binary".parse::<UnitSystem>(), Ok(UnitSystem::Binary));
        assert_eq!("SI".parse::<UnitSystem>(), Ok(UnitSystem::Decimal));
        assert!("metric".parse::<UnitSystem>().is_err());
    }
}
