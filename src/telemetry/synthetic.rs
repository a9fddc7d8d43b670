use rand::Rng;

use super::aggregate::{summarize_basic, BasicStats};
use super::{DataPoint, Outcome, SeriesReport, Status, HOUR_MS};

/// Every synthetic series has exactly this many points.
pub const SYNTHETIC_POINTS: i64 = 100;

const WARNING_ABOVE_MS: u32 = 200;

/// Fabricate a plausible series for `entity_id` covering the last `hours`
/// hours before `now_ms`.
///
/// The shape is fixed (uniform spacing, slow sine wave); only the per-point
/// base level is random. Generated points are never written to the store.
pub fn generate<R: Rng>(entity_id: &str, hours: i64, now_ms: i64, rng: &mut R) -> SeriesReport {
    let interval = hours * HOUR_MS / SYNTHETIC_POINTS;

    let data: Vec<DataPoint> = (0..SYNTHETIC_POINTS)
        .map(|i| {
            let base: f64 = 50.0 + rng.gen_range(0.0..100.0);
            let ms = (base + (i as f64 / 10.0).sin() * 20.0).round().max(0.0) as u32;
            DataPoint {
                timestamp: now_ms - (SYNTHETIC_POINTS - i) * interval,
                latency_ms: Outcome::Ok(ms),
                status: if ms > WARNING_ABOVE_MS {
                    Status::Warning
                } else {
                    Status::Success
                },
            }
        })
        .collect();

    let latencies: Vec<u32> = data.iter().filter_map(|p| p.latency_ms.latency()).collect();
    let stats = summarize_basic(&latencies).unwrap_or(BasicStats::ZERO);

    SeriesReport {
        entity_id: entity_id.to_owned(),
        data,
        stats,
        synthetic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn day_series_shape() {
        let now = 1_760_000_000_000;
        let mut rng = StdRng::seed_from_u64(42);
        let report = generate("binance-tokyo", 24, now, &mut rng);

        assert!(report.synthetic);
        assert_eq!(report.data.len(), 100);
        assert!(report.data.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        let interval = 24 * HOUR_MS / 100;
        assert_eq!(report.data[0].timestamp, now - 24 * HOUR_MS);
        assert_eq!(report.data[99].timestamp, now - interval);
        assert!(now - report.data[99].timestamp <= interval);
    }

    #[test]
    fn values_stay_in_model_band() {
        let mut rng = StdRng::seed_from_u64(1);
        let report = generate("x", 1, 0, &mut rng);
        for p in &report.data {
            let ms = p.latency_ms.latency().unwrap();
            // 50..150 base, +/-20 wave
            assert!((30..=170).contains(&ms), "{ms} out of band");
            assert_eq!(p.status, Status::Success);
        }
    }

    #[test]
    fn stats_match_shared_summary() {
        let mut rng = StdRng::seed_from_u64(9);
        let report = generate("x", 168, 10_000_000_000, &mut rng);
        let lat: Vec<u32> = report.data.iter().filter_map(|p| p.latency_ms.latency()).collect();

        assert_eq!(report.stats, summarize_basic(&lat).unwrap());
        assert_eq!(report.stats.min, *lat.iter().min().unwrap());
        assert_eq!(report.stats.max, *lat.iter().max().unwrap());
    }
}
