//! tempo.rs
//!
//! Tick → seconds → frame conversion under piecewise tempo changes.
//!
//! A MIDI tempo event says how many microseconds one quarter note lasts *from that point
//! on*. So the time elapsed up to a tempo change is always computed with the tempo that
//! was active before it. We precompute that elapsed time once per breakpoint, which turns
//! every later conversion into: find the breakpoint, add the residual ticks at its tempo.

use crate::error::{AnimError, Result};

/// 500,000 µs per quarter note = 120 BPM, the MIDI default when a file sets no tempo.
pub const DEFAULT_US_PER_QN: u32 = 500_000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoBreakpoint {
    /// Absolute tick where this tempo starts.
    pub tick: u64,
    pub us_per_qn: u32,
    /// Seconds elapsed from tick 0 up to `tick`.
    pub cumulative_secs: f64,
}

impl TempoBreakpoint {
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.us_per_qn as f64
    }
}

/// Ordered tempo breakpoints plus the file's PPQ. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoMap {
    ppq: u32,
    breakpoints: Vec<TempoBreakpoint>,
}

impl TempoMap {
    /// Build the map from `(ticks since previous tempo event, µs per quarter)` pairs.
    ///
    /// The first breakpoint always sits at tick 0 with the default tempo; a tempo event
    /// on the same tick as the last breakpoint replaces its tempo instead of adding a
    /// zero-length segment. Tempo values of 0 are skipped, their delta still counts.
    pub fn new(ppq: u32, changes: &[(u32, u32)]) -> Result<Self> {
        if ppq == 0 {
            return Err(AnimError::Configuration("PPQ must be greater than 0".into()));
        }

        let mut breakpoints = vec![TempoBreakpoint {
            tick: 0,
            us_per_qn: DEFAULT_US_PER_QN,
            cumulative_secs: 0.0,
        }];
        let mut tick: u64 = 0;

        for &(delta, us_per_qn) in changes {
            tick += delta as u64;
            if us_per_qn == 0 {
                continue;
            }
            let last = breakpoints.len() - 1;
            let prev = breakpoints[last];
            if prev.tick == tick {
                breakpoints[last].us_per_qn = us_per_qn;
                continue;
            }
            let cumulative_secs = prev.cumulative_secs + secs_for(tick - prev.tick, prev.us_per_qn, ppq);
            breakpoints.push(TempoBreakpoint { tick, us_per_qn, cumulative_secs });
        }

        Ok(Self { ppq, breakpoints })
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn breakpoints(&self) -> &[TempoBreakpoint] {
        &self.breakpoints
    }

    /// Tempo in effect at `tick`.
    pub fn breakpoint_at(&self, tick: u64) -> &TempoBreakpoint {
        // breakpoints[0].tick == 0, so at least one entry satisfies the predicate
        let idx = self.breakpoints.partition_point(|b| b.tick <= tick);
        &self.breakpoints[idx - 1]
    }

    /// Absolute seconds at an absolute tick position.
    pub fn seconds(&self, tick: u64) -> f64 {
        if tick == 0 {
            return 0.0;
        }
        let bp = self.breakpoint_at(tick);
        bp.cumulative_secs + secs_for(tick - bp.tick, bp.us_per_qn, self.ppq)
    }
}

fn secs_for(ticks: u64, us_per_qn: u32, ppq: u32) -> f64 {
    ticks as f64 * (us_per_qn as f64 / 1_000_000.0 / ppq as f64)
}

/// Tempo map bound to a target frame rate: the time converter used during dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameClock {
    tempo: TempoMap,
    framerate: u32,
}

impl FrameClock {
    pub fn new(tempo: TempoMap, framerate: u32) -> Result<Self> {
        if framerate == 0 {
            return Err(AnimError::Configuration("frame rate must be greater than 0".into()));
        }
        Ok(Self { tempo, framerate })
    }

    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }

    pub fn framerate(&self) -> u32 {
        self.framerate
    }

    /// Frame number (fractional) of an absolute tick position. Monotone in `tick`.
    pub fn frame(&self, tick: u64) -> f64 {
        self.tempo.seconds(tick) * self.framerate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn no_tempo_events_means_120_bpm() {
        let map = TempoMap::new(480, &[]).unwrap();
        assert_eq!(map.breakpoints().len(), 1);
        assert_eq!(map.breakpoints()[0].us_per_qn, DEFAULT_US_PER_QN);
        assert_close(map.breakpoints()[0].bpm(), 120.0);

        let clock = FrameClock::new(map, 30).unwrap();
        assert_close(clock.frame(0), 0.0);
        assert_close(clock.frame(480), 15.0);
    }

    #[test]
    fn default_tempo_matches_closed_form() {
        let ppq = 96u32;
        let fps = 25u32;
        let clock = FrameClock::new(TempoMap::new(ppq, &[]).unwrap(), fps).unwrap();
        for t in [1u64, 7, 96, 1000, 123_457] {
            let expected = t as f64 * 500_000.0 / (1_000_000.0 * ppq as f64) * fps as f64;
            assert_close(clock.frame(t), expected);
        }
    }

    #[test]
    fn tempo_change_is_not_retroactive() {
        let map = TempoMap::new(480, &[(960, 300_000)]).unwrap();
        assert_eq!(map.breakpoints().len(), 2);
        // two quarters at the default tempo before the change
        assert_close(map.breakpoints()[1].cumulative_secs, 1.0);

        let clock = FrameClock::new(map, 30).unwrap();
        assert_close(clock.frame(960), 30.0);
        assert_close(clock.frame(480), 15.0);
        // one more quarter at 300,000 µs
        assert_close(clock.frame(1440), 39.0);
    }

    #[test]
    fn tempo_at_tick_zero_replaces_default() {
        let map = TempoMap::new(480, &[(0, 1_000_000), (480, 250_000)]).unwrap();
        let bps = map.breakpoints();
        assert_eq!(bps.len(), 2);
        assert_eq!(bps[0].us_per_qn, 1_000_000);
        assert_close(bps[1].cumulative_secs, 1.0);
        assert_close(map.seconds(960), 1.25);
    }

    #[test]
    fn zero_tempo_is_skipped_but_delta_counts() {
        let map = TempoMap::new(480, &[(480, 0), (480, 250_000)]).unwrap();
        let bps = map.breakpoints();
        assert_eq!(bps.len(), 2);
        assert_eq!(bps[1].tick, 960);
        assert_close(bps[1].cumulative_secs, 1.0);
    }

    #[test]
    fn frames_are_monotone() {
        let map = TempoMap::new(
            120,
            &[(0, 400_000), (100, 900_000), (37, 120_000), (500, 2_000_000), (1, 333_333)],
        )
        .unwrap();
        let clock = FrameClock::new(map, 24).unwrap();
        let mut last = clock.frame(0);
        for t in 1..2_000u64 {
            let f = clock.frame(t);
            assert!(f >= last, "frame({t}) = {f} < {last}");
            last = f;
        }
    }

    #[test]
    fn zero_ppq_is_a_configuration_error() {
        let err = TempoMap::new(0, &[]).unwrap_err();
        assert!(matches!(err, AnimError::Configuration(_)));
    }

    #[test]
    fn zero_framerate_is_a_configuration_error() {
        let map = TempoMap::new(480, &[]).unwrap();
        let err = FrameClock::new(map, 0).unwrap_err();
        assert!(matches!(err, AnimError::Configuration(_)));
    }
}
