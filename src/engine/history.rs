use crate::protocol::LiveSample;

/// Number of slots in the sample history
pub const HISTORY_CAPACITY: usize = 100;

/// Result of recording one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aggregate {
    pub average: LiveSample,
    /// Valid slots over the whole history, `0.0..=1.0`
    pub quality_of_service: f32,
    pub samples_averaged: usize,
}

/// Circular buffer of the last 100 ticks, valid or not
#[derive(Debug, Clone)]
pub struct History {
    slots: [LiveSample; HISTORY_CAPACITY],
    cursor: usize,
    window: usize,
}

impl History {
    /// `window` is clamped to `1..HISTORY_CAPACITY`.
    pub fn new(window: usize) -> Self {
        Self {
            slots: [LiveSample::invalid(); HISTORY_CAPACITY],
            cursor: 0,
            window: window.clamp(1, HISTORY_CAPACITY - 1),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Store `sample` at the cursor, aggregate backwards from it, then
    /// advance the cursor.
    pub fn record(&mut self, sample: LiveSample) -> Aggregate {
        self.slots[self.cursor] = sample;
        let (average, samples_averaged) = self.windowed_average(self.cursor);
        let aggregate = Aggregate {
            average,
            quality_of_service: self.quality_of_service(),
            samples_averaged,
        };
        self.cursor = (self.cursor + 1) % HISTORY_CAPACITY;
        aggregate
    }

    pub fn quality_of_service(&self) -> f32 {
        let valid = self.slots.iter().filter(|s| s.valid).count();
        valid as f32 / HISTORY_CAPACITY as f32
    }

    /// Average over up to `window + 1` slots walking backwards from `start`.
    ///
    /// Instantaneous readings are averaged; daily and lifetime counters and
    /// the status take the maximum; error bits are OR-ed. The walk stops
    /// advancing at the first invalid slot, so only the contiguous run of
    /// valid samples ending at `start` contributes.
    pub fn windowed_average(&self, start: usize) -> (LiveSample, usize) {
        let mut acc = LiveSample::invalid();
        let mut index = start % HISTORY_CAPACITY;
        let mut count = 0usize;

        for _ in 0..=self.window {
            let s = &self.slots[index];
            if !s.valid {
                // index is not moved; every remaining iteration lands here
                continue;
            }

            acc.temperature += s.temperature;
            acc.dc1_voltage += s.dc1_voltage;
            acc.dc2_voltage += s.dc2_voltage;
            acc.dc1_current += s.dc1_current;
            acc.dc2_current += s.dc2_current;
            acc.ac_current += s.ac_current;
            acc.ac_voltage += s.ac_voltage;
            acc.frequency += s.frequency;
            acc.power += s.power;

            acc.error_bits |= s.error_bits;
            acc.energy_today = acc.energy_today.max(s.energy_today);
            acc.energy_total = acc.energy_total.max(s.energy_total);
            acc.runtime_total = acc.runtime_total.max(s.runtime_total);
            acc.status = acc.status.max(s.status);

            index = if index == 0 {
                HISTORY_CAPACITY - 1
            } else {
                index - 1
            };
            count += 1;
        }

        if count > 0 {
            let n = count as f32;
            acc.valid = true;
            acc.temperature /= n;
            acc.dc1_voltage /= n;
            acc.dc2_voltage /= n;
            acc.dc1_current /= n;
            acc.dc2_current /= n;
            acc.ac_current /= n;
            acc.ac_voltage /= n;
            acc.frequency /= n;
            acc.power /= n;
        }

        (acc, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(power: f32) -> LiveSample {
        LiveSample {
            valid: true,
            power,
            temperature: 40.0,
            ac_voltage: 230.0,
            ..LiveSample::default()
        }
    }

    #[test]
    fn empty_history_averages_to_zero() {
        let mut h = History::new(10);
        let agg = h.record(LiveSample::invalid());
        assert_eq!(agg.samples_averaged, 0);
        assert_eq!(agg.average.power, 0.0);
        assert_eq!(agg.quality_of_service, 0.0);
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn averages_window_plus_one_samples() {
        let mut h = History::new(2);
        for power in [100.0, 200.0, 300.0, 400.0] {
            h.record(sample(power));
        }
        // slots 3, 2 and 1
        let (avg, count) = h.windowed_average(3);
        assert_eq!(count, 3);
        assert!((avg.power - 300.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_slot_stops_the_walk() {
        let mut h = History::new(10);
        h.record(sample(1000.0));
        h.record(sample(1000.0));
        h.record(LiveSample::invalid());
        let agg = h.record(sample(100.0));
        assert_eq!(agg.samples_averaged, 1);
        assert!((agg.average.power - 100.0).abs() < 1e-3);
    }

    #[test]
    fn counters_take_maximum_and_faults_accumulate() {
        let mut h = History::new(5);
        h.record(LiveSample {
            energy_today: 2.5,
            energy_total: 100.0,
            status: 2,
            error_bits: 0b01,
            ..sample(10.0)
        });
        let agg = h.record(LiveSample {
            energy_today: 2.4,
            energy_total: 99.0,
            status: 1,
            error_bits: 0b10,
            ..sample(20.0)
        });
        assert_eq!(agg.average.energy_today, 2.5);
        assert_eq!(agg.average.energy_total, 100.0);
        assert_eq!(agg.average.status, 2);
        assert_eq!(agg.average.error_bits, 0b11);
        assert!((agg.average.power - 15.0).abs() < 1e-3);
    }

    #[test]
    fn walk_wraps_below_slot_zero() {
        let mut h = History::new(3);
        for _ in 0..HISTORY_CAPACITY {
            h.record(sample(50.0));
        }
        assert_eq!(h.cursor(), 0);
        let agg = h.record(sample(90.0));
        // slot 0 plus 99, 98, 97
        assert_eq!(agg.samples_averaged, 4);
        assert!((agg.average.power - 60.0).abs() < 1e-3);
    }

    #[test]
    fn quality_of_service_counts_valid_slots() {
        // 37 * tick mod 100 visits every residue once, so 37 ticks are valid
        let is_valid = |tick: usize| (37 * tick) % HISTORY_CAPACITY < 37;

        let mut h = History::new(10);
        let mut last = Aggregate::default();
        for tick in 0..HISTORY_CAPACITY {
            let s = if is_valid(tick) {
                sample(1.0)
            } else {
                LiveSample::invalid()
            };
            last = h.record(s);
        }
        assert!(is_valid(0) && !is_valid(1) && is_valid(3));
        assert!((last.quality_of_service - 0.37).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&last.quality_of_service));
    }

    #[test]
    fn quality_of_service_drops_as_valid_slots_are_overwritten() {
        let is_valid = |tick: usize| tick % 3 == 0;

        let mut h = History::new(10);
        let mut qos = 0.0;
        for tick in 0..HISTORY_CAPACITY {
            let s = if is_valid(tick) {
                sample(1.0)
            } else {
                LiveSample::invalid()
            };
            qos = h.record(s).quality_of_service;
        }
        assert!((qos - 0.34).abs() < 1e-6);

        for tick in 0..HISTORY_CAPACITY {
            let before = qos;
            qos = h.record(LiveSample::invalid()).quality_of_service;
            if is_valid(tick) {
                assert!((before - qos - 0.01).abs() < 1e-6, "tick {}", tick);
            } else {
                assert_eq!(qos, before, "tick {}", tick);
            }
        }
        assert_eq!(qos, 0.0);
    }

    #[test]
    fn window_is_clamped() {
        assert_eq!(History::new(0).window(), 1);
        assert_eq!(History::new(500).window(), HISTORY_CAPACITY - 1);
    }
}
