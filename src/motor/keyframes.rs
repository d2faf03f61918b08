// Keyframe timeline for a single servo
//
// Keys are (tick, time) pairs kept in strictly increasing time order.
// Every edit checks ordering up front, so a timeline can always be played
// back without further validation.

use serde::{Deserialize, Serialize};

/// Time gap given to a key appended after the last one (ms)
pub const APPEND_SPACING_MS: u64 = 1000;

/// A commanded position at an offset from animation start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyframe {
    pub tick: u16,
    pub time: u64, // ms
}

impl Keyframe {
    pub fn new(tick: u16, time: u64) -> Self {
        Self { tick, time }
    }
}

/// Error types for timeline edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("Key index {index} out of range (timeline has {len} keys)")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Time {time}ms at key {index} breaks ordering: {reason}")]
    TimeOrderingViolation {
        index: usize,
        time: u64,
        reason: &'static str,
    },

    #[error("No room for a key between {previous}ms and {next}ms")]
    SubdivisionImpossible { previous: u64, next: u64 },

    #[error("No time left for a key after {last}ms")]
    TimeOverflow { last: u64 },
}

pub type Result<T> = std::result::Result<T, TimelineError>;

/// Ordered keyframe sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    keys: Vec<Keyframe>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a timeline from stored keys, rejecting any that are out of order
    pub fn from_keys(keys: Vec<Keyframe>) -> Result<Self> {
        for (index, pair) in keys.windows(2).enumerate() {
            if pair[1].time <= pair[0].time {
                return Err(TimelineError::TimeOrderingViolation {
                    index: index + 1,
                    time: pair[1].time,
                    reason: "must be greater than the previous key",
                });
            }
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the first key, or None when empty
    pub fn first_index(&self) -> Option<usize> {
        if self.keys.is_empty() { None } else { Some(0) }
    }

    /// Index of the last key, or None when empty
    pub fn last_index(&self) -> Option<usize> {
        self.keys.len().checked_sub(1)
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    fn key(&self, index: usize) -> Result<&Keyframe> {
        self.keys.get(index).ok_or(TimelineError::IndexOutOfRange {
            index: index as isize,
            len: self.keys.len(),
        })
    }

    pub fn tick_at(&self, index: usize) -> Result<u16> {
        self.key(index).map(|k| k.tick)
    }

    pub fn time_at(&self, index: usize) -> Result<u64> {
        self.key(index).map(|k| k.time)
    }

    /// Store a tick as-is. Range clamping belongs to the owning motor.
    pub(crate) fn set_tick_raw(&mut self, index: usize, tick: u16) -> Result<()> {
        let len = self.keys.len();
        let key = self.keys.get_mut(index).ok_or(TimelineError::IndexOutOfRange {
            index: index as isize,
            len,
        })?;
        key.tick = tick;
        Ok(())
    }

    /// Rewrite every stored tick through `map`
    pub(crate) fn map_ticks(&mut self, map: impl Fn(u16) -> u16) {
        for key in &mut self.keys {
            key.tick = map(key.tick);
        }
    }

    /// Move a key in time. The new time must sit strictly between its neighbours.
    pub fn set_time(&mut self, index: usize, time: u64) -> Result<()> {
        self.key(index)?;

        if index > 0 && self.keys[index - 1].time >= time {
            return Err(TimelineError::TimeOrderingViolation {
                index,
                time,
                reason: "must be greater than the previous key",
            });
        }
        if let Some(next) = self.keys.get(index + 1) {
            if next.time <= time {
                return Err(TimelineError::TimeOrderingViolation {
                    index,
                    time,
                    reason: "must be less than the next key",
                });
            }
        }

        self.keys[index].time = time;
        Ok(())
    }

    /// Append a key one second after the last one, holding its tick
    pub fn append_key(&mut self) -> Result<usize> {
        let key = match self.keys.last() {
            Some(last) => {
                let time = last
                    .time
                    .checked_add(APPEND_SPACING_MS)
                    .ok_or(TimelineError::TimeOverflow { last: last.time })?;
                Keyframe::new(last.tick, time)
            }
            None => Keyframe::new(0, 0),
        };
        self.keys.push(key);
        Ok(self.keys.len() - 1)
    }

    /// Insert a key halfway between `index - 1` and `index`.
    ///
    /// An index at or past the end appends instead. Index 0 on a non-empty
    /// timeline returns 0 and inserts nothing; negative indices are rejected.
    pub fn insert_key_at(&mut self, index: isize) -> Result<usize> {
        if index < 0 {
            return Err(TimelineError::IndexOutOfRange {
                index,
                len: self.keys.len(),
            });
        }

        let index = index as usize;
        if index >= self.keys.len() {
            return self.append_key();
        }
        if index == 0 {
            return Ok(0);
        }

        let previous = self.keys[index - 1];
        let next = self.keys[index];

        let tick = (next.tick as i32 - previous.tick as i32) / 2 + previous.tick as i32;
        let time = (next.time - previous.time) / 2 + previous.time;

        if time <= previous.time || time >= next.time {
            return Err(TimelineError::SubdivisionImpossible {
                previous: previous.time,
                next: next.time,
            });
        }

        // Midpoint of two u16 ticks always fits back into u16
        self.keys.insert(index, Keyframe::new(tick as u16, time));
        Ok(index)
    }

    pub fn remove_key_at(&mut self, index: usize) -> Result<Keyframe> {
        self.key(index)?;
        Ok(self.keys.remove(index))
    }

    /// Time of the last key, 0 when empty
    pub fn duration(&self) -> u64 {
        self.keys.last().map_or(0, |k| k.time)
    }

    /// Tick commanded at `time` ms into the animation.
    ///
    /// Holds the first tick before the first key and the last tick after the
    /// last key; linearly interpolates in between.
    pub fn tick_at_time(&self, time: u64) -> Option<u16> {
        let first = self.keys.first()?;
        if time <= first.time {
            return Some(first.tick);
        }

        // First key strictly after `time`
        let next_index = self.keys.partition_point(|k| k.time <= time);
        let Some(next) = self.keys.get(next_index) else {
            return self.keys.last().map(|k| k.tick);
        };
        let previous = &self.keys[next_index - 1];

        // u64 spans times a tick delta overflow i64
        let span = (next.time - previous.time) as i128;
        let elapsed = (time - previous.time) as i128;
        let delta = next.tick as i128 - previous.tick as i128;
        Some((previous.tick as i128 + delta * elapsed / span) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_keys() -> Timeline {
        Timeline::from_keys(vec![
            Keyframe::new(300, 0),
            Keyframe::new(350, 1000),
            Keyframe::new(390, 2000),
        ])
        .unwrap()
    }

    fn assert_strictly_ordered(timeline: &Timeline) {
        for pair in timeline.keys().windows(2) {
            assert!(pair[0].time < pair[1].time, "keys out of order: {:?}", pair);
        }
    }

    #[test]
    fn test_empty_indices() {
        let timeline = Timeline::new();
        assert_eq!(timeline.len(), 0);
        assert_eq!(timeline.first_index(), None);
        assert_eq!(timeline.last_index(), None);
    }

    #[test]
    fn test_append_spacing() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.append_key().unwrap(), 0);
        timeline.set_tick_raw(0, 300).unwrap();
        assert_eq!(timeline.append_key().unwrap(), 1);
        assert_eq!(timeline.append_key().unwrap(), 2);

        assert_eq!(timeline.first_index(), Some(0));
        assert_eq!(timeline.last_index(), Some(2));
        assert_eq!(timeline.time_at(2).unwrap(), 2000);
        assert_eq!(timeline.tick_at(2).unwrap(), 300);
    }

    #[test]
    fn test_insert_midpoint() {
        let mut timeline = three_keys();
        assert_eq!(timeline.insert_key_at(1).unwrap(), 1);

        let ticks: Vec<u16> = timeline.keys().iter().map(|k| k.tick).collect();
        let times: Vec<u64> = timeline.keys().iter().map(|k| k.time).collect();
        assert_eq!(ticks, [300, 325, 350, 390]);
        assert_eq!(times, [0, 500, 1000, 2000]);
    }

    #[test]
    fn test_insert_midpoint_before_last() {
        let mut timeline = three_keys();
        assert_eq!(timeline.insert_key_at(2).unwrap(), 2);
        assert_eq!(timeline.tick_at(2).unwrap(), 370);
        assert_eq!(timeline.time_at(2).unwrap(), 1500);
        assert_eq!(timeline.len(), 4);
    }

    #[test]
    fn test_insert_midpoint_descending_ticks() {
        // (300 - 351) / 2 truncates toward zero
        let mut timeline =
            Timeline::from_keys(vec![Keyframe::new(351, 0), Keyframe::new(300, 1000)]).unwrap();
        timeline.insert_key_at(1).unwrap();
        assert_eq!(timeline.tick_at(1).unwrap(), 326);
    }

    #[test]
    fn test_insert_at_zero_is_noop() {
        let mut timeline = three_keys();
        assert_eq!(timeline.insert_key_at(0).unwrap(), 0);
        assert_eq!(timeline, three_keys());
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut timeline = three_keys();
        assert_eq!(timeline.insert_key_at(4).unwrap(), 3);
        assert_eq!(timeline.tick_at(3).unwrap(), 390);
        assert_eq!(timeline.time_at(3).unwrap(), 3000);
    }

    #[test]
    fn test_insert_into_empty() {
        for index in [0, 1, 5] {
            let mut timeline = Timeline::new();
            assert_eq!(timeline.insert_key_at(index).unwrap(), 0);
            assert_eq!(timeline.keys(), &[Keyframe::new(0, 0)]);
        }
    }

    #[test]
    fn test_insert_negative_index() {
        let mut timeline = Timeline::new();
        assert_eq!(
            timeline.insert_key_at(-1),
            Err(TimelineError::IndexOutOfRange { index: -1, len: 0 })
        );

        let mut timeline = three_keys();
        assert!(timeline.insert_key_at(-1).is_err());
        assert_eq!(timeline, three_keys());
    }

    #[test]
    fn test_insert_without_room() {
        let mut timeline = Timeline::new();
        timeline.append_key().unwrap();
        timeline.append_key().unwrap();
        timeline.set_time(1, 1).unwrap();

        let before = timeline.clone();
        assert_eq!(
            timeline.insert_key_at(1),
            Err(TimelineError::SubdivisionImpossible { previous: 0, next: 1 })
        );
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_set_time_single_key() {
        let mut timeline = Timeline::new();
        timeline.append_key().unwrap();
        timeline.set_time(0, 42).unwrap();
        assert_eq!(timeline.time_at(0).unwrap(), 42);
    }

    #[test]
    fn test_set_time_ordering() {
        let mut timeline = three_keys();

        // Equal to or before previous
        assert!(matches!(
            timeline.set_time(1, 0),
            Err(TimelineError::TimeOrderingViolation { index: 1, .. })
        ));
        // Equal to or past next
        assert!(timeline.set_time(1, 2000).is_err());
        assert!(timeline.set_time(1, 2500).is_err());
        assert_eq!(timeline, three_keys());

        timeline.set_time(1, 1999).unwrap();
        timeline.set_time(0, 1998).unwrap();
        assert_strictly_ordered(&timeline);
    }

    #[test]
    fn test_bad_index() {
        let mut timeline = Timeline::new();
        assert!(matches!(
            timeline.set_time(0, 10),
            Err(TimelineError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(timeline.tick_at(0).is_err());
        assert!(timeline.set_tick_raw(0, 1).is_err());

        let mut timeline = three_keys();
        assert!(timeline.time_at(3).is_err());
        assert!(timeline.remove_key_at(3).is_err());
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_remove_key() {
        let mut timeline = three_keys();
        let removed = timeline.remove_key_at(1).unwrap();
        assert_eq!(removed, Keyframe::new(350, 1000));
        assert_eq!(timeline.len(), 2);
        assert_strictly_ordered(&timeline);
    }

    #[test]
    fn test_from_keys_rejects_duplicate_time() {
        let result = Timeline::from_keys(vec![Keyframe::new(300, 0), Keyframe::new(310, 0)]);
        assert!(matches!(
            result,
            Err(TimelineError::TimeOrderingViolation { index: 1, .. })
        ));
    }

    #[test]
    fn test_ordering_survives_mixed_edits() {
        let mut timeline = Timeline::new();
        for _ in 0..4 {
            timeline.append_key().unwrap();
        }
        timeline.insert_key_at(2).unwrap();
        timeline.insert_key_at(1).unwrap();
        let _ = timeline.set_time(3, 0);
        timeline.remove_key_at(0).unwrap();
        timeline.insert_key_at(9).unwrap();
        assert_strictly_ordered(&timeline);
    }

    #[test]
    fn test_tick_at_time() {
        let timeline = three_keys();
        assert_eq!(timeline.tick_at_time(0), Some(300));
        assert_eq!(timeline.tick_at_time(500), Some(325));
        assert_eq!(timeline.tick_at_time(1000), Some(350));
        assert_eq!(timeline.tick_at_time(1500), Some(370));
        assert_eq!(timeline.tick_at_time(5000), Some(390));
        assert_eq!(timeline.duration(), 2000);

        assert_eq!(Timeline::new().tick_at_time(0), None);
    }

    #[test]
    fn test_tick_at_time_holds_before_first_key() {
        let timeline =
            Timeline::from_keys(vec![Keyframe::new(250, 400), Keyframe::new(350, 800)]).unwrap();
        assert_eq!(timeline.tick_at_time(0), Some(250));
        assert_eq!(timeline.tick_at_time(600), Some(300));
    }

    #[test]
    fn test_append_after_latest_time() {
        let mut timeline = Timeline::new();
        timeline.append_key().unwrap();
        timeline.set_time(0, u64::MAX - 10).unwrap();

        assert_eq!(
            timeline.append_key(),
            Err(TimelineError::TimeOverflow { last: u64::MAX - 10 })
        );
        assert_eq!(timeline.len(), 1);
        assert_eq!(
            timeline.insert_key_at(5),
            Err(TimelineError::TimeOverflow { last: u64::MAX - 10 })
        );
    }

    #[test]
    fn test_tick_at_time_wide_span() {
        let timeline =
            Timeline::from_keys(vec![Keyframe::new(0, 0), Keyframe::new(4000, 1 << 63)]).unwrap();
        assert_eq!(timeline.tick_at_time(1 << 62), Some(2000));
        assert_eq!(timeline.tick_at_time(u64::MAX), Some(4000));
    }
}
