//! Time-series playback
//!
//! Playback time is in milliseconds. Each frame-normalized tick moves `now`
//! forward by `speed · 1000`; points within `window` of `now` (or without a
//! timestamp at all) are visible.

use crate::effects::frames;

use super::DataPoint;

/// Default visibility half-width in milliseconds
pub const DEFAULT_WINDOW_MS: f64 = 1000.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesPlayer {
    start: f64,
    end: f64,
    now: f64,
    pub speed: f64,
    pub looping: bool,
    pub window: f64,
    playing: bool,
}

impl TimeSeriesPlayer {
    pub fn new(start: f64, end: f64) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self {
            start,
            end,
            now: start,
            speed: 1.0,
            looping: true,
            window: DEFAULT_WINDOW_MS,
            playing: true,
        }
    }

    /// Player spanning the timestamps of `points`, or `None` if none carry one
    pub fn spanning(points: &[DataPoint]) -> Option<Self> {
        let mut stamps = points.iter().filter_map(|p| p.timestamp);
        let first = stamps.next()?;
        let (start, end) = stamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Some(Self::new(start, end))
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_window(mut self, window: f64) -> Self {
        self.window = window;
        self
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        if self.now >= self.end && !self.looping {
            self.now = self.start;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Jump to `time`, clamped into the playback range
    pub fn seek(&mut self, time: f64) {
        self.now = time.clamp(self.start, self.end);
    }

    /// Advance playback; returns the new `now`
    pub fn advance(&mut self, dt: f32) -> f64 {
        if !self.playing {
            return self.now;
        }
        self.now += self.speed * 1000.0 * frames(dt) as f64;
        if self.now > self.end {
            if self.looping {
                self.now = self.start;
            } else {
                self.now = self.end;
                self.playing = false;
                log::debug!("Time series playback reached its end");
            }
        }
        self.now
    }

    pub fn is_visible(&self, point: &DataPoint) -> bool {
        match point.timestamp {
            None => true,
            Some(t) => (t - self.now).abs() < self.window,
        }
    }

    /// Indices of the points visible at `now`
    pub fn visible_indices(&self, points: &[DataPoint]) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| self.is_visible(p))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_math::Vec3;

    fn stamped(t: f64) -> DataPoint {
        DataPoint::new(Vec3::X, 1.0).with_timestamp(t)
    }

    #[test]
    fn test_advance_per_frame() {
        let mut player = TimeSeriesPlayer::new(0.0, 10_000.0).with_speed(2.0);
        let now = player.advance(1.0 / 60.0);
        assert!((now - 2000.0).abs() < 1e-3);
    }

    #[test]
    fn test_loops_back_to_start() {
        let mut player = TimeSeriesPlayer::new(100.0, 2000.0);
        player.advance(1.0 / 60.0);
        player.advance(1.0 / 60.0);
        assert_eq!(player.now(), 100.0);
        assert!(player.is_playing());
    }

    #[test]
    fn test_stops_without_loop() {
        let mut player = TimeSeriesPlayer::new(0.0, 1500.0).with_looping(false);
        player.advance(1.0 / 60.0);
        player.advance(1.0 / 60.0);
        assert_eq!(player.now(), 1500.0);
        assert!(!player.is_playing());
        assert_eq!(player.advance(1.0 / 60.0), 1500.0);

        player.play();
        assert_eq!(player.now(), 0.0);
    }

    #[test]
    fn test_visibility_window() {
        let mut player = TimeSeriesPlayer::new(0.0, 10_000.0);
        player.seek(5000.0);
        let points = vec![
            stamped(4500.0),
            stamped(3900.0),
            DataPoint::new(Vec3::Y, 1.0),
            stamped(5999.0),
            stamped(6000.0),
        ];
        assert_eq!(player.visible_indices(&points), vec![0, 2, 3]);
    }

    #[test]
    fn test_spanning() {
        let points = vec![stamped(300.0), DataPoint::new(Vec3::Z, 1.0), stamped(-20.0)];
        let player = TimeSeriesPlayer::spanning(&points).unwrap();
        assert_eq!((player.start(), player.end(), player.now()), (-20.0, 300.0, -20.0));
        assert!(TimeSeriesPlayer::spanning(&[DataPoint::new(Vec3::Z, 1.0)]).is_none());
    }
}
