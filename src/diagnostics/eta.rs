use std::fmt;

use time::{macros::format_description, Duration, OffsetDateTime};

// Allowance for per-frame work the frame timings don't capture.
const FUDGE_FACTOR: f64 = 1.03;

/// Wall-clock durations of the frames run so far, starting at `start_frame`.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    start_frame: usize,
    times: Vec<f64>,
}

impl SimClock {
    pub fn new(start_frame: usize) -> Self {
        SimClock {
            start_frame,
            times: Vec::new(),
        }
    }

    pub fn record(&mut self, seconds: f64) {
        self.times.push(seconds);
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn elapsed(&self) -> f64 {
        self.times.iter().sum()
    }

    pub fn time_left(
        &self,
        frame: usize,
        num_frames: usize,
        invert_m_every: usize,
        discount_warmup: bool,
    ) -> TimeLeft {
        calculate_time_left(
            &self.times,
            frame,
            num_frames,
            invert_m_every,
            self.start_frame,
            discount_warmup,
        )
    }
}

/// Markers that the estimate is probably too low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EtaFlags {
    // Only one long frame so far, and it includes warm-up.
    pub warmup_not_discounted: bool,
    pub no_short_times_yet: bool,
}

impl fmt::Display for EtaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.warmup_not_discounted {
            write!(f, "<")?;
        }
        if self.no_short_times_yet {
            write!(f, "<")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLeft {
    pub seconds: f64,
    pub flags: EtaFlags,
}

/// Estimates the wall-clock time left, in seconds.
///
/// Frames where the far-field matrix is regenerated (`i % invert_m_every ==
/// 0`, plus the first frame of the run) are "long"; the rest are "short".
/// Each class is averaged separately. With `discount_warmup` the first long
/// frame is left out of its average as soon as there is another. `times[k]`
/// is the duration of frame `start_frame + k`.
pub fn calculate_time_left(
    times: &[f64],
    frame: usize,
    num_frames: usize,
    invert_m_every: usize,
    start_frame: usize,
    discount_warmup: bool,
) -> TimeLeft {
    let every = invert_m_every.max(1);
    let is_long = |i: usize| i % every == 0 || i == start_frame;
    let history: Vec<(usize, f64)> = (start_frame..=frame)
        .filter_map(|i| times.get(i - start_frame).map(|t| (i, *t)))
        .collect();
    let (long, short): (Vec<_>, Vec<_>) = history.iter().partition(|(i, _)| is_long(*i));
    let long_times: Vec<f64> = long.iter().map(|(_, t)| *t).collect();
    let short_times: Vec<f64> = short.iter().map(|(_, t)| *t).collect();

    let mut flags = EtaFlags::default();
    let long_average = match (discount_warmup, long_times.len()) {
        (_, 0) => 0.0,
        (true, 1) => {
            flags.warmup_not_discounted = true;
            long_times[0]
        }
        (true, n) => long_times[1..].iter().sum::<f64>() / (n - 1) as f64,
        (false, n) => long_times.iter().sum::<f64>() / n as f64,
    };
    let short_average = if short_times.is_empty() {
        long_average
    } else {
        short_times.iter().sum::<f64>() / short_times.len() as f64
    };

    let remaining = frame + 1..num_frames;
    let long_left = remaining.clone().filter(|i| i % every == 0).count();
    let short_left = remaining.len() - long_left;

    flags.no_short_times_yet = frame == start_frame && short_left > 0;

    TimeLeft {
        seconds: (short_left as f64 * short_average + long_left as f64 * long_average)
            * FUDGE_FACTOR,
        flags,
    }
}

pub fn format_elapsed_time(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (d, h, m, s) = (total / 86400, total % 86400 / 3600, total % 3600 / 60, total % 60);
    if d > 0 {
        format!("{}d {}h {}m", d, h, m)
    } else if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else {
        format!("{}m {}s", m, s)
    }
}

impl TimeLeft {
    /// Colour-coded by magnitude for terminal display.
    pub fn format_time_left(&self) -> String {
        let start_color = if self.seconds > 86400.0 {
            "\x1b[94m"
        } else if self.seconds > 18000.0 {
            "\x1b[95m"
        } else if self.seconds > 3600.0 {
            "\x1b[91m"
        } else if self.seconds > 600.0 {
            "\x1b[93m"
        } else {
            "\x1b[92m"
        };
        format!(
            "{}{}{}\x1b[0m",
            start_color,
            self.flags,
            format_elapsed_time(self.seconds)
        )
    }

    /// Finish time counted from `now`: just the time on the same day, the
    /// weekday within a week, otherwise the full date.
    pub fn format_finish_time(&self, now: OffsetDateTime) -> String {
        let finish = now + Duration::seconds_f64(self.seconds.max(0.0));
        let formatted = if finish.date() == now.date() {
            finish.format(format_description!("[hour]:[minute]"))
        } else if (finish.date() - now.date()).whole_days() < 7 {
            finish.format(format_description!("[weekday repr:short] [hour]:[minute]"))
        } else {
            finish.format(format_description!(
                "[day]/[month]/[year repr:last_two] [hour]:[minute]"
            ))
        };
        format!("{}{}", self.flags, formatted.unwrap_or_default())
    }
}
