//! Windowed telemetry aggregation.
//!
//! Numeric samples arrive at irregular intervals, keyed by series name.
//! For display they are re-bucketed into fixed-width time slots over a
//! sliding look-back window. The re-bucketing is done from scratch on
//! every render rather than maintained incrementally; window sizes are
//! tens of slots and ingest rates are low, so recomputing is cheap and
//! sidesteps the slot-shifting bugs an incremental scheme invites.

use std::collections::VecDeque;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Default look-back span: 60 seconds.
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

/// Default slot width: 5 seconds.
pub const DEFAULT_SLOT_MS: i64 = 5_000;

/// One telemetry reading. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Samples for one series, insertion order = time order per series
/// (assumed, not enforced; a late sample is tolerated and simply takes
/// effect on the next render).
#[derive(Debug, Clone)]
struct SeriesBuffer {
    name: String,
    samples: VecDeque<Sample>,
}

/// Aligned per-series view over the current window, one value per slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesView {
    pub name: String,
    /// One entry per slot label; `None` is a gap, never zero.
    pub values: Vec<Option<f64>>,
}

/// The fully derived view handed to renderers. Recomputed per render,
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowView {
    /// Slot start times, epoch milliseconds, ascending.
    pub slot_starts: Vec<i64>,
    /// Formatted time-of-day label per slot start.
    pub slot_labels: Vec<String>,
    pub series: Vec<SeriesView>,
    /// Suggested y-axis bounds `(min, max)` over all present values,
    /// padded; `None` when the window holds no values.
    pub bounds: Option<(f64, f64)>,
}

impl WindowView {
    /// Render the view as CSV: a `Timestamp,<series...>` header and one
    /// row per slot, with an empty cell for each gap.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("Timestamp");
        for series in &self.series {
            csv.push(',');
            csv.push_str(&series.name);
        }
        csv.push('\n');

        for (i, label) in self.slot_labels.iter().enumerate() {
            csv.push_str(label);
            for series in &self.series {
                csv.push(',');
                if let Some(value) = series.values.get(i).copied().flatten() {
                    csv.push_str(&value.to_string());
                }
            }
            csv.push('\n');
        }
        csv
    }
}

/// Rolling multi-series sample store with fixed-slot rendering.
#[derive(Debug, Clone)]
pub struct TelemetryWindow {
    window_ms: i64,
    slot_ms: i64,
    /// Offset slot labels are formatted in.
    label_offset: UtcOffset,
    /// Insertion order is stable so series keep their color assignment.
    series: Vec<SeriesBuffer>,
}

impl Default for TelemetryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS, DEFAULT_SLOT_MS)
    }
}

impl TelemetryWindow {
    /// Create a window with the given look-back span and slot width.
    ///
    /// Labels use the local time offset when it can be determined, UTC
    /// otherwise.
    pub fn new(window_ms: i64, slot_ms: i64) -> Self {
        Self::with_offset(
            window_ms,
            slot_ms,
            UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        )
    }

    /// Create a window that formats labels in an explicit offset.
    pub fn with_offset(window_ms: i64, slot_ms: i64, label_offset: UtcOffset) -> Self {
        Self {
            window_ms: window_ms.max(1),
            slot_ms: slot_ms.max(1),
            label_offset,
            series: Vec::new(),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    pub fn slot_ms(&self) -> i64 {
        self.slot_ms
    }

    /// Append a sample using the wall clock for eviction.
    pub fn ingest(&mut self, series: &str, timestamp_ms: i64, value: f64) {
        self.ingest_at(series, timestamp_ms, value, now_ms());
    }

    /// Append a sample to `series` (creating the buffer on first use) and
    /// evict entries older than `now - window - slot`. The extra slot of
    /// grace keeps boundary samples available for the last-in-slot rule.
    pub fn ingest_at(&mut self, series: &str, timestamp_ms: i64, value: f64, now_ms: i64) {
        let index = match self.series.iter().position(|b| b.name == series) {
            Some(index) => index,
            None => {
                self.series.push(SeriesBuffer {
                    name: series.to_string(),
                    samples: VecDeque::new(),
                });
                self.series.len() - 1
            }
        };
        self.series[index].samples.push_back(Sample { timestamp_ms, value });

        let cutoff = now_ms - self.window_ms - self.slot_ms;
        for buffer in &mut self.series {
            while buffer.samples.front().is_some_and(|s| s.timestamp_ms < cutoff) {
                buffer.samples.pop_front();
            }
        }
    }

    /// Derive the current view using the wall clock.
    pub fn render(&self) -> WindowView {
        self.render_at(now_ms())
    }

    /// Derive the view for a given instant. Pure with respect to the
    /// buffers: repeated calls with the same `now_ms` yield the same view.
    ///
    /// Slot boundaries sit at every multiple of the slot width between
    /// `floor((now - window) / slot)` and `floor(now / slot)` inclusive.
    /// A slot takes the value of the chronologically last sample in
    /// `(start, start + slot]`: a sample exactly on a boundary belongs
    /// to the slot it closes.
    pub fn render_at(&self, now_ms: i64) -> WindowView {
        let window_start = (now_ms - self.window_ms).div_euclid(self.slot_ms) * self.slot_ms;
        let window_end = now_ms.div_euclid(self.slot_ms) * self.slot_ms;

        let mut slot_starts = Vec::new();
        let mut t = window_start;
        while t <= window_end {
            slot_starts.push(t);
            t += self.slot_ms;
        }

        let slot_labels = slot_starts.iter().map(|&s| self.format_label(s)).collect();

        let mut series = Vec::with_capacity(self.series.len());
        for buffer in &self.series {
            let mut values = vec![None; slot_starts.len()];
            for sample in &buffer.samples {
                // The covering slot start k*slot satisfies k*slot < ts <= (k+1)*slot.
                let slot_start = (sample.timestamp_ms - 1).div_euclid(self.slot_ms) * self.slot_ms;
                if slot_start < window_start || slot_start > window_end {
                    continue;
                }
                let index = ((slot_start - window_start) / self.slot_ms) as usize;
                values[index] = Some(sample.value);
            }
            series.push(SeriesView { name: buffer.name.clone(), values });
        }

        let bounds = suggested_bounds(&series);

        WindowView { slot_starts, slot_labels, series, bounds }
    }

    /// Reconfigure window and slot sizes. Buffers are left untouched and
    /// trimmed naturally on the next ingest.
    pub fn set_window(&mut self, window_ms: i64, slot_ms: i64) {
        self.window_ms = window_ms.max(1);
        self.slot_ms = slot_ms.max(1);
    }

    /// Drop all buffered samples and series.
    pub fn reset(&mut self) {
        self.series.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|b| b.samples.is_empty())
    }

    /// Series names in stable insertion order.
    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|b| b.name.as_str())
    }

    fn format_label(&self, slot_start_ms: i64) -> String {
        let format = format_description!("[hour]:[minute]:[second]");
        OffsetDateTime::from_unix_timestamp(slot_start_ms.div_euclid(1000))
            .map(|t| t.to_offset(self.label_offset))
            .ok()
            .and_then(|t| t.format(&format).ok())
            .unwrap_or_else(|| slot_start_ms.to_string())
    }
}

/// Padded `(min, max)` over all present values, or `None` when empty.
fn suggested_bounds(series: &[SeriesView]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for view in series {
        for value in view.values.iter().flatten() {
            min = min.min(*value);
            max = max.max(*value);
            any = true;
        }
    }
    if !any {
        return None;
    }
    let pad = if max == min { 1.0 } else { 0.1 * (max - min) };
    Some((min - pad, max + pad))
}

/// Current wall-clock time, epoch milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
