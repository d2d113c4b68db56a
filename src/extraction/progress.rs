//! Progress parsing for external archive tools and stage weighting

use std::sync::{LazyLock, Mutex};

use regex::Regex;

/// Share of the extraction stage given to RAR extraction when a nested ISO follows
pub const RAR_STAGE_WEIGHT: f64 = 0.7;

/// Share of the extraction stage given to nested ISO extraction
pub const ISO_STAGE_WEIGHT: f64 = 0.3;

#[allow(clippy::expect_used)]
static RAR_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)%").expect("rar percent regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ISO_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(\d+(?:\.\d+)?)%").expect("iso percent regex is valid") // Static pattern, safe to panic
});

const VOLUME_MARKER: &str = "Extracting from";

/// Tracks overall progress across the volumes of one RAR set
///
/// unrar prints `Extracting from <volume>` when it opens each volume and a
/// per-volume percentage while it works. Overall progress is
/// `floor(((volume - 1) * 100 + percent) / total_volumes)` and is only
/// reported when it strictly increases.
#[derive(Debug)]
pub struct RarProgress {
    total_volumes: u32,
    current_volume: u32,
    last: Option<u8>,
}

impl RarProgress {
    /// Start tracking a set of `total_volumes` volumes
    pub fn new(total_volumes: u32) -> Self {
        Self {
            total_volumes: total_volumes.max(1),
            current_volume: 0,
            last: None,
        }
    }

    /// Volume currently being read (1-based, 0 before the first marker)
    pub fn current_volume(&self) -> u32 {
        self.current_volume
    }

    /// Feed one output segment; returns the new overall progress if it increased
    pub fn feed(&mut self, segment: &str) -> Option<u8> {
        if segment.contains(VOLUME_MARKER) {
            self.current_volume += 1;
            tracing::debug!(
                volume = self.current_volume,
                total = self.total_volumes,
                "rar volume opened"
            );
            return None;
        }

        let caps = RAR_PERCENT.captures(segment)?;
        let percent = caps.get(1)?.as_str().parse::<u64>().ok()?.min(100);

        let volume = u64::from(self.current_volume.clamp(1, self.total_volumes));
        let overall = ((volume - 1) * 100 + percent) / u64::from(self.total_volumes);
        let overall = overall.min(100) as u8;

        advance(&mut self.last, overall)
    }
}

/// Tracks the percentage printed by the ISO tool
#[derive(Debug, Default)]
pub struct IsoProgress {
    last: Option<u8>,
}

impl IsoProgress {
    /// Start tracking
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one output segment; returns the floored percentage if it increased
    pub fn feed(&mut self, segment: &str) -> Option<u8> {
        let caps = ISO_PERCENT.captures(segment)?;
        let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let percent = value.floor().clamp(0.0, 100.0) as u8;

        advance(&mut self.last, percent)
    }
}

fn advance(last: &mut Option<u8>, value: u8) -> Option<u8> {
    match *last {
        Some(previous) if value <= previous => None,
        _ => {
            *last = Some(value);
            Some(value)
        }
    }
}

/// Map RAR progress into the 0-70 part of the extraction stage
pub fn rar_stage_progress(percent: u8) -> u8 {
    (f64::from(percent.min(100)) * RAR_STAGE_WEIGHT).round() as u8
}

/// Map progress of nested ISO `index` (of `count`) into the 70-100 part of the stage
///
/// The band is split evenly between nested images in extraction order.
pub fn iso_stage_progress(percent: u8, index: usize, count: usize) -> u8 {
    let count = count.max(1) as f64;
    let band = ISO_STAGE_WEIGHT * 100.0 / count;
    let start = RAR_STAGE_WEIGHT * 100.0 + band * index as f64;
    let value = start + f64::from(percent.min(100)) * band / 100.0;
    value.round().clamp(0.0, 100.0) as u8
}

/// Forwards progress to a callback only when it strictly increases
pub struct MonotonicReporter<'a> {
    sink: &'a (dyn Fn(u8) + Send + Sync),
    last: Mutex<Option<u8>>,
}

impl<'a> MonotonicReporter<'a> {
    /// Wrap a progress callback
    pub fn new(sink: &'a (dyn Fn(u8) + Send + Sync)) -> Self {
        Self {
            sink,
            last: Mutex::new(None),
        }
    }

    /// Report a value; ignored unless it exceeds everything reported so far
    pub fn report(&self, value: u8) {
        let forward = {
            let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            advance(&mut last, value.min(100))
        };
        if let Some(value) = forward {
            (self.sink)(value);
        }
    }
}

/// Splits a raw output stream into segments
///
/// Archive tools redraw their progress in place with carriage returns and
/// backspaces, so those count as separators alongside newlines. Partial
/// segments are buffered across reads.
#[derive(Debug, Default)]
pub struct SegmentSplitter {
    pending: Vec<u8>,
}

impl SegmentSplitter {
    /// Create an empty splitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of output, calling `on_segment` for every completed segment
    pub fn push(&mut self, chunk: &[u8], mut on_segment: impl FnMut(&str)) {
        for &byte in chunk {
            if matches!(byte, b'\n' | b'\r' | 0x08) {
                self.flush(&mut on_segment);
            } else {
                self.pending.push(byte);
            }
        }
    }

    /// Emit whatever is left once the stream has closed
    pub fn finish(&mut self, mut on_segment: impl FnMut(&str)) {
        self.flush(&mut on_segment);
    }

    fn flush(&mut self, on_segment: &mut impl FnMut(&str)) {
        if self.pending.is_empty() {
            return;
        }
        {
            let segment = String::from_utf8_lossy(&self.pending);
            let trimmed = segment.trim();
            if !trimmed.is_empty() {
                on_segment(trimmed);
            }
        }
        self.pending.clear();
    }
}
