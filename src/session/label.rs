use serde::Serialize;
use std::fmt;

use crate::config::ClassifierConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RipenessLabel {
    #[default]
    Unknown,
    Ripe,
    /// Peak below the ripe band.
    Overripe,
    /// Peak above the ripe band.
    Underripe,
}

impl RipenessLabel {
    /// Caption shown by the original watermelon app.
    pub fn caption_zh(&self) -> &'static str {
        match self {
            RipenessLabel::Unknown => "未知",
            RipenessLabel::Ripe => "成熟西瓜",
            RipenessLabel::Overripe => "过熟西瓜",
            RipenessLabel::Underripe => "半成熟西瓜",
        }
    }
}

impl fmt::Display for RipenessLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RipenessLabel::Unknown => "unknown",
            RipenessLabel::Ripe => "ripe",
            RipenessLabel::Overripe => "overripe",
            RipenessLabel::Underripe => "underripe",
        };
        f.write_str(name)
    }
}

/// Maps a session's running maximum onto a label.
///
/// Bands are contiguous over `(0, inf)` and the ripe band includes both
/// edges. Lower peaks read as overripe, higher ones as underripe.
pub fn classify(max_frequency_hz: f64, bands: &ClassifierConfig) -> RipenessLabel {
    if max_frequency_hz.is_nan() || max_frequency_hz <= 0.0 {
        return RipenessLabel::Unknown;
    }
    if max_frequency_hz < bands.ripe_min_hz {
        RipenessLabel::Overripe
    } else if max_frequency_hz > bands.ripe_max_hz {
        RipenessLabel::Underripe
    } else {
        RipenessLabel::Ripe
    }
}
