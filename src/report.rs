use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::session::driver::RunSummary;
use crate::session::RipenessLabel;

/// Final outcome of one analysis run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub source: String,
    pub sample_rate: u32,
    pub frame_size: usize,
    pub classifier: ClassifierConfig,
    pub frames: usize,
    pub accepted: usize,
    pub silent: usize,
    pub rejected: usize,
    pub discarded: usize,
    pub current_frequency_hz: f64,
    pub max_frequency_hz: f64,
    pub label: RipenessLabel,
}

impl Report {
    pub fn new(
        source: impl Into<String>,
        sample_rate: u32,
        frame_size: usize,
        classifier: ClassifierConfig,
        summary: &RunSummary,
    ) -> Self {
        Self {
            source: source.into(),
            sample_rate,
            frame_size,
            classifier,
            frames: summary.frames,
            accepted: summary.accepted,
            silent: summary.silent,
            rejected: summary.rejected,
            discarded: summary.discarded,
            current_frequency_hz: summary.last_state.current_frequency,
            max_frequency_hz: summary.last_state.max_frequency,
            label: summary.last_state.label,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} ({})\n  peak frequency: {:.1} Hz (last {:.1} Hz)\n  ripe band: {:.1}-{:.1} Hz\n",
            self.label,
            self.label.caption_zh(),
            self.max_frequency_hz,
            self.current_frequency_hz,
            self.classifier.ripe_min_hz,
            self.classifier.ripe_max_hz,
        );
        out.push_str(&format!(
            "  frames: {} analyzed, {} quiet, {} rejected of {}\n",
            self.accepted, self.silent, self.rejected, self.frames
        ));
        if self.discarded > 0 {
            out.push_str(&format!(
                "  {} reading(s) dropped by a restart or stop\n",
                self.discarded
            ));
        }
        if self.accepted == 0 {
            out.push_str(&format!(
                "  no tap was louder than {:.1} dB\n",
                self.classifier.loudness_threshold_db
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RipenessSessionState;

    fn summary(max: f64, label: RipenessLabel) -> RunSummary {
        RunSummary {
            frames: 12,
            accepted: 3,
            silent: 9,
            rejected: 0,
            discarded: 0,
            last_state: RipenessSessionState {
                is_active: true,
                current_frequency: 120.0,
                max_frequency: max,
                label,
            },
        }
    }

    #[test]
    fn json_carries_label_and_frequencies() {
        let report = Report::new(
            "tap.wav",
            44_100,
            4096,
            ClassifierConfig::default(),
            &summary(145.0, RipenessLabel::Ripe),
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["label"], "ripe");
        assert_eq!(value["max_frequency_hz"], 145.0);
        assert_eq!(value["current_frequency_hz"], 120.0);
        assert_eq!(value["classifier"]["ripe_min_hz"], 133.0);
        assert_eq!(value["frames"], 12);
    }

    #[test]
    fn text_mentions_caption() {
        let report = Report::new(
            "mic",
            44_100,
            4096,
            ClassifierConfig::default(),
            &summary(170.0, RipenessLabel::Underripe),
        );
        let text = report.render_text();
        assert!(text.starts_with("underripe (半成熟西瓜)"));
        assert!(text.contains("170.0 Hz"));
        assert!(!text.contains("no tap"));
        assert!(!text.contains("dropped"));
    }

    #[test]
    fn text_explains_empty_run() {
        let empty = RunSummary {
            frames: 4,
            silent: 4,
            ..RunSummary::default()
        };
        let report = Report::new("quiet.wav", 44_100, 4096, ClassifierConfig::default(), &empty);
        let text = report.render_text();
        assert!(text.starts_with("unknown (未知)"));
        assert!(text.contains("no tap was louder than 50.0 dB"));
    }

    #[test]
    fn text_and_json_count_discarded_readings() {
        let interrupted = RunSummary {
            discarded: 2,
            ..summary(145.0, RipenessLabel::Ripe)
        };
        let report = Report::new("mic", 44_100, 4096, ClassifierConfig::default(), &interrupted);
        assert!(report.render_text().contains("2 reading(s) dropped"));

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["discarded"], 2);
    }
}
