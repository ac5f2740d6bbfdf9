//! Layout knowledge of the tracked HUD.
//!
//! Every position the detectors look at is a fraction of the detected screen
//! rectangle, kept here under a version tag so that an alternate HUD can be
//! described in the configuration file instead of in detector code.

use serde::{Deserialize, Serialize};
use vodcut_locator::LocatorSettings;

/// Number of player ports on screen.
pub const PORT_COUNT: usize = 4;

/// Fractional anchor of a per-port element: `(top, left + step * port)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortAnchor {
    pub top: f64,
    pub left: f64,
    pub step: f64,
}

impl PortAnchor {
    pub const fn new(top: f64, left: f64, step: f64) -> Self {
        Self { top, left, step }
    }

    /// `(fy, fx)` of this element for `port`.
    pub fn at(&self, port: usize) -> (f64, f64) {
        (self.top, self.left + self.step * port as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HudLayout {
    pub version: String,
    /// Screen size, in pixels, the percent template was cut from.
    pub reference_height: f64,
    pub reference_width: f64,
    /// Percent sign height as a fraction of the screen height.
    pub percent_height: f64,
    /// Percent sign top edge as a fraction of the screen height.
    pub percent_top: f64,
    /// Expected top-left corner of each port's percent sign.
    pub percent_anchor: PortAnchor,
    /// Side of the percent search window before padding.
    pub percent_window: f64,
    /// Top-left corner of each port's indicator block.
    pub indicator_anchor: PortAnchor,
    pub indicator_height: f64,
    pub indicator_width: f64,
}

impl Default for HudLayout {
    fn default() -> Self {
        Self {
            version: "melee-4p-v1".to_string(),
            reference_height: 411.0,
            reference_width: 548.0,
            percent_height: 0.05835,
            percent_top: 0.871,
            percent_anchor: PortAnchor::new(0.87, 0.2, 0.2381),
            percent_window: 0.06,
            indicator_anchor: PortAnchor::new(0.75, 0.0363, 0.24),
            indicator_height: 0.18,
            indicator_width: 0.1833,
        }
    }
}

impl HudLayout {
    /// Name and value of the first field that cannot describe a layout.
    pub fn invalid_field(&self) -> Option<(&'static str, String)> {
        if self.version.trim().is_empty() {
            return Some(("layout.version", self.version.clone()));
        }
        let positive = [
            ("layout.reference_height", self.reference_height),
            ("layout.reference_width", self.reference_width),
            ("layout.percent_height", self.percent_height),
            ("layout.percent_window", self.percent_window),
            ("layout.indicator_height", self.indicator_height),
            ("layout.indicator_width", self.indicator_width),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Some((field, value.to_string()));
            }
        }
        let finite = [
            ("layout.percent_top", self.percent_top),
            ("layout.percent_anchor.top", self.percent_anchor.top),
            ("layout.percent_anchor.left", self.percent_anchor.left),
            ("layout.percent_anchor.step", self.percent_anchor.step),
            ("layout.indicator_anchor.top", self.indicator_anchor.top),
            ("layout.indicator_anchor.left", self.indicator_anchor.left),
            ("layout.indicator_anchor.step", self.indicator_anchor.step),
        ];
        finite
            .into_iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(field, value)| (field, value.to_string()))
    }
}

/// Sample sizes and search parameters of the calibration stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    pub screen_samples: usize,
    pub port_samples: usize,
    pub overlay_samples: usize,
    pub scale_start: f64,
    pub scale_stop: f64,
    pub scale_step: f64,
    /// Explicit scale list; replaces the start/stop/step range when set.
    pub scales: Option<Vec<f64>>,
    pub screen_clusters: usize,
    pub screen_worst_match: f64,
    pub port_worst_match: f64,
    /// Vertical bucket, in pixels, used to group percent sightings into rows.
    pub row_tolerance: f64,
    pub edge_low: f32,
    pub edge_high: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            screen_samples: 30,
            port_samples: 10,
            overlay_samples: 60,
            scale_start: 0.6,
            scale_stop: 1.1,
            scale_step: 0.03,
            scales: None,
            screen_clusters: 2,
            screen_worst_match: 0.7,
            port_worst_match: 0.6,
            row_tolerance: 5.0,
            edge_low: 50.0,
            edge_high: 200.0,
        }
    }
}

impl SearchSettings {
    pub fn screen_scales(&self) -> Vec<f64> {
        match &self.scales {
            Some(scales) => scales.clone(),
            None => LocatorSettings::scale_range(self.scale_start, self.scale_stop, self.scale_step),
        }
    }

    pub fn screen_locator(&self) -> LocatorSettings {
        LocatorSettings {
            scales: self.screen_scales(),
            max_clusters: self.screen_clusters,
            worst_match: self.screen_worst_match,
        }
    }

    pub fn port_locator(&self, scale: f64) -> LocatorSettings {
        LocatorSettings {
            scales: vec![scale],
            max_clusters: 1,
            worst_match: self.port_worst_match,
        }
    }

    pub fn invalid_field(&self) -> Option<(&'static str, String)> {
        let counts = [
            ("search.screen_samples", self.screen_samples),
            ("search.port_samples", self.port_samples),
            ("search.overlay_samples", self.overlay_samples),
            ("search.screen_clusters", self.screen_clusters),
        ];
        if let Some((field, value)) = counts.into_iter().find(|(_, value)| *value == 0) {
            return Some((field, value.to_string()));
        }
        let scales = self.screen_scales();
        if scales.is_empty() || scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Some(("search.scales", format!("{scales:?}")));
        }
        if !(0.0..=1.0).contains(&self.screen_worst_match) {
            return Some(("search.screen_worst_match", self.screen_worst_match.to_string()));
        }
        if !(0.0..=1.0).contains(&self.port_worst_match) {
            return Some(("search.port_worst_match", self.port_worst_match.to_string()));
        }
        if !self.row_tolerance.is_finite() || self.row_tolerance <= 0.0 {
            return Some(("search.row_tolerance", self.row_tolerance.to_string()));
        }
        if !(self.edge_low >= 0.0 && self.edge_low <= self.edge_high) {
            return Some(("search.edge_low", self.edge_low.to_string()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        assert_eq!(HudLayout::default().invalid_field(), None);
        assert_eq!(SearchSettings::default().invalid_field(), None);
    }

    #[test]
    fn port_anchor_steps_per_port() {
        let anchor = HudLayout::default().percent_anchor;
        assert_eq!(anchor.at(0), (0.87, 0.2));
        let (_, fx) = anchor.at(3);
        assert!((fx - (0.2 + 3.0 * 0.2381)).abs() < 1e-12);
    }

    #[test]
    fn partial_layout_table_keeps_defaults() {
        let layout: HudLayout = toml::from_str("version = \"custom\"\npercent_top = 0.8\n").unwrap();
        assert_eq!(layout.version, "custom");
        assert_eq!(layout.percent_top, 0.8);
        assert_eq!(layout.reference_width, 548.0);
    }

    #[test]
    fn default_scale_range_matches_search_grid() {
        let scales = SearchSettings::default().screen_scales();
        assert_eq!(scales.len(), 17);
        let explicit = SearchSettings {
            scales: Some(vec![0.5]),
            ..SearchSettings::default()
        };
        assert_eq!(explicit.screen_scales(), vec![0.5]);
    }

    #[test]
    fn zero_sample_count_is_rejected() {
        let search = SearchSettings {
            port_samples: 0,
            ..SearchSettings::default()
        };
        assert_eq!(search.invalid_field().map(|(f, _)| f), Some("search.port_samples"));
    }
}
