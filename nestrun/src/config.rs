use serde::{Deserialize, Serialize};

use sheetnest::io::svg::SvgDrawOptions;

/// Configuration for the nestrun CLI
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RunConfig {
    /// Max deviation of flattened curves from the true path, in mm
    pub flatten_tolerance: f64,
    /// Wall-clock budget for a shape-aware run in milliseconds. If undefined, the run goes to completion
    pub time_limit_ms: Option<u64>,
    /// Optional SVG drawing options
    #[serde(default)]
    pub svg_draw_options: SvgDrawOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            flatten_tolerance: 0.1,
            time_limit_ms: None,
            svg_draw_options: SvgDrawOptions::default(),
        }
    }
}
