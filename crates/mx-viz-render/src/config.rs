use serde::Deserialize;
use std::path::Path;

use crate::color::Color;

/// Top-level visualization configuration (YAML or programmatic).
///
/// Every section is optional in YAML; missing keys keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub figure: FigureConfig,
    pub font: FontConfig,
    pub axes: AxesConfig,
    pub grid: GridConfig,
    pub palette: String,
    pub colors: ColorsConfig,
    pub pretrends: PretrendsConfig,
    pub event_study: EventStudyConfig,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            figure: FigureConfig::default(),
            font: FontConfig::default(),
            axes: AxesConfig::default(),
            grid: GridConfig::default(),
            palette: "tableau10".into(),
            colors: ColorsConfig::default(),
            pretrends: PretrendsConfig::default(),
            event_study: EventStudyConfig::default(),
        }
    }
}

impl VizConfig {
    pub fn palette_colors(&self) -> Vec<Color> {
        crate::color::palette_colors(&self.palette)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 576.0,  // 8" * 72
            height: 360.0, // 5" * 72
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub size: f64,
    pub label_size: f64,
    pub tick_size: f64,
    pub title_size: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { size: 10.0, label_size: 11.0, tick_size: 9.0, title_size: 12.0 }
    }
}

/// Which side of the frame tick marks are drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickDirection {
    In,
    #[default]
    Out,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    pub tick_direction: TickDirection,
    pub tick_length: f64,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self { tick_direction: TickDirection::Out, tick_length: 4.0 }
    }
}

impl AxesConfig {
    /// How far ticks reach outside the frame.
    pub fn tick_outset(&self) -> f64 {
        match self.tick_direction {
            TickDirection::In => 0.0,
            TickDirection::Out => self.tick_length,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub show: bool,
    pub color: Color,
    pub alpha: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { show: true, color: Color::hex("#CBD5E1"), alpha: 0.55 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub estimate: Color,
    pub zero_line: Color,
    pub unobserved: Color,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            estimate: Color::hex("#1f77b4"),
            zero_line: Color::hex("#808080"),
            unobserved: Color::hex("#9CA3AF"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PretrendsConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub marker_size: f64,
    pub line_width: f64,
}

impl Default for PretrendsConfig {
    fn default() -> Self {
        Self {
            title: "Pre-expansion trends by expansion status".into(),
            x_label: "year".into(),
            y_label: "Avg uninsured rate".into(),
            marker_size: 3.0,
            line_width: 1.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventStudyConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub marker_size: f64,
    pub cap_width: f64,
    /// Draw offsets with no observations as hollow markers at zero.
    pub show_unobserved: bool,
}

impl Default for EventStudyConfig {
    fn default() -> Self {
        Self {
            title: "Event-Study: Dynamic Effects of Medicaid Expansion".into(),
            x_label: "Years since expansion (2014 = 0)".into(),
            y_label: "Change in uninsured rate".into(),
            marker_size: 3.0,
            cap_width: 8.0,
            show_unobserved: false,
        }
    }
}

/// Resolve a VizConfig from an optional YAML string.
pub fn resolve_config(user_yaml: Option<&str>) -> crate::Result<VizConfig> {
    match user_yaml {
        None => Ok(VizConfig::default()),
        Some(yaml) => {
            let config: VizConfig = serde_yaml_ng::from_str(yaml)
                .map_err(|e| crate::RenderError::Config(e.to_string()))?;
            Ok(config)
        }
    }
}

/// Read and resolve a YAML config file.
pub fn load_config(path: &Path) -> crate::Result<VizConfig> {
    let text = std::fs::read_to_string(path)?;
    resolve_config(Some(&text))
        .map_err(|e| crate::RenderError::Config(format!("{}: {e}", path.display())))
}
