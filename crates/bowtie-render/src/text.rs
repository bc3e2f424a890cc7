use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 12.0,
            font_weight: Some("bold".to_string()),
        }
    }
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        matches!(
            self.font_weight.as_deref().map(str::trim),
            Some("bold" | "bolder" | "600" | "700" | "800" | "900")
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;

    fn line_height(&self, style: &TextStyle) -> f64;
}

/// Font-free measurer: every column cell is `char_width_factor` em wide.
///
/// Output only depends on the text and the style, which keeps SVG output byte-stable across
/// machines.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    pub fn normalized_text_lines(text: &str) -> Vec<&str> {
        let out = text.split('\n').map(str::trim_end).collect::<Vec<_>>();
        if out.is_empty() {
            return vec![""];
        }
        out
    }

    fn char_width_factor(&self) -> f64 {
        if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        }
    }

    fn line_height_factor(&self) -> f64 {
        if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        }
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let mut char_width_factor = self.char_width_factor();
        if style.is_bold() {
            char_width_factor *= 1.1;
        }

        let lines = Self::normalized_text_lines(text);
        let font_size = style.font_size.max(1.0);
        let max_cells = lines.iter().map(|l| l.width()).max().unwrap_or(0);

        TextMetrics {
            width: max_cells as f64 * font_size * char_width_factor,
            height: lines.len() as f64 * self.line_height(style),
            line_count: lines.len(),
        }
    }

    fn line_height(&self, style: &TextStyle) -> f64 {
        style.font_size.max(1.0) * self.line_height_factor()
    }
}
