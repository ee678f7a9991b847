use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 14.0,
        }
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

/// Font-free measurer: every display column is `char_width_factor * font_size` wide.
///
/// Zero factors fall back to 0.6 (width) and 1.2 (line height).
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
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
        let font_size = style.font_size.max(1.0);
        let mut line_count = 0usize;
        let mut max_columns = 0usize;
        for line in text.split('\n') {
            line_count += 1;
            max_columns = max_columns.max(line.width());
        }
        TextMetrics {
            width: max_columns as f64 * font_size * self.char_width_factor(),
            height: line_count as f64 * self.line_height(style),
            line_count,
        }
    }

    fn line_height(&self, style: &TextStyle) -> f64 {
        style.font_size.max(1.0) * self.line_height_factor()
    }
}

/// Greedy word wrap at `max_width`. Words wider than the limit get a line of their own.
pub fn wrap_label(
    measurer: &dyn TextMeasurer,
    text: &str,
    style: &TextStyle,
    max_width: f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measurer.measure(&candidate, style).width <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_display_columns() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle {
            font_family: None,
            font_size: 10.0,
        };
        let metrics = m.measure("abcd\nab", &style);
        assert_eq!(metrics.width, 24.0);
        assert_eq!(metrics.height, 24.0);
        assert_eq!(metrics.line_count, 2);

        // Wide glyphs take two columns.
        assert_eq!(m.measure("日本", &style).width, 24.0);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle {
            font_family: None,
            font_size: 10.0,
        };
        // 6px per column; 60px fits 10 columns.
        let lines = wrap_label(&m, "Plan a  weekend trip somewhere", &style, 60.0);
        assert_eq!(lines, vec!["Plan a", "weekend", "trip", "somewhere"]);

        let long = wrap_label(&m, "Supercalifragilistic", &style, 60.0);
        assert_eq!(long, vec!["Supercalifragilistic"]);

        assert_eq!(wrap_label(&m, "", &style, 60.0), vec![String::new()]);
    }
}
