//! Text measurement and word wrapping for the standard PDF Helvetica faces.

/// Millimetres per PostScript point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Typeface used for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
    Oblique,
}

/// Measures rendered text width.
pub trait TextMetrics {
    /// Width of `text` in millimetres at `size` points.
    fn text_width(&self, text: &str, font: Font, size: f32) -> f32;
}

/// Advance widths (1/1000 em) for ASCII 32..=126, Helvetica.
const REGULAR_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Advance widths (1/1000 em) for ASCII 32..=126, Helvetica-Bold.
const BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

/// Width used for characters outside the tables.
const FALLBACK_WIDTH: u16 = 556;

/// Built-in metrics for Helvetica, Helvetica-Bold and Helvetica-Oblique.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelveticaMetrics;

impl HelveticaMetrics {
    fn glyph_width(c: char, font: Font) -> u16 {
        let table = match font {
            Font::Bold => &BOLD_WIDTHS,
            Font::Regular | Font::Oblique => &REGULAR_WIDTHS,
        };
        match c {
            ' '..='~' => table[c as usize - 32],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' => 1000,
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201C}' | '\u{201D}' => 333,
            '\u{2026}' => 1000,
            _ => FALLBACK_WIDTH,
        }
    }
}

impl TextMetrics for HelveticaMetrics {
    fn text_width(&self, text: &str, font: Font, size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| u32::from(Self::glyph_width(c, font)))
            .sum();
        units as f32 / 1000.0 * size * MM_PER_PT
    }
}

/// Wrap `text` into lines no wider than `max_width` millimetres.
///
/// Explicit newlines start a new line. Words wider than the line are broken
/// between characters.
pub fn wrap(metrics: &dyn TextMetrics, text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };

            if metrics.text_width(&candidate, font, size) <= max_width {
                line = candidate;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }

            if metrics.text_width(word, font, size) <= max_width {
                line = word.to_string();
            } else {
                let mut pieces = break_word(metrics, word, font, size, max_width);
                line = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }

        lines.push(line);
    }

    lines
}

fn break_word(metrics: &dyn TextMetrics, word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for c in word.chars() {
        current.push(c);
        if current.chars().count() > 1 && metrics.text_width(&current, font, size) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    pieces.push(current);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_helvetica() {
        let m = HelveticaMetrics;
        // "Hello" = 722 + 556 + 222 + 222 + 556 = 2278 units.
        let expected = 2.278 * 10.0 * MM_PER_PT;
        assert!((m.text_width("Hello", Font::Regular, 10.0) - expected).abs() < 1e-4);
        assert!(m.text_width("Hello", Font::Bold, 10.0) > m.text_width("Hello", Font::Regular, 10.0));
        assert_eq!(
            m.text_width("abc", Font::Oblique, 12.0),
            m.text_width("abc", Font::Regular, 12.0)
        );
    }

    #[test]
    fn wrap_fits_width() {
        let m = HelveticaMetrics;
        let text = "The quick brown fox jumps over the lazy dog ".repeat(8);
        let lines = wrap(&m, &text, Font::Regular, 10.0, 170.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(m.text_width(line, Font::Regular, 10.0) <= 170.0);
        }
        assert_eq!(lines.join(" ").split_whitespace().count(), text.split_whitespace().count());
    }

    #[test]
    fn wrap_keeps_newlines() {
        let lines = wrap(&HelveticaMetrics, "one\n\ntwo", Font::Regular, 10.0, 170.0);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn wrap_breaks_long_words() {
        let m = HelveticaMetrics;
        let word = "x".repeat(200);
        let lines = wrap(&m, &word, Font::Regular, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        assert!(lines.iter().all(|l| m.text_width(l, Font::Regular, 10.0) <= 50.0));
    }
}
