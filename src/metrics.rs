//! Font metrics, text wrapping and line-count estimation.
//!
//! Reports use the standard Helvetica faces, so widths come from the built-in
//! AFM tables below rather than from font files. [`wrap_lines`] is the single
//! wrapping routine: the page writer uses it to break value text into lines and
//! the table layout uses it (through [`estimate_line_count`]) to size rows. A
//! row's height therefore always matches the lines actually drawn into it.
//!
//! All lengths are in inches.

pub const POINTS_PER_INCH: f32 = 72.0;

/// Horizontal padding inside a cell, on each side (one millimetre).
pub const CELL_MARGIN: f32 = 28.35 / POINTS_PER_INCH / 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub style: FontStyle,
    /// Size in points
    pub size: f32,
}

impl Font {
    pub fn regular(size: f32) -> Self {
        Self { style: FontStyle::Regular, size }
    }

    pub fn bold(size: f32) -> Self {
        Self { style: FontStyle::Bold, size }
    }

    pub fn italic(size: f32) -> Self {
        Self { style: FontStyle::Italic, size }
    }

    /// Font size expressed in inches.
    pub fn size_in_inches(&self) -> f32 {
        self.size / POINTS_PER_INCH
    }

    /// PostScript name of the standard font.
    pub fn base_font_name(&self) -> &'static str {
        match self.style {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Italic => "Helvetica-Oblique",
        }
    }
}

// Widths in 1/1000 em for characters 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0' .. '9'
    278, 278, 584, 584, 584, 556, 1015, // ':' .. '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A' .. 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' .. 'Z'
    278, 278, 278, 469, 556, 333, // '[' .. '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a' .. 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n' .. 'z'
    334, 260, 334, 584, // '{' .. '~'
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

// Widths for characters 160..=255.
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

const HELVETICA_BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

const CONTROL_WIDTH: u16 = 278;
const FALLBACK_WIDTH: u16 = 556;

/// Advance width of a character in 1/1000 em.
pub fn char_width(style: FontStyle, ch: char) -> u16 {
    let code = ch as u32;
    let bold = style == FontStyle::Bold;
    match code {
        0..=31 | 127 => CONTROL_WIDTH,
        32..=126 => {
            let index = (code - 32) as usize;
            if bold { HELVETICA_BOLD_ASCII[index] } else { HELVETICA_ASCII[index] }
        }
        160..=255 => {
            let index = (code - 160) as usize;
            if bold { HELVETICA_BOLD_LATIN1[index] } else { HELVETICA_LATIN1[index] }
        }
        _ => FALLBACK_WIDTH,
    }
}

/// Width of a string in inches.
pub fn string_width(text: &str, font: Font) -> f32 {
    let units: u32 = text.chars().map(|ch| char_width(font.style, ch) as u32).sum();
    units as f32 * font.size_in_inches() / 1000.0
}

/// Break text into the lines a multi-line cell of `width` inches shows.
///
/// Carriage returns are ignored and a single trailing newline does not start
/// a new line. Lines break at the last space that fits; a word wider than the
/// cell is split at the character that overflows. Always returns at least one
/// line.
pub fn wrap_lines(text: &str, width: f32, font: Font) -> Vec<String> {
    let chars: Vec<char> = text.chars().filter(|&c| c != '\r').collect();
    let mut end = chars.len();
    if end > 0 && chars[end - 1] == '\n' {
        end -= 1;
    }

    let max_units = (width - 2.0 * CELL_MARGIN) * 1000.0 / font.size_in_inches();
    let segment = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };

    let mut lines = Vec::new();
    let mut last_space: Option<usize> = None;
    let mut line_start = 0;
    let mut i = 0;
    let mut units = 0.0f32;

    while i < end {
        let ch = chars[i];
        if ch == '\n' {
            lines.push(segment(line_start, i));
            i += 1;
            last_space = None;
            line_start = i;
            units = 0.0;
            continue;
        }
        if ch == ' ' {
            last_space = Some(i);
        }
        units += char_width(font.style, ch) as f32;
        if units > max_units {
            match last_space {
                None => {
                    if i == line_start {
                        i += 1;
                    }
                    lines.push(segment(line_start, i));
                }
                Some(space) => {
                    lines.push(segment(line_start, space));
                    i = space + 1;
                }
            }
            last_space = None;
            line_start = i;
            units = 0.0;
        } else {
            i += 1;
        }
    }
    lines.push(segment(line_start, i));
    lines
}

/// Number of lines [`wrap_lines`] produces for `text` in a cell `width` wide.
pub fn estimate_line_count(width: f32, text: &str, font: Font) -> usize {
    wrap_lines(text, width, font).len()
}
