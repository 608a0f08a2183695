//! Cycling colour palette for plotted curves.

/// An 8 bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

// tab10, the usual plotting default
const TAB10: [Rgb; 10] = [
    Rgb(0x1f, 0x77, 0xb4),
    Rgb(0xff, 0x7f, 0x0e),
    Rgb(0x2c, 0xa0, 0x2c),
    Rgb(0xd6, 0x27, 0x28),
    Rgb(0x94, 0x67, 0xbd),
    Rgb(0x8c, 0x56, 0x4b),
    Rgb(0xe3, 0x77, 0xc2),
    Rgb(0x7f, 0x7f, 0x7f),
    Rgb(0xbc, 0xbd, 0x22),
    Rgb(0x17, 0xbe, 0xcf),
];

/// Fixed list of colours indexed cyclically.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<Rgb>,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self::with_colors(TAB10.to_vec())
    }

    /// Uses a custom list; an empty list falls back to the default.
    pub fn with_colors(colors: Vec<Rgb>) -> Self {
        let colors = if colors.is_empty() { TAB10.to_vec() } else { colors };
        Self { colors }
    }

    /// Colour at `index`, wrapping around.
    pub fn color(&self, index: usize) -> Rgb {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new()
    }
}
