use derive_more::Display;

#[derive(Debug, Clone, Display)]
pub enum WebColor {
    #[display(fmt = "{}", _0)]
    RGB(RGBColor),
    #[display(fmt = "{}", _0)]
    Named(NamedColor),
}

impl Default for WebColor {
    fn default() -> Self {
        WebColor::Named(NamedColor::Black)
    }
}

#[derive(Debug, Clone, Default, Display)]
#[display(fmt = "#{:02X}{:02X}{:02X}", red, green, blue)]
pub struct RGBColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RGBColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Debug, Clone, Copy, Display)]
pub enum NamedColor {
    #[display(fmt = "white")]
    White,
    #[display(fmt = "black")]
    Black,
    #[display(fmt = "transparent")]
    Transparent,
}

/// Palette of the default SVG theme.
pub mod theme {
    use super::RGBColor;

    pub const CANVAS: RGBColor = RGBColor::new(24, 24, 27);
    pub const NODE_FILL: RGBColor = RGBColor::new(39, 39, 42);
    pub const NODE_STROKE: RGBColor = RGBColor::new(82, 82, 91);
    pub const MERGE_FILL: RGBColor = RGBColor::new(63, 63, 70);
    pub const EDGE_STROKE: RGBColor = RGBColor::new(148, 148, 158);
    pub const TEXT: RGBColor = RGBColor::new(228, 228, 231);
}
