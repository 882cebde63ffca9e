use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker colors used by stations and trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Violet,
    White,
    Black,
    RedWhite,
    YellowViolet,
    RedBlue,
    GreenViolet,
    BlueBlack,
    GreenBlack,
    YellowBlack,
}

impl Color {
    pub const ALL: [Color; 14] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Violet,
        Color::White,
        Color::Black,
        Color::RedWhite,
        Color::YellowViolet,
        Color::RedBlue,
        Color::GreenViolet,
        Color::BlueBlack,
        Color::GreenBlack,
        Color::YellowBlack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Violet => "violet",
            Color::White => "white",
            Color::Black => "black",
            Color::RedWhite => "red-white",
            Color::YellowViolet => "yellow-violet",
            Color::RedBlue => "red-blue",
            Color::GreenViolet => "green-violet",
            Color::BlueBlack => "blue-black",
            Color::GreenBlack => "green-black",
            Color::YellowBlack => "yellow-black",
        }
    }

    /// Two-tone variant with a dark band, for the hues that have one
    pub fn with_black(self) -> Option<Color> {
        match self {
            Color::Blue => Some(Color::BlueBlack),
            Color::Green => Some(Color::GreenBlack),
            Color::Yellow => Some(Color::YellowBlack),
            _ => None,
        }
    }

    /// Two-tone marker made of `self` and `other`, in either order
    pub fn combined(self, other: Color) -> Option<Color> {
        match (self, other) {
            (Color::Yellow, Color::Violet) | (Color::Violet, Color::Yellow) => Some(Color::YellowViolet),
            (Color::Red, Color::Blue) | (Color::Blue, Color::Red) => Some(Color::RedBlue),
            (Color::Green, Color::Violet) | (Color::Violet, Color::Green) => Some(Color::GreenViolet),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
