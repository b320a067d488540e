mod input;
mod theme;

pub use input::LineInput;
pub use theme::Theme;
