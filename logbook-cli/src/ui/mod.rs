pub mod input_line;
pub mod render;
pub mod theme;

pub use render::{layout, render};
pub use theme::Theme;
