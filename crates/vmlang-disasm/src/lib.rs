pub mod listing;
pub mod model;

pub use listing::{disassemble, render_text, Row};
pub use model::{load_raw_bin, Image};
