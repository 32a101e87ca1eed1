pub mod alpha_premultiply;
pub mod composite;
pub mod extract_foreground;
pub mod safe_area;
