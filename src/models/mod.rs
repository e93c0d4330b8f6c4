//! Row models for the episode input and the spell output.

pub mod episode;
pub mod spell;

pub use episode::{Episode, NEEDED_COLUMNS};
pub use spell::Spell;
