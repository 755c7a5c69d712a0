pub mod engine;
pub mod inverted;

pub use engine::SearchIndex;
pub use inverted::InvertedIndex;
