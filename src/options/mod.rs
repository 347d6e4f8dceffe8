/// Game options: the value model and its durable store.

pub mod model;
pub mod store;

pub use model::{
    GameOptions, OptionsPatch, FOOD_COUNT_MAX, FOOD_COUNT_MIN, GRID_SIZE_MAX, GRID_SIZE_MIN,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, OptionsStore};

/// Why a serialized options record was rejected.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("unsupported fps {0} (expected 10, 30 or 60)")]
    UnsupportedFps(u32),
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: u32 },
    #[error("invalid snake color {0:?}")]
    InvalidColor(String),
}
