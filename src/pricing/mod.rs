//! Offline price model: training protocol, forest wrapper and the persisted
//! artifact the recommender loads.

pub mod artifact;
pub mod forest;
pub mod metrics;
pub mod split;
pub mod train;

pub use artifact::TrainedModel;
pub use forest::{ForestParams, PriceForest};
pub use train::{train, TrainConfig, TrainReport};
