pub mod api;
pub mod dataset;
pub mod error;
pub mod features;
pub mod models;
pub mod pricing;
pub mod present;
pub mod recommender;
pub mod scrapers;
