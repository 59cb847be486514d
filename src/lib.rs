//! Sentiment classification for support tickets.
//!
//! Raw ticket text is cleaned by [`preprocessing`], turned into TF-IDF
//! features and classified as `POSITIVE` or `NEGATIVE` by an incrementally
//! trained linear model managed by [`ml::ModelManager`]. Training runs can be
//! reported to local experiment trackers in [`tracking`].

pub mod analyzer;
pub mod config;
pub mod error;
pub mod ml;
pub mod preprocessing;
pub mod tracking;

pub use analyzer::{SentimentAnalyzer, SentimentResponse, MODEL_ID};
pub use config::Config;
pub use error::{Result, SentimentError};
pub use ml::{ModelManager, ModelState, Prediction, Sentiment, TrainingReport};
pub use preprocessing::{GreetingFilter, StopwordFilter, TextPreProcessor};
