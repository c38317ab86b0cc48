pub mod background;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod datastore;
pub mod effect;
pub mod engine;
pub mod inflight;
pub mod journal;
pub mod limits;
pub mod model;
pub mod observability;
pub mod resolver;
pub mod runner;
pub mod sweep;
pub mod title;
pub mod window;
