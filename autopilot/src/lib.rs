pub mod benchmark;
pub mod config;
pub mod raw;
pub mod runner;
pub mod scene;
pub mod seeds;
pub mod sink;
