//! File provider for tankrecon
//!
//! This crate implements the reading-source trait over exported
//! JSONL files, standing in for the storage collaborator.

pub mod data_loader;

pub use data_loader::DataLoader;
