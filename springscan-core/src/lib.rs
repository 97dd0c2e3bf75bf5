//! SpringScan Core — bars, data providers, indicators and compression scoring.
//!
//! This crate holds everything needed to turn one symbol's price history
//! into a compression score:
//! - Domain types (bars, validated bar series)
//! - Data providers (Yahoo Finance, CSV directory, synthetic) behind one trait
//! - Market universes
//! - ATR and SMA indicators
//! - The compression scorer and its band policy

pub mod data;
pub mod domain;
pub mod indicators;
pub mod scoring;
