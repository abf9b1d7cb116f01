#![no_std]

// Analog control core for the battery-powered light.
//
// This crate stays portable across the MCU firmware and the host emulator by
// avoiding the Rust standard library. Hardware access is expressed through
// traits the other crates implement.

pub mod brightness;
pub mod config;
pub mod converter;
pub mod modes;
pub mod monitor;
pub mod platform;
pub mod power;
pub mod sensors;
pub mod shared;
pub mod status;
pub mod telemetry;
