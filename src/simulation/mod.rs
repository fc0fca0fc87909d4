// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Synthetic register bank simulation
//!
//! This module owns the state the simulated slave exposes over Modbus:
//! a fixed-size bank of 16-bit holding registers and a time-driven
//! generator that rewrites a configured subset of them.
//!
//! ## Key Components
//!
//! - `RegisterBank`: The fixed bank of 1000 holding registers with typed
//!   word, word-range and float32 access.
//! - `HoldingGenerator`: Recomputes every indexed slot from elapsed
//!   wall-clock time, at most once per second.

pub mod generator;
pub mod register_bank;

pub use generator::{HoldingGenerator, RegisterIndex, Slot, ValueKind};
pub use register_bank::{RegisterBank, RegisterError, BANK_SIZE};
