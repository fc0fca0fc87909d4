// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register simulation configuration
//!
//! This module defines the structures for configuring the synthetic
//! register bank: which holding-register addresses carry generated values
//! and whether the generator rewrites them over time.

use serde::{Deserialize, Serialize};

/// A single entry of the register index.
///
/// Each entry maps a logical slot to a starting holding-register address
/// and a value kind. Integer slots occupy one 16-bit word, float slots
/// occupy two consecutive words (`start` and `start + 1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSlotConfig {
    /// Starting holding-register address of the slot.
    pub start: u16,

    /// When `true` the slot carries an IEEE-754 float32 split over two
    /// words, otherwise a single 16-bit unsigned integer.
    #[serde(default)]
    pub is_float: bool,
}

/// Configuration for the synthetic value generator.
///
/// The list order of `registers` defines the logical slot numbering used
/// by the generator. The wire protocol is unaffected by it and addresses
/// the register bank directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Flag to enable or disable the time-driven rewrite of the indexed
    /// holding registers.
    ///
    /// When disabled, the bank keeps its startup seed values and whatever
    /// the connected master writes into it.
    pub update_holdings: bool,

    /// The register index, one entry per simulated slot.
    pub registers: Vec<RegisterSlotConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            update_holdings: true,
            registers: vec![
                RegisterSlotConfig {
                    start: 100,
                    is_float: false,
                },
                RegisterSlotConfig {
                    start: 200,
                    is_float: true,
                },
            ],
        }
    }
}
