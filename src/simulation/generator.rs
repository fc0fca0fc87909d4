// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Time-driven value generator
//!
//! Recomputes every indexed slot from elapsed wall-clock time. With
//! simulation start `T0`, at time `T0 + k` every integer slot holds
//! `(k mod 10) * 10` and every float slot the same magnitude as a
//! float32, so a connected master sees a sawtooth that repeats every ten
//! seconds. All slots carry the identical synthetic magnitude at any
//! given second; there is no per-slot variation.
//!
//! The refresh is gated to at most once per second and only runs when
//! updates are enabled in the configuration.

use crate::config::SimulationConfig;
use crate::simulation::register_bank::{RegisterBank, RegisterError};

/// Value kind of a register index slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A single 16-bit unsigned word.
    Integer,
    /// An IEEE-754 float32 split over two consecutive words.
    Float32,
}

/// One entry of the register index: a starting address and a value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: u16,
    pub kind: ValueKind,
}

/// Ordered list of the simulated slots, built once from configuration and
/// immutable afterwards.
///
/// The list order defines the logical slot numbering, which only the
/// generator uses. The wire protocol addresses the register bank directly
/// and never sees slot numbers.
#[derive(Debug, Clone)]
pub struct RegisterIndex {
    slots: Vec<Slot>,
}

impl RegisterIndex {
    /// Build the index from the `simulation.registers` configuration list.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let slots = config
            .registers
            .iter()
            .map(|slot| Slot {
                start: slot.start,
                kind: if slot.is_float {
                    ValueKind::Float32
                } else {
                    ValueKind::Integer
                },
            })
            .collect();
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Rewrites the indexed holding registers from elapsed wall-clock time.
///
/// All timestamps are UNIX epoch seconds supplied by the caller, which
/// keeps the generator deterministic under test.
#[derive(Debug)]
pub struct HoldingGenerator {
    index: RegisterIndex,
    enabled: bool,
    sim_start: u64,
    last_recalc: u64,
}

impl HoldingGenerator {
    /// Create a generator over `index`. `sim_start` is the simulation
    /// origin `T0`; the first refresh is due as soon as a request arrives.
    pub fn new(index: RegisterIndex, enabled: bool, sim_start: u64) -> Self {
        Self {
            index,
            enabled,
            sim_start,
            last_recalc: 0,
        }
    }

    /// Recompute every slot for the current time.
    ///
    /// Returns `Ok(true)` when a refresh ran, `Ok(false)` when it was
    /// gated off (updates disabled, or the bank was already recomputed
    /// for this second). Slots are written in index order, so with
    /// overlapping slots the later entry wins.
    pub fn refresh(&mut self, bank: &mut RegisterBank, now: u64) -> Result<bool, RegisterError> {
        if !self.enabled || now <= self.last_recalc {
            return Ok(false);
        }

        let offset = now.saturating_sub(self.sim_start);
        let int_val = ((offset % 10) * 10) as u16;
        let float_val = f32::from(int_val);

        for slot in self.index.slots() {
            match slot.kind {
                ValueKind::Float32 => bank.write_float(slot.start, float_val)?,
                ValueKind::Integer => bank.write_int(slot.start, int_val)?,
            }
        }

        self.last_recalc = now;
        Ok(true)
    }
}
