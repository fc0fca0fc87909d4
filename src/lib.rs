// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP slave simulator library
//!
//! This library emulates a Modbus TCP slave device backed by a synthetic,
//! time-varying register bank. It is meant for exercising Modbus master or
//! client software without real field hardware on the bus.

pub mod config;
pub mod daemon;
pub mod modbus;
pub mod simulation;
