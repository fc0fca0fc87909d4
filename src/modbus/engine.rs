// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request dispatcher
//!
//! Owns the register bank and the value generator, and turns one received
//! frame into at most one response frame. Malformed frames and
//! out-of-range accesses surface as typed errors; the session layer logs
//! them and sends nothing back. Unsupported function codes are decoded
//! and then dropped on the floor, which mirrors the simulated device.

use log::debug;
use thiserror::Error;

use crate::config::Config;
use crate::modbus::frame::{self, FrameError, Request, Response};
use crate::simulation::{HoldingGenerator, RegisterBank, RegisterError, RegisterIndex};

/// Error type for request processing. Every variant is recoverable: the
/// offending request is dropped and the session keeps running.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

/// The protocol engine: register bank, generator state and the function
/// dispatch that ties them together.
///
/// The engine is owned by the session task servicing the one active
/// connection, so none of its state needs locking.
#[derive(Debug)]
pub struct ModbusEngine {
    bank: RegisterBank,
    generator: HoldingGenerator,
}

impl ModbusEngine {
    pub fn new(bank: RegisterBank, generator: HoldingGenerator) -> Self {
        Self { bank, generator }
    }

    /// Build an engine from the loaded configuration with a freshly
    /// seeded bank. `sim_start` is the simulation origin, in UNIX epoch
    /// seconds.
    pub fn from_config(config: &Config, sim_start: u64) -> Self {
        let index = RegisterIndex::from_config(&config.simulation);
        let generator =
            HoldingGenerator::new(index, config.simulation.update_holdings, sim_start);
        Self::new(RegisterBank::new(), generator)
    }

    pub fn bank(&self) -> &RegisterBank {
        &self.bank
    }

    /// Process one received frame at wall-clock time `now` (UNIX epoch
    /// seconds).
    ///
    /// Returns the encoded response, or `None` for requests that get no
    /// reply (unsupported function codes). The generator refresh runs
    /// after decoding and before the handler, so even an unsupported
    /// request advances the simulated values.
    pub fn process_frame(
        &mut self,
        frame: &[u8],
        now: u64,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let (header, request) = frame::decode_request(frame)?;

        if self.generator.refresh(&mut self.bank, now)? {
            debug!("Holding registers recalculated");
        }

        let response = match request {
            Request::ReadHoldingRegs { start, quantity } => {
                let words = self.bank.read_words(start, quantity)?.to_vec();
                Some(Response::ReadHoldingRegs { words })
            }
            Request::PresetSingleReg { addr, value } => {
                self.bank.write_word(addr, value)?;
                Some(Response::PresetSingleReg { addr, value })
            }
            Request::PresetFewRegs { start, values } => {
                let quantity = values.len() as u16;
                self.bank.write_words(start, &values)?;
                Some(Response::PresetFewRegs { start, quantity })
            }
            Request::Unsupported { function } => {
                debug!(
                    "Unsupported function code {:#04x}, dropping request without a response",
                    function
                );
                None
            }
        };

        Ok(response.map(|response| frame::encode_response(&header, &response)))
    }
}
