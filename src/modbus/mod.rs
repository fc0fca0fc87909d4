// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module implements the slave side of Modbus TCP for the simulator:
//! frame decoding and encoding, function dispatch against the synthetic
//! register bank, and the single-session TCP server.
//!
//! ## Key Components
//!
//! - `frame`: MBAP header and payload codec, byte-exact with the device
//!   being simulated.
//! - `ModbusEngine`: routes a decoded request to its handler, running the
//!   value-generator refresh beforehand when enabled.
//! - `server`: the accept loop and per-connection session with its
//!   2-second idle timeout.
//!
//! ## Supported Functions
//!
//! | Code | Name | Behaviour |
//! |------|------|-----------|
//! | 3 | Read Holding Registers | words from the bank, big-endian |
//! | 6 | Preset Single Register | writes one word, echoes the request |
//! | 16 | Preset Few Registers | writes a run of words, fixed-length ack |
//!
//! Any other function code is decoded and silently dropped; the master
//! waits out its own timeout. Per the Modbus TCP specification only one
//! master connects to a slave at a time, so the server services a single
//! connection and lets the rest queue in the OS backlog.

pub mod engine;
pub mod frame;
pub mod server;

pub use engine::{EngineError, ModbusEngine};
pub use frame::{FrameError, MbapHeader, Request, Response};
