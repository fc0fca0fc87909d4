// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP session server
//!
//! Accepts one connection at a time and feeds its bytes to the
//! [`ModbusEngine`]. While a session is active, further connection
//! attempts queue in the OS backlog; the listener only accepts again once
//! the previous session ends.
//!
//! A session ends on a hard I/O error, on the peer closing the socket, or
//! after 2 seconds without receiving data. The idle rule is implemented
//! as a blocking receive with a deadline rather than a poll loop, so the
//! task sleeps while the line is quiet.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::modbus::engine::ModbusEngine;
use crate::modbus::frame::REQUEST_HEADER_LEN;

/// Idle threshold after which the active connection is dropped.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Receive buffer size, ample for the largest supported request.
const RECV_BUF_SIZE: usize = 512;

/// Current wall-clock time in UNIX epoch seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Accept loop over an already-bound listener.
///
/// The engine, and with it the register bank, lives across sessions: a
/// master that reconnects sees the values the previous session left
/// behind.
pub async fn serve_on(listener: TcpListener, mut engine: ModbusEngine) -> Result<()> {
    loop {
        info!("Waiting for incoming connection...");
        let (mut stream, peer) = listener
            .accept()
            .await
            .context("Unable to accept incoming connection")?;
        stream
            .set_nodelay(true)
            .context("Failed to set TCP_NODELAY on accepted connection")?;

        info!("Incoming connection from {}, starting the conversation", peer);
        match serve_connection(&mut engine, &mut stream).await {
            Ok(()) => info!("Connection with {} ended", peer),
            Err(err) => warn!("Connection with {} failed: {:#}", peer, err),
        }
    }
}

/// Service a single connection until it times out, closes or fails.
///
/// Per-request errors (malformed frame, out-of-range access) are logged
/// and the request is dropped without a response; the session keeps
/// going. Fragments shorter than a full header plus function code are
/// never dispatched.
async fn serve_connection(engine: &mut ModbusEngine, stream: &mut TcpStream) -> Result<()> {
    let mut buf = [0u8; RECV_BUF_SIZE];

    loop {
        let received = match timeout(IDLE_TIMEOUT, stream.read(&mut buf)).await {
            Err(_) => {
                info!("Connection timed out");
                return Ok(());
            }
            Ok(read) => read.context("Socket receive failed")?,
        };

        if received == 0 {
            info!("Peer closed the connection");
            return Ok(());
        }

        if received < REQUEST_HEADER_LEN {
            debug!("Ignoring {} byte fragment, not a full request", received);
            continue;
        }

        match engine.process_frame(&buf[..received], unix_now()) {
            Ok(Some(response)) => stream
                .write_all(&response)
                .await
                .context("Socket send failed")?,
            Ok(None) => {}
            Err(err) => warn!("Dropping request without a response: {}", err),
        }
    }
}
