// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Byte-level tests of the Modbus TCP wire contract
//!
//! These tests talk to the server over a raw `TcpStream` instead of a
//! Modbus client library, so they can assert exact response bytes
//! (including the header length fields), the silent drop of unsupported
//! and malformed requests, the 2-second idle disconnect, and the
//! one-session-at-a-time accept policy.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

use modbus_sim::config::{Config, RegisterSlotConfig, SimulationConfig};
use modbus_sim::modbus::server::{serve_on, unix_now};
use modbus_sim::modbus::ModbusEngine;

async fn start_test_server(
    update_holdings: bool,
    sim_start: u64,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind(SocketAddr::from_str("127.0.0.1:0").unwrap())
        .await
        .unwrap();
    let socket_addr = listener.local_addr().unwrap();

    let config = Config {
        simulation: SimulationConfig {
            update_holdings,
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
        },
        ..Config::default()
    };
    let engine = ModbusEngine::from_config(&config, sim_start);

    let handle = tokio::spawn(async move {
        let _ = serve_on(listener, engine).await;
    });

    sleep(Duration::from_millis(50)).await;
    (socket_addr, handle)
}

async fn read_exact_bytes(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(1), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for response")
        .expect("read failed");
    buf
}

/// No bytes should arrive within `wait`; the connection must stay open.
async fn assert_silent(stream: &mut TcpStream, wait: Duration) {
    let mut buf = [0u8; 64];
    match timeout(wait, stream.read(&mut buf)).await {
        Err(_) => {}
        Ok(Ok(0)) => panic!("server closed the connection"),
        Ok(Ok(n)) => panic!("unexpected {} byte response", n),
        Ok(Err(e)) => panic!("read failed: {}", e),
    }
}

#[tokio::test]
async fn test_read_response_exact_bytes() {
    let (addr, server) = start_test_server(false, 0).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Read two registers at address 0; the seed ramp holds 1 and 11
    let request = [
        0x00, 0x2A, // transaction
        0x00, 0x00, // protocol
        0x00, 0x06, // length
        0x11, // unit
        0x03, // function
        0x00, 0x00, // start
        0x00, 0x02, // quantity
    ];
    stream.write_all(&request).await.unwrap();

    let response = read_exact_bytes(&mut stream, 13).await;
    assert_eq!(
        response,
        vec![0x00, 0x2A, 0x00, 0x00, 0x00, 0x07, 0x11, 0x03, 0x04, 0x00, 0x01, 0x00, 0x0B]
    );

    server.abort();
}

#[tokio::test]
async fn test_single_write_echoes_request_verbatim() {
    let (addr, server) = start_test_server(false, 0).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // A deliberately wrong length field comes back unchanged: the
    // response is a byte-for-byte echo of the first 12 request bytes
    let request = [
        0x01, 0x02, 0x00, 0x00, 0x09, 0x99, 0x42, 0x06, 0x00, 0x32, 0xAB, 0xCD,
    ];
    stream.write_all(&request).await.unwrap();

    let response = read_exact_bytes(&mut stream, 12).await;
    assert_eq!(response, request);

    server.abort();
}

#[tokio::test]
async fn test_multiple_write_ack_and_storage() {
    let (addr, server) = start_test_server(false, 0).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Write 0xDEAD, 0xBEEF at addresses 10-11
    let request = [
        0x00, 0x07, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x10, 0x00, 0x0A, 0x00, 0x02, 0x04, 0xDE, 0xAD,
        0xBE, 0xEF,
    ];
    stream.write_all(&request).await.unwrap();

    // The acknowledgement always carries a length field of 6
    let response = read_exact_bytes(&mut stream, 12).await;
    assert_eq!(
        response,
        vec![0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01, 0x10, 0x00, 0x0A, 0x00, 0x02]
    );

    // Read the words back
    let read = [
        0x00, 0x08, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x0A, 0x00, 0x02,
    ];
    stream.write_all(&read).await.unwrap();
    let response = read_exact_bytes(&mut stream, 13).await;
    assert_eq!(&response[9..13], &[0xDE, 0xAD, 0xBE, 0xEF]);

    server.abort();
}

#[tokio::test]
async fn test_unsupported_function_is_silently_dropped() {
    let (addr, server) = start_test_server(false, 0).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Function 4 (read input registers) is not implemented
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x01,
    ];
    stream.write_all(&request).await.unwrap();
    assert_silent(&mut stream, Duration::from_millis(500)).await;

    // The session survives and keeps answering supported requests
    let read = [
        0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01,
    ];
    stream.write_all(&read).await.unwrap();
    let response = read_exact_bytes(&mut stream, 11).await;
    assert_eq!(response[7], 0x03);

    server.abort();
}

#[tokio::test]
async fn test_truncated_multi_write_is_dropped() {
    let (addr, server) = start_test_server(false, 0).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Claims two registers but only carries bytes for one; the request
    // is dropped instead of reading past the received buffer
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x10, 0x00, 0x0A, 0x00, 0x02, 0x04, 0xDE, 0xAD,
    ];
    stream.write_all(&request).await.unwrap();
    assert_silent(&mut stream, Duration::from_millis(500)).await;

    // Nothing was written
    let read = [
        0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x0A, 0x00, 0x01,
    ];
    stream.write_all(&read).await.unwrap();
    let response = read_exact_bytes(&mut stream, 11).await;
    assert_eq!(&response[9..11], &[0x00, 0x65]); // seed value 101

    server.abort();
}

#[tokio::test]
async fn test_idle_connection_is_closed_after_two_seconds() {
    let (addr, server) = start_test_server(false, 0).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Send nothing; the server should hang up after the 2-second idle rule
    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(4), stream.read(&mut buf))
        .await
        .expect("server did not close the idle connection")
        .expect("read failed");
    assert_eq!(n, 0, "expected a clean close, got {} bytes", n);

    server.abort();
}

#[tokio::test]
async fn test_second_connection_waits_for_first_session() {
    let (addr, server) = start_test_server(false, 0).await;

    // First session is live and talking
    let mut first = TcpStream::connect(addr).await.unwrap();
    let read = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01,
    ];
    first.write_all(&read).await.unwrap();
    let _ = read_exact_bytes(&mut first, 11).await;

    // A second connection sits in the backlog: its request is not
    // serviced while the first session is active
    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_all(&read).await.unwrap();
    assert_silent(&mut second, Duration::from_millis(500)).await;

    // End the first session; the queued request is then answered
    drop(first);
    let response = read_exact_bytes(&mut second, 11).await;
    assert_eq!(response[7], 0x03);

    server.abort();
}

#[tokio::test]
async fn test_generated_register_values_on_the_wire() {
    // Thirteen seconds into the simulation the integer slot reads 30 and
    // the float slot the same magnitude (one extra second may elapse
    // before the request lands)
    let (addr, server) = start_test_server(true, unix_now() - 13).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // One span covering the integer slot at 100 and the float pair at 200
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x64, 0x00, 0x66,
    ];
    stream.write_all(&request).await.unwrap();

    let response = read_exact_bytes(&mut stream, 9 + 2 * 102).await;
    let word = |i: usize| u16::from_be_bytes([response[9 + 2 * i], response[10 + 2 * i]]);

    let int_val = word(0);
    assert!(int_val == 30 || int_val == 40, "got {}", int_val);

    let bits = u32::from(word(101)) << 16 | u32::from(word(100));
    assert_eq!(f32::from_bits(bits), int_val as f32);

    server.abort();
}
