// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Small Modbus TCP client for poking at the simulator by hand.
//!
//! Reads a run of holding registers and optionally decodes consecutive
//! register pairs the way the simulator stores float32 values: low-order
//! half of the bit pattern in the first word, high-order half in the
//! second.

use clap::Parser;
use std::{error::Error, net::SocketAddr};
use tokio_modbus::prelude::*;

/// Modbus client for reading holding registers from the simulator
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Starting holding register address
    #[clap(long, default_value = "0")]
    register: u16,

    /// Number of registers to read
    #[clap(long, default_value = "4")]
    quantity: u16,

    /// Also decode consecutive register pairs as float32 values
    #[clap(long)]
    float: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    // Format server address
    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .expect("Invalid socket address");
    println!("Connecting to Modbus server at {}", socket_addr);

    // Create TCP transport
    let mut ctx = tcp::connect_slave(socket_addr, Slave(1)).await?;

    // Read holding registers
    println!(
        "Reading {} holding registers starting at address {}",
        args.quantity, args.register
    );
    let response = ctx
        .read_holding_registers(args.register, args.quantity)
        .await?;

    match response {
        Ok(words) => {
            println!("Raw register values: {:?}", words);

            if args.float {
                for (i, pair) in words.chunks_exact(2).enumerate() {
                    let bits = u32::from(pair[1]) << 16 | u32::from(pair[0]);
                    println!(
                        "Float at address {}: {}",
                        args.register + 2 * i as u16,
                        f32::from_bits(bits)
                    );
                }
            }
        }
        Err(exception) => println!("Modbus exception: {:?}", exception),
    }

    Ok(())
}
