// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::Config;
use crate::simulation::register_bank::BANK_SIZE;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// ### Example
///
/// ```bash
/// ./modbus_sim --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    // Load the schema from the embedded string
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    // Pretty-print the schema
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    // Output to stdout
    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
///
/// ### Arguments
///
/// * `addr` - The address string to validate
///
/// ### Returns
///
/// `true` if the address is valid, `false` otherwise
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// This function performs deeper validation checks that can't be easily expressed in a JSON
/// schema, such as verifying that every configured register slot fits inside the register
/// bank and warning about slots whose address ranges collide.
///
/// ### Arguments
///
/// * `config` - The configuration object to validate
///
/// ### Returns
///
/// * `Ok(())` if all validations pass
/// * `Err(anyhow::Error)` with descriptive message if any validation fails
///
/// ### Validation Rules
///
/// This function validates:
///
/// - **Port Range**: Ensures the Modbus port is within a valid range (1-65534)
/// - **IP Address Format**: Checks if the provided address is a valid IP address or special value
/// - **Slot Bounds**: Every slot must fit inside the register bank; a float slot occupies
///   two words, so its `start + 1` must also be in range
/// - **Slot Overlap**: Slots whose word ranges overlap are reported as a warning only,
///   since a write to one slot then clobbers part of its neighbour
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    // Check value ranges for certain fields
    if config.modbus.port < 1 || config.modbus.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.modbus.port);
    }

    // Check if the address is in a valid format
    if !is_valid_ip_address(&config.modbus.address) {
        debug!(
            "Potentially invalid address format: {}",
            config.modbus.address
        );
        // Just issue a warning but don't block
    }

    // Every slot must fit inside the register bank
    for (i, slot) in config.simulation.registers.iter().enumerate() {
        let width: usize = if slot.is_float { 2 } else { 1 };
        if slot.start as usize + width > BANK_SIZE {
            anyhow::bail!(
                "Register slot {} at address {} does not fit inside the {}-word register bank",
                i,
                slot.start,
                BANK_SIZE
            );
        }
    }

    // Overlapping slots are tolerated but almost certainly a configuration
    // mistake: the generator rewrites slots in index order, so the later
    // slot wins and a float slot overwrites its neighbour's word.
    let slots = &config.simulation.registers;
    for (i, a) in slots.iter().enumerate() {
        let a_width = if a.is_float { 2u16 } else { 1u16 };
        for (j, b) in slots.iter().enumerate().skip(i + 1) {
            let b_width = if b.is_float { 2u16 } else { 1u16 };
            if a.start < b.start + b_width && b.start < a.start + a_width {
                warn!(
                    "Register slots {} (address {}) and {} (address {}) overlap",
                    i, a.start, j, b.start
                );
            }
        }
    }

    Ok(())
}
