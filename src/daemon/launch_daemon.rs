// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module provides functionality for running and managing background
//! tasks (daemons) in the simulator. It handles the lifecycle of:
//!
//! - The Modbus TCP server
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these
//! services, with proper error handling and task coordination.
//!
//! ## Architecture
//!
//! The daemon system uses Tokio's asynchronous runtime to manage concurrent
//! tasks. Each service runs as an independent task, and the main daemon
//! structure tracks and coordinates these tasks.
//!
//! ## Usage
//!
//! ```no_run
//! use modbus_sim::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     // Create and launch daemon with all enabled services
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!
//!     // Wait for all tasks to complete
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::modbus::server::{serve_on, unix_now};
use crate::modbus::ModbusEngine;

/// Represents a daemon task manager that coordinates the background services
///
/// This structure maintains a collection of asynchronous tasks and provides
/// methods to start, stop, and monitor them.
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
///
/// # Thread Safety
///
/// The `running` flag is wrapped in an `Arc` (Atomic Reference Counter) to allow
/// safe sharing between multiple tasks. Each task checks this flag periodically
/// to determine if it should continue running or gracefully terminate.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// Initializes a new daemon manager with an empty task list and the
    /// running flag set to `true`.
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// Starts the daemon services according to the provided configuration.
    /// Only services that are enabled in the configuration will be started.
    /// Each service runs as a separate asynchronous task.
    ///
    /// The following services may be started:
    /// * Modbus TCP server - If `config.modbus.enabled` is `true`
    /// * Heartbeat monitoring - Always started for system health monitoring
    ///
    /// # Parameters
    ///
    /// * `config` - Application configuration containing service settings
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Success if all tasks started successfully, or error details
    ///
    /// # Errors
    ///
    /// This function can fail if the Modbus server fails to bind to the
    /// configured address and port.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        // Start modbus server if enabled
        if config.modbus.enabled {
            self.start_modbus_server(config).await?;
        }

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Launch the modbus server daemon
    ///
    /// Binds the configured listener and spawns the accept loop in the
    /// background. Binding happens here, before any task is spawned, so a
    /// port conflict or privilege problem fails the launch instead of
    /// being buried in a task log.
    ///
    /// The server task continues running until the daemon's `running` flag
    /// is set to `false`.
    ///
    /// # Parameters
    ///
    /// * `config` - Application configuration containing Modbus server settings
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Success if the server started successfully, or error details
    ///
    /// # Errors
    ///
    /// This function can fail if:
    /// * The socket address is invalid
    /// * The server fails to bind to the specified address/port
    async fn start_modbus_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting modbus server on {}:{}",
            config.modbus.address, config.modbus.port
        );

        let socket_addr: SocketAddr = format!("{}:{}", config.modbus.address, config.modbus.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid Modbus socket address {}:{}",
                    config.modbus.address, config.modbus.port
                )
            })?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("Unable to bind Modbus listener on {}", socket_addr))?;

        let engine = ModbusEngine::from_config(config, unix_now());
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            // Run the accept loop in its own task so shutdown can abort a
            // blocked accept or read
            let server_handle = tokio::spawn(async move {
                if let Err(e) = serve_on(listener, engine).await {
                    error!("Modbus server error: {:#}", e);
                }
            });

            while running.load(Ordering::SeqCst) {
                // Check every second if we should continue running
                time::sleep(Duration::from_secs(1)).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            // Wait for the server to shut down with a timeout
            match tokio::time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => {
                    warn!("Modbus server shutdown timed out, forcing termination");
                }
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server started");
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    ///
    /// The heartbeat task runs every 60 seconds and continues until the
    /// daemon's `running` flag is set to `false`. In a production
    /// environment these messages can be watched by an external monitor to
    /// detect a wedged process.
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Success if the heartbeat task started successfully, or error details
    fn start_heartbeat(&mut self) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!("Daemon heartbeat: running");
                time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks gracefully
    ///
    /// Signals all spawned tasks to terminate by setting the shared `running`
    /// flag to `false`. Each task should periodically check this flag and
    /// perform a clean shutdown when the flag becomes `false`.
    ///
    /// This method only signals the tasks to stop; it does not wait for them
    /// to complete. To wait for all tasks to finish, call `join()` after this
    /// method.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        // Tasks should check the running flag and terminate gracefully
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for all spawned tasks to finish
    /// execution. This method should be called after `shutdown()` to ensure a
    /// clean application exit.
    ///
    /// If any task panics, the error is logged but this method will still
    /// wait for all other tasks to complete.
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Success if all tasks completed without errors
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(result) => {
                    if let Err(e) = result {
                        log::error!("Task panicked: {}", e);
                    }
                }
                Err(_) => {
                    // Task didn't complete within timeout
                    log::warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}
