//! Tooldeck is a terminal console for an MCP-style tool-provider manager
//! backend: it registers and deregisters tool-provider servers, replays a
//! durable local history at boot so connections survive a backend restart,
//! and runs a session-token chat with the backend's tool-aware assistant.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns client state: the append-only event timeline, the
//!   connection history store and its boot-time reconciler, the tool
//!   inventory cache, and the chat session machine.
//! - [`api`] defines the backend REST payloads and the [`api::client::Backend`]
//!   seam with its reqwest implementation.
//! - [`commands`] parses the slash commands accepted by the input box.
//! - [`ui`] renders the terminal interface and runs the controller loop that
//!   bridges user input, background network tasks, and display updates.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`cli::run`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;
