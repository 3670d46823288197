//! Headless encounter runner for scripted testing and CI verification.
//!
//! This crate drives a [`tactics_core::session::TacticalSession`] without
//! any rendering layer, controlled via JSON commands on stdin with
//! responses on stdout. This enables:
//!
//! - **Scripted testing**: A controller can path, plan and take turns
//! - **CI verification**: Automated determinism checks per seed
//! - **Map review**: ASCII renderings of paths and movement ranges
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (find_path, move, end_turn, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"begin_encounter"}' | cargo run -p tactics_headless -- run
//!
//! # Run a scenario file
//! cargo run -p tactics_headless -- run --scenario scenarios/vault.ron
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --seed 42 --runs 5
//! ```

pub mod ascii_visualizer;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod verify;

pub use ascii_visualizer::{render_ascii, render_map, AsciiConfig, Overlay};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError, UnitPlacement};
pub use verify::{play_scripted, verify_determinism, PlaythroughSummary};
