//! # Task Agent
//!
//! A terminal agent that works through a task with a language model and a
//! small set of local tools.
//!
//! This library provides:
//! - A tool registry (list, read, create and edit files; run shell commands)
//! - A confirmation gate that asks the operator before any shell command runs
//! - A tool-based agent loop with an iteration cap and token accounting
//! - A client for the OpenAI Responses API
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a task from the operator
//! 2. Append it to the session's conversation
//! 3. Call the model, execute any tool calls it requests
//! 4. Feed results back to the model, repeat until it answers
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use task_agent::{agent::{Agent, Session}, confirm::TerminalGate, console::Console, Config};
//!
//! let config = Config::from_env()?;
//! let console = Arc::new(Console::stdio());
//! let agent = Agent::new(config, Arc::new(TerminalGate::new(console)));
//! let mut session = Session::new();
//! let report = agent.run_task(&mut session, "List the files here", &Default::default()).await;
//! ```

pub mod agent;
pub mod config;
pub mod confirm;
pub mod console;
pub mod llm;
pub mod tools;

pub use config::Config;
