//! # cita-core
//!
//! Foundation types for the cita dialogue engine.
//!
//! This crate provides the shared vocabulary that all other cita crates
//! depend on:
//!
//! - **Flows and states**: [`state::Flow`], [`state::State`] as closed enums
//!   with stable wire labels
//! - **Transition table**: [`state::TransitionTable`], the single authority
//!   on which state changes are legal
//! - **Directives**: [`state::Directive`], static per-state instructions
//!   that parametrize the planner call
//! - **Intent routing**: [`intent::IntentRouter`], pre-emptive flow switches
//!   from raw user text, plus language detection
//! - **Messages**: [`messages::Message`] and the append-ordered
//!   [`messages::History`]
//! - **Sessions**: [`session::Session`] aggregate with collected data and
//!   retry counters
//! - **Errors**: [`errors::CoreError`] hierarchy via `thiserror`
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other cita crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod intent;
pub mod logging;
pub mod messages;
pub mod session;
pub mod state;
pub mod templates;
