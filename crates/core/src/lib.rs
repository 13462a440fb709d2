//! Core state machine for the LogiBots guided study experience.
//!
//! This crate implements the client-side conversational flow that drives the
//! SAEL/LogiBots quiz and chat features: an explicit finite-state controller
//! ([`flow::QuizFlow`]) that owns the conversation transcript and the attempt
//! history, and talks to the remote dialogue backend through the
//! [`gateway::DialogueGateway`] trait. All side effects (HTTP, persistence)
//! live behind that seam so the flow itself stays deterministic and testable.

pub mod answer;
pub mod flow;
pub mod gateway;
pub mod history;
pub mod payload;
pub mod question;
pub mod transcript;
