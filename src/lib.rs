//! Parley - a conversational document Q&A service with an appointment
//! booking flow.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod build_info;
pub mod config;
pub mod sync;

// ============================================================================
// Server & HTTP
// ============================================================================

pub mod api;
pub mod handlers;
pub mod server;

// ============================================================================
// Domain
// ============================================================================

pub mod booking;
pub mod conversation;
pub mod llm;
pub mod retrieval;
pub mod session;
