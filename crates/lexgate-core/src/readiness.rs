// crates/lexgate-core/src/readiness.rs
// ============================================================================
// Module: Readiness Gate
// Description: Startup-state tracking for the inner tool application.
// Purpose: Reject requests early while the inner application initializes.
// Dependencies: std atomics
// ============================================================================

//! ## Overview
//! The readiness gate tracks whether the inner tool-execution application
//! has completed startup. While not ready, the interceptor rejects every
//! protocol-relevant request instead of forwarding it: forwarding during
//! startup races uninitialized downstream resources and surfaces as an
//! opaque internal error rather than a clean rejection. The flag is an
//! atomic because it is written from lifecycle hooks and read from
//! arbitrary concurrent request handlers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

// ============================================================================
// SECTION: States
// ============================================================================

/// Lifecycle state of the inner application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// Startup in progress; requests are rejected.
    Starting,
    /// Startup complete; requests may be forwarded.
    Ready,
    /// Startup failed; requests are rejected so retries fail cleanly.
    Failed,
}

/// Wire encoding for [`ReadinessState::Starting`].
const STATE_STARTING: u8 = 0;
/// Wire encoding for [`ReadinessState::Ready`].
const STATE_READY: u8 = 1;
/// Wire encoding for [`ReadinessState::Failed`].
const STATE_FAILED: u8 = 2;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Concurrent readiness flag for the inner application.
///
/// # Invariants
/// - Safe to call from lifecycle callbacks concurrently with `is_ready`
///   reads from in-flight requests.
/// - `Failed` still answers `is_ready() == false`.
#[derive(Debug)]
pub struct ReadinessGate {
    /// Encoded lifecycle state.
    state: AtomicU8,
}

impl ReadinessGate {
    /// Builds a gate in the `Starting` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_STARTING),
        }
    }

    /// Marks startup in progress (also used on shutdown).
    pub fn mark_starting(&self) {
        self.state.store(STATE_STARTING, Ordering::SeqCst);
    }

    /// Marks the inner application ready to receive forwarded requests.
    pub fn mark_ready(&self) {
        self.state.store(STATE_READY, Ordering::SeqCst);
    }

    /// Marks startup as failed; retries are rejected cleanly.
    pub fn mark_failed(&self) {
        self.state.store(STATE_FAILED, Ordering::SeqCst);
    }

    /// Returns true only in the `Ready` state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_READY
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReadinessState {
        match self.state.load(Ordering::SeqCst) {
            STATE_READY => ReadinessState::Ready,
            STATE_FAILED => ReadinessState::Failed,
            _ => ReadinessState::Starting,
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
