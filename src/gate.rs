//! Inhibition gate that suppresses new triggers while a stimulus plays.
//!
//! The gate is a plain shared flag, not a counter: activating twice and then
//! deactivating once leaves it open. The single-slot scheduler never runs two
//! emissions at once, so nesting does not occur in practice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared inhibition flag. Clones observe and mutate the same flag.
#[derive(Debug, Clone, Default)]
pub struct InhibitionGate {
    inhibited: Arc<AtomicBool>,
}

impl InhibitionGate {
    /// Create an open (not inhibited) gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a stimulus as in progress
    pub fn activate(&self) {
        self.inhibited.store(true, Ordering::SeqCst);
    }

    /// Mark the stimulus as finished
    pub fn deactivate(&self) {
        self.inhibited.store(false, Ordering::SeqCst);
    }

    /// Whether new triggers are currently suppressed
    #[must_use]
    pub fn is_inhibited(&self) -> bool {
        self.inhibited.load(Ordering::SeqCst)
    }

    /// Activate the gate for the lifetime of the returned guard.
    ///
    /// The gate is deactivated when the guard drops, including during unwinding.
    #[must_use = "the gate is released as soon as the guard is dropped"]
    pub fn hold(&self) -> GateHold<'_> {
        self.activate();
        GateHold { gate: self }
    }
}

/// Scoped activation of an [`InhibitionGate`]
#[derive(Debug)]
pub struct GateHold<'a> {
    gate: &'a InhibitionGate,
}

impl Drop for GateHold<'_> {
    fn drop(&mut self) {
        self.gate.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_deactivate() {
        let gate = InhibitionGate::new();
        assert!(!gate.is_inhibited());

        gate.activate();
        assert!(gate.is_inhibited());

        gate.deactivate();
        assert!(!gate.is_inhibited());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = InhibitionGate::new();
        let observer = gate.clone();

        gate.activate();
        assert!(observer.is_inhibited());

        observer.deactivate();
        assert!(!gate.is_inhibited());
    }

    #[test]
    fn test_activation_is_not_counted() {
        let gate = InhibitionGate::new();
        gate.activate();
        gate.activate();
        gate.deactivate();
        assert!(!gate.is_inhibited());
    }

    #[test]
    fn test_hold_releases_on_drop() {
        let gate = InhibitionGate::new();
        {
            let _hold = gate.hold();
            assert!(gate.is_inhibited());
        }
        assert!(!gate.is_inhibited());
    }

    #[test]
    fn test_hold_releases_on_panic() {
        let gate = InhibitionGate::new();
        let worker_gate = gate.clone();

        let result = std::thread::spawn(move || {
            let _hold = worker_gate.hold();
            panic!("emission failed");
        })
        .join();

        assert!(result.is_err());
        assert!(!gate.is_inhibited());
    }
}
