//! Core type definitions for the simulation kernel.
//!
//! This module defines the time representation and the standard phase names
//! shared by every model in the hierarchy.

/// Logical simulation time.
///
/// Time is a scalar that advances in irregular jumps from one scheduled
/// activity to the next. It never relates to wall-clock time.
pub type SimTime = f64;

/// The "no further scheduled activity" sentinel.
///
/// A model whose time advance is `INFINITY` is passive; a simulation whose
/// next event time is `INFINITY` has nothing left to do.
pub const INFINITY: SimTime = f64::INFINITY;

/// Standard phase of a model with a finite time advance.
pub const PHASE_ACTIVE: &str = "active";

/// Standard phase of a model waiting only for external input.
pub const PHASE_PASSIVE: &str = "passive";
