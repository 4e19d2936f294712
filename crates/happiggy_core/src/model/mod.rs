//! Domain model for bottles and the notes deposited into them.
//!
//! # Responsibility
//! - Define the canonical records shared by storage, services and FFI.
//! - Own structural invariants (`validate()`) and state transitions
//!   (deposit, open).
//!
//! # Invariants
//! - Every bottle and note is identified by a stable, non-nil UUID.
//! - A bottle exclusively owns its notes; deleting it deletes them.
//! - An opened bottle is terminal: it never accepts notes or closes again.

pub mod bottle;
pub mod error;
pub mod note;
pub mod notification;
