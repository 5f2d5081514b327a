//! Sealing anchor shared by capability traits that must not be implemented
//! outside this crate (the core owns the only valid state transitions).

pub trait Sealed {}
