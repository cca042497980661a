//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing a payment for an entity.
#[derive(Clone, Copy, Debug)]
pub struct Payment;
