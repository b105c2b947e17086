//! Booking saga step names.

/// Step name: Lock the requested seats for the attempt's ticket.
pub const STEP_LOCK_SEATS: &str = "lock_seats";

/// Step name: Persist the pending ticket.
pub const STEP_CREATE_TICKET: &str = "create_ticket";

/// Step name: Charge the customer through the gateway.
pub const STEP_CHARGE_PAYMENT: &str = "charge_payment";

/// Step name: Mark the locked seats as booked.
pub const STEP_CONFIRM_SEATS: &str = "confirm_seats";
