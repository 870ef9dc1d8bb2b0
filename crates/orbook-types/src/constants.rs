//! System-wide constants for the Orbook venue.

/// Default maximum fractional digits for prices.
pub const PRICE_PRECISION: u32 = 8;

/// Default maximum fractional digits for quantities.
pub const QTY_PRECISION: u32 = 8;

/// Upper bound on `price_precision + quantity_precision`. `rust_decimal`
/// carries at most 28 fractional digits, so a notional with more would be
/// rounded.
pub const MAX_COMBINED_PRECISION: u32 = 28;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Venue name.
pub const VENUE_NAME: &str = "Orbook";
