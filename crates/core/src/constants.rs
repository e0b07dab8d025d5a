/// Decimal places used when presenting money values.
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Decimal places used when presenting share quantities.
pub const QUANTITY_DISPLAY_PRECISION: u32 = 8;
