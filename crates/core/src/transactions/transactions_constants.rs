/// Transaction types
///
/// Each constant is the canonical wire/storage name of one transaction kind.

/// Purchase of shares. Increases quantity and feeds the cost basis.
pub const TRANSACTION_TYPE_BUY: &str = "BUY";

/// Disposal of shares. Decreases quantity.
pub const TRANSACTION_TYPE_SELL: &str = "SELL";

/// Cash dividend. No effect on quantity or cost basis.
pub const TRANSACTION_TYPE_DIVIDEND: &str = "DIVIDEND";

/// Stock split. Recorded for history only; ratios are not applied.
pub const TRANSACTION_TYPE_SPLIT: &str = "SPLIT";

/// Shares moved in from elsewhere. Treated like a purchase.
pub const TRANSACTION_TYPE_TRANSFER_IN: &str = "TRANSFER_IN";

/// Shares moved out. Treated like a sale.
pub const TRANSACTION_TYPE_TRANSFER_OUT: &str = "TRANSFER_OUT";

pub const ALL_TRANSACTION_TYPES: [&str; 6] = [
    TRANSACTION_TYPE_BUY,
    TRANSACTION_TYPE_SELL,
    TRANSACTION_TYPE_DIVIDEND,
    TRANSACTION_TYPE_SPLIT,
    TRANSACTION_TYPE_TRANSFER_IN,
    TRANSACTION_TYPE_TRANSFER_OUT,
];

/// Default page size for portfolio transaction listings.
pub const DEFAULT_TRANSACTION_PAGE_SIZE: i64 = 100;

/// Fractional-second digits kept on transaction timestamps (microseconds).
pub const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;
