//! Step and compensation names shared by the saga definitions.

// Domestic pipeline.
pub const INITIATE_PAYMENT: &str = "initiate_payment";
pub const MANAGE_ORDER: &str = "manage_order";
pub const AUTHORIZE_PAYMENT: &str = "authorize_payment";
pub const EXECUTE_PAYMENT: &str = "execute_payment";
pub const CLEAR_AND_SETTLE: &str = "clear_and_settle";
pub const SEND_NOTIFICATION: &str = "send_notification";
pub const RECONCILE_PAYMENT: &str = "reconcile_payment";
pub const POST_PAYMENT: &str = "post_payment";
pub const GENERATE_REPORTS: &str = "generate_reports";
pub const ARCHIVE_PAYMENT: &str = "archive_payment";

// Cross-border pipeline.
pub const DEBIT_ACCOUNT: &str = "debit_account";
pub const RESERVE_CURRENCY: &str = "reserve_currency";
pub const SANCTIONS_CHECK: &str = "sanctions_check";
pub const TRANSFER_FUNDS: &str = "transfer_funds";
pub const CREDIT_BENEFICIARY: &str = "credit_beneficiary";

// Cross-border compensations.
pub const DEBIT_COMPENSATION: &str = "debit_compensation";
pub const RELEASE_CURRENCY: &str = "release_currency";
pub const RECALL_FUNDS: &str = "recall_funds";
pub const REFUND_BENEFICIARY: &str = "refund_beneficiary";

// Refund pipeline.
pub const REFUND_PAYMENT: &str = "refund_payment";

/// Domestic step names in documented order.
pub const DOMESTIC_STEPS: [&str; 10] = [
    INITIATE_PAYMENT,
    MANAGE_ORDER,
    AUTHORIZE_PAYMENT,
    EXECUTE_PAYMENT,
    CLEAR_AND_SETTLE,
    SEND_NOTIFICATION,
    RECONCILE_PAYMENT,
    POST_PAYMENT,
    GENERATE_REPORTS,
    ARCHIVE_PAYMENT,
];
