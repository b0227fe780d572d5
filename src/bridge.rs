// bridge.rs
// Dolphin ↔ Rococo/Karura bridge: form state, balance polling, XCM sends.

pub mod context;
pub mod fetch;
pub mod state;
pub mod validation;
pub mod xcm;

pub use context::{BridgeContext, BridgePhase};
pub use state::{reduce, BridgeAction, BridgeState};
pub use validation::{
    form_is_valid, max_sendable_balance, receiver_amount_is_over_existential_deposit,
    reserved_native_token_balance, tx_would_deplete_suggested_min_fee_balance,
    user_can_pay_fee, user_has_sufficient_funds,
};
pub use xcm::{route, SendError, TransferFn};
