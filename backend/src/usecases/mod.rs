pub mod admin_auth;
pub mod checkout;
pub mod orders;
pub mod payment_reconciliation;
pub mod stripe_gateway;
