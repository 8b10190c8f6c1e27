pub mod admin_auth;
pub mod checkout;
pub mod orders;
pub mod stripe_webhook;
