#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub stripe: Stripe,
    pub storefront: Storefront,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    /// ISO 4217, lowercase as Stripe expects.
    pub currency: String,
    pub webhook_tolerance_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct Storefront {
    pub base_url: String,
}

impl Storefront {
    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.base_url.trim_end_matches('/')
        )
    }

    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/checkout/cancel", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct AdminSecret {
    pub secret: String,
    pub token_ttl_hours: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_urls_keep_the_stripe_placeholder() {
        let storefront = Storefront {
            base_url: "https://gallery.test/".to_string(),
        };
        assert_eq!(
            storefront.checkout_success_url(),
            "https://gallery.test/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            storefront.checkout_cancel_url(),
            "https://gallery.test/checkout/cancel"
        );
    }
}
