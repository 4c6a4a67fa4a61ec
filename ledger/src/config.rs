//! Ledger and payment settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// Tokens granted to a user the first time they are seen
    #[serde(default = "default_initial_tokens")]
    pub initial_tokens: u64,

    /// Tokens credited for one verified payment
    #[serde(default = "default_tokens_per_payment")]
    pub tokens_per_payment: u64,

    /// Amount shown to the user, e.g. "50 000"
    #[serde(default = "default_payment_amount")]
    pub payment_amount: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_payment_receiver")]
    pub payment_receiver: String,

    /// Card number as shown to the user
    #[serde(default = "default_payment_card")]
    pub payment_card: String,

    /// Overrides the last four digits derived from `payment_card`
    #[serde(default)]
    pub payment_card_last4: Option<String>,

    #[serde(default = "default_payment_provider")]
    pub payment_provider: String,
}

fn default_initial_tokens() -> u64 {
    50
}

fn default_tokens_per_payment() -> u64 {
    50
}

fn default_payment_amount() -> String {
    "50000".to_string()
}

fn default_currency() -> String {
    "UZS".to_string()
}

fn default_payment_receiver() -> String {
    "Ochilova Ozoda".to_string()
}

fn default_payment_card() -> String {
    "4073 4200 6472 3764".to_string()
}

fn default_payment_provider() -> String {
    "Uzcard".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_tokens: default_initial_tokens(),
            tokens_per_payment: default_tokens_per_payment(),
            payment_amount: default_payment_amount(),
            currency: default_currency(),
            payment_receiver: default_payment_receiver(),
            payment_card: default_payment_card(),
            payment_card_last4: None,
            payment_provider: default_payment_provider(),
        }
    }
}

impl LedgerConfig {
    /// Last four digits of the receiving card
    pub fn card_last4(&self) -> String {
        if let Some(last4) = &self.payment_card_last4 {
            return last4.clone();
        }

        let digits: Vec<char> = self
            .payment_card
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }

    /// Numeric amount the verifier looks for on the receipt.
    ///
    /// Falls back to `tokens_per_payment` when the display amount has no digits.
    pub fn expected_amount(&self) -> u64 {
        let digits: String = self
            .payment_amount
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();

        match digits.parse::<u64>() {
            Ok(amount) if amount > 0 => amount,
            _ => self.tokens_per_payment,
        }
    }
}
