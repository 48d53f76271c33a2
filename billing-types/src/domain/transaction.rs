//! Transaction domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invoice::InvoiceId;
use super::user::UserId;

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind of money movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Capture against an invoice
    Sale,
    /// Reversal of a previous capture; reopens the invoice
    Refund,
}

impl AsRef<str> for TransactionType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Sale => "sale",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(Self::Sale),
            "refund" => Ok(Self::Refund),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Outcome recorded for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Approved,
}

impl AsRef<str> for TransactionStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Approved => "approved",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Card network, derived from the card number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
    #[default]
    Unknown,
}

impl CardType {
    /// Classifies a card number by its leading digits.
    ///
    /// This is a prefix table, not a BIN lookup. Anything that does not
    /// match a known range, including an absent number, is `Unknown`.
    pub fn from_card_number(number: &str) -> Self {
        let digits: String = number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Self::Unknown;
        }

        let prefix = |len: usize| -> u32 {
            digits
                .get(..len)
                .and_then(|p| p.parse().ok())
                .unwrap_or(0)
        };

        if digits.starts_with('4') {
            Self::Visa
        } else if (51..=55).contains(&prefix(2)) || (2221..=2720).contains(&prefix(4)) {
            Self::Mastercard
        } else if prefix(2) == 34 || prefix(2) == 37 {
            Self::Amex
        } else if prefix(4) == 6011 || prefix(2) == 65 || (644..=649).contains(&prefix(3)) {
            Self::Discover
        } else {
            Self::Unknown
        }
    }
}

impl AsRef<str> for CardType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visa" => Ok(Self::Visa),
            "mastercard" => Ok(Self::Mastercard),
            "amex" => Ok(Self::Amex),
            "discover" => Ok(Self::Discover),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown card type: {}", other)),
        }
    }
}

/// Card details captured with a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: String,
    /// Expiration as MMYY
    pub expiration_date: String,
}

/// Snapshot of the payment method a transaction was made with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPaymentMethod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
}

impl TransactionPaymentMethod {
    /// Returns the card type of the snapshot, `Unknown` without a card.
    pub fn card_type(&self) -> CardType {
        self.card
            .as_ref()
            .map(|c| CardType::from_card_number(&c.number))
            .unwrap_or_default()
    }
}

/// A recorded financial transaction.
///
/// Transactions are immutable once created. Corrections are new
/// transactions, e.g. a refund rather than an edited sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Owning user
    pub user_id: UserId,
    /// Invoice the transaction applies to, if any
    pub invoice_id: Option<InvoiceId>,
    pub transaction_type: TransactionType,
    /// Amount actually charged (or returned) in minor currency units
    pub amount_captured: u64,
    pub card_type: CardType,
    pub status: TransactionStatus,
    pub payment_method: TransactionPaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visa_prefix() {
        assert_eq!(CardType::from_card_number("4111111111111111"), CardType::Visa);
        assert_eq!(CardType::from_card_number("4111 1111 1111 1111"), CardType::Visa);
    }

    #[test]
    fn test_mastercard_prefixes() {
        assert_eq!(CardType::from_card_number("5555555555554444"), CardType::Mastercard);
        assert_eq!(CardType::from_card_number("2223003122003222"), CardType::Mastercard);
        assert_eq!(CardType::from_card_number("5655555555554444"), CardType::Unknown);
    }

    #[test]
    fn test_amex_and_discover_prefixes() {
        assert_eq!(CardType::from_card_number("378282246310005"), CardType::Amex);
        assert_eq!(CardType::from_card_number("341111111111111"), CardType::Amex);
        assert_eq!(CardType::from_card_number("6011111111111117"), CardType::Discover);
        assert_eq!(CardType::from_card_number("6500000000000002"), CardType::Discover);
    }

    #[test]
    fn test_unmatched_numbers_are_unknown() {
        assert_eq!(CardType::from_card_number(""), CardType::Unknown);
        assert_eq!(CardType::from_card_number("9999999999999999"), CardType::Unknown);
        assert_eq!(CardType::from_card_number("4abc"), CardType::Unknown);
    }

    #[test]
    fn test_payment_method_without_card_is_unknown() {
        let pm = TransactionPaymentMethod::default();
        assert_eq!(pm.card_type(), CardType::Unknown);
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!("sale".parse::<TransactionType>(), Ok(TransactionType::Sale));
        assert_eq!("refund".parse::<TransactionType>(), Ok(TransactionType::Refund));
        assert!("capture".parse::<TransactionType>().is_err());
    }
}
