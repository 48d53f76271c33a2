//! Error types for the billing service.

use serde::Serialize;

/// A single invalid request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamError {
    pub field: String,
    pub message: String,
}

/// Every invalid field found while validating one request, in the order
/// the checks ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamErrors(Vec<ParamError>);

impl ParamErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Records an invalid field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ParamError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamError> {
        self.0.iter()
    }

    /// Returns true if any recorded error is for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ParamErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ParamErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid parameters: ")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParamErrors {}

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("invoice status is not pending")]
    StatusNotPending,

    #[error("error calculating invoice amounts: {0}")]
    CalculatingAmounts(String),

    #[error("amount exceeds the representable range")]
    AmountOverflow,
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Entity not found")]
    NotFound,

    /// The record changed since it was read, or a unique key already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Application-level errors returned by the services.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ParamErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the validation errors, if this is a validation failure.
    pub fn param_errors(&self) -> Option<&ParamErrors> {
        match self {
            AppError::Validation(pes) => Some(pes),
            _ => None,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::Storage("record not found".into()),
            RepoError::Conflict(e) => AppError::Conflict(e),
            RepoError::Database(e) => AppError::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_errors_keep_order() {
        let mut pes = ParamErrors::new();
        pes.add("payment_methods", "at least one payment method is required");
        pes.add("tax_rate", "tax rate cannot be negative");

        let fields: Vec<_> = pes.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["payment_methods", "tax_rate"]);
        assert_eq!(pes.len(), 2);
        assert!(pes.has_field("tax_rate"));
    }

    #[test]
    fn test_empty_param_errors_are_ok() {
        assert!(ParamErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_param_errors_display() {
        let mut pes = ParamErrors::new();
        pes.add("amount", "amount is over limit");
        pes.add("invoice_id", "refunds require an invoice");
        assert_eq!(
            pes.to_string(),
            "Invalid parameters: amount: amount is over limit; invoice_id: refunds require an invoice"
        );
    }

    #[test]
    fn test_param_errors_serialize_as_list() {
        let mut pes = ParamErrors::new();
        pes.add("amount", "too big");
        let json = serde_json::to_value(&pes).unwrap();
        assert_eq!(json, serde_json::json!([{ "field": "amount", "message": "too big" }]));
    }

    #[test]
    fn test_repo_conflict_maps_to_app_conflict() {
        let err: AppError = RepoError::Conflict("stale".into()).into();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
