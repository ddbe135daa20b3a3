use crate::error::{PayoutError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a payment request, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a strictly positive monetary amount.
///
/// Wrapper around `rust_decimal::Decimal` so that a non-positive payout
/// amount cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PayoutError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PayoutError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum Currency {
    #[default]
    RUB,
    USD,
    EUR,
    GBP,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::RUB => "RUB",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        };
        f.write_str(code)
    }
}

/// Lifecycle status of a payment request.
///
/// Transitions only ever move forward along the graph; `Rejected`,
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Processing,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Outcome of a transition call: either the status changed, or the call was
/// illegal from the current status and left the request untouched.
///
/// Illegal calls are deliberately a silent no-op rather than an error. The
/// same operations serve user commands (where the caller pre-checks and
/// surfaces its own error) and the worker (where a stale read must not
/// corrupt state).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Transition {
    Applied,
    Skipped,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        *self == Transition::Applied
    }
}

/// Input for creating a payment request.
///
/// Field-level validation beyond amount positivity (account format etc.)
/// belongs to the caller; see `PayoutService::create`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NewPaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    pub recipient_name: String,
    pub recipient_account: String,
    #[serde(default)]
    pub recipient_bank: String,
    #[serde(default)]
    pub recipient_bank_code: String,
    #[serde(default)]
    pub description: String,
}

/// A payment-disbursement request and its lifecycle state.
///
/// The status field is only ever mutated through the transition methods
/// below, never by direct assignment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    pub id: RequestId,
    pub amount: Amount,
    pub currency: Currency,
    pub recipient_name: String,
    pub recipient_account: String,
    pub recipient_bank: String,
    pub recipient_bank_code: String,
    pub description: String,
    pub status: Status,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl PaymentRequest {
    /// Builds a new request in `Pending` status.
    pub fn new(input: NewPaymentRequest) -> Result<Self> {
        let amount = Amount::new(input.amount)?;
        let now = Utc::now();
        Ok(Self {
            id: RequestId::new(),
            amount,
            currency: input.currency,
            recipient_name: input.recipient_name,
            recipient_account: input.recipient_account,
            recipient_bank: input.recipient_bank,
            recipient_bank_code: input.recipient_bank_code,
            description: input.description,
            status: Status::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            Status::Rejected | Status::Completed | Status::Cancelled
        )
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, Status::Pending | Status::Processing)
    }

    /// Marks the request as picked up by the worker.
    pub fn start_processing(&mut self) -> Transition {
        match self.status {
            Status::Pending => {
                self.status = Status::Processing;
                self.touch();
                Transition::Applied
            }
            _ => Transition::Skipped,
        }
    }

    /// Approves the request.
    pub fn approve(&mut self) -> Transition {
        match self.status {
            Status::Pending | Status::Processing => {
                self.status = Status::Approved;
                self.touch();
                Transition::Applied
            }
            _ => Transition::Skipped,
        }
    }

    /// Rejects the request, recording the reason.
    ///
    /// Callers must pass a non-empty reason; the reason is what makes a
    /// rejected row actionable for reconciliation.
    pub fn reject(&mut self, reason: impl Into<String>) -> Transition {
        match self.status {
            Status::Pending | Status::Processing => {
                self.status = Status::Rejected;
                self.rejection_reason = Some(reason.into());
                self.touch();
                Transition::Applied
            }
            _ => Transition::Skipped,
        }
    }

    /// Marks an approved request as paid out, stamping `processed_at`.
    pub fn complete(&mut self) -> Transition {
        match self.status {
            Status::Approved => {
                self.status = Status::Completed;
                self.processed_at = Some(Utc::now());
                self.touch();
                Transition::Applied
            }
            _ => Transition::Skipped,
        }
    }

    /// Cancels the request if it has not yet reached a decision.
    pub fn cancel(&mut self) -> Transition {
        if self.can_be_cancelled() {
            self.status = Status::Cancelled;
            self.touch();
            Transition::Applied
        } else {
            Transition::Skipped
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
