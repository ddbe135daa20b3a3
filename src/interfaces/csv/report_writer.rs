use crate::domain::request::{Currency, PaymentRequest, RequestId, Status};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ReportRow {
    id: RequestId,
    status: Status,
    amount: Decimal,
    currency: Currency,
    recipient_account: String,
    processed_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl From<&PaymentRequest> for ReportRow {
    fn from(request: &PaymentRequest) -> Self {
        Self {
            id: request.id,
            status: request.status,
            amount: request.amount.value(),
            currency: request.currency,
            recipient_account: request.recipient_account.clone(),
            processed_at: request.processed_at,
            rejection_reason: request.rejection_reason.clone(),
        }
    }
}

/// Writes the final state of requests as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    pub fn write_requests(&mut self, requests: &[PaymentRequest]) -> Result<()> {
        for request in requests {
            self.writer.serialize(ReportRow::from(request))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
