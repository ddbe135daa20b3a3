use crate::domain::request::NewPaymentRequest;
use crate::error::{PayoutError, Result};
use std::io::Read;

/// Reads new-request rows from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over
/// `Result<NewPaymentRequest>`, trimming whitespace automatically. Expected
/// header: `amount, currency, recipient_name, recipient_account,
/// recipient_bank, recipient_bank_code, description`.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes request rows.
    pub fn requests(self) -> impl Iterator<Item = Result<NewPaymentRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PayoutError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::Currency;
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "amount, currency, recipient_name, recipient_account, recipient_bank, recipient_bank_code, description";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n1000.00, RUB, Test User, 1234567890, Test Bank, 044525225, Salary\n5.50, USD, Other User, 42, , , "
        );
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<NewPaymentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.amount, dec!(1000.00));
        assert_eq!(first.currency, Currency::RUB);
        assert_eq!(first.recipient_account, "1234567890");

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.currency, Currency::USD);
        assert!(second.recipient_bank.is_empty());
    }

    #[test]
    fn test_reader_malformed_amount() {
        let data = format!("{HEADER}\nnot_a_number, RUB, Test User, 42, , , ");
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<NewPaymentRequest>> = reader.requests().collect();

        assert!(results[0].is_err());
    }

    #[test]
    fn test_reader_unknown_currency() {
        let data = format!("{HEADER}\n10.00, DOGE, Test User, 42, , , ");
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<NewPaymentRequest>> = reader.requests().collect();

        assert!(results[0].is_err());
    }
}
