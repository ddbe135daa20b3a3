use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 7] = [
    "amount",
    "currency",
    "recipient_name",
    "recipient_account",
    "recipient_bank",
    "recipient_bank_code",
    "description",
];

pub fn generate_requests_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    for i in 1..=rows {
        wtr.write_record(&[
            "1000.00",
            "RUB",
            &format!("User {}", i),
            &format!("100{}", i),
            "",
            "",
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
