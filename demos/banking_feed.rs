//! Implied decimals, dates and fillers in a bank statement export.
//!
//! Run with: cargo run --example banking_feed

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_flatfile::converter::{self, BoolConverter};
use serde_flatfile::{from_str, Decimal, FieldDefinition, LayoutBuilder, RecordWriter};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
enum Direction {
    Dr,
    Cr,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Booking {
    account: String,
    booked: NaiveDate,
    direction: Direction,
    amount: Decimal,
    reversal: bool,
    reference: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let layout = LayoutBuilder::fixed_width()
        .filler_char('*')
        .field(FieldDefinition::new("account", 10, converter::string()))
        .filler(1)
        .field(FieldDefinition::new("booked", 8, converter::date("%Y%m%d")))
        .field(FieldDefinition::new("direction", 2, converter::string()))
        .field(
            FieldDefinition::new("amount", 12, converter::decimal().with_implied_scale(2))
                .align_right('0'),
        )
        .field(FieldDefinition::new("reversal", 1, BoolConverter::new("R", "N")))
        .filler(2)
        .field(
            FieldDefinition::new("reference", 16, converter::string())
                .truncate()
                .nullable("")
                .optional(),
        )
        .build()?;

    let bookings = vec![
        Booking {
            account: "NL01BANK".to_string(),
            booked: NaiveDate::from_ymd_opt(2024, 1, 31).ok_or("bad date")?,
            direction: Direction::Cr,
            amount: "2500.00".parse()?,
            reversal: false,
            reference: Some("SALARY JANUARY 2024".to_string()),
        },
        Booking {
            account: "NL01BANK".to_string(),
            booked: NaiveDate::from_ymd_opt(2024, 2, 1).ok_or("bad date")?,
            direction: Direction::Dr,
            amount: "79.9".parse()?,
            reversal: true,
            reference: None,
        },
    ];

    let mut writer = RecordWriter::new(&layout, Vec::new())?;
    for booking in &bookings {
        writer.write(booking)?;
    }
    println!("Wrote {} bookings", writer.written());
    let feed = String::from_utf8(writer.into_inner()?)?;
    print!("{}", feed);

    println!("\nParsed:");
    let parsed: Vec<Booking> = from_str(&layout, &feed)?;
    for booking in &parsed {
        println!(
            "  {} {} {:?} {} reversal={} ref={:?}",
            booking.account,
            booking.booked,
            booking.direction,
            booking.amount,
            booking.reversal,
            booking.reference
        );
    }

    let total: f64 = parsed
        .iter()
        .map(|b| match b.direction {
            Direction::Cr => b.amount.to_f64(),
            Direction::Dr => -b.amount.to_f64(),
        })
        .sum();
    println!("\nNet movement: {:.2}", total);

    Ok(())
}
