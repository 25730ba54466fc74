//! Quoting, escaping and headers in delimited files.
//!
//! Run with: cargo run --example delimited

use serde::{Deserialize, Serialize};
use serde_flatfile::{
    converter, from_str, to_string, DelimitedOptions, FieldDefinition, LayoutBuilder,
    LineTerminator, Record,
};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Contact {
    name: String,
    city: String,
    note: String,
    age: Option<u8>,
}

fn contacts() -> Vec<Contact> {
    vec![
        Contact {
            name: "Doe, Jane".to_string(),
            city: "Lyon".to_string(),
            note: "prefers \"email\"".to_string(),
            age: Some(34),
        },
        Contact {
            name: "Smith".to_string(),
            city: "Oslo".to_string(),
            note: "first line\nsecond line".to_string(),
            age: None,
        },
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    let csv = LayoutBuilder::delimited(',')
        .with_header()
        .terminator(LineTerminator::CrLf)
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("city", converter::string()))
        .field(FieldDefinition::column("note", converter::string()))
        .field(FieldDefinition::column("age", converter::integer()).nullable(""))
        .build()?;

    let text = to_string(&csv, &contacts())?;
    println!("=== CSV with header ===");
    print!("{}", text);

    let back: Vec<Contact> = from_str(&csv, &text)?;
    assert_eq!(back, contacts());
    println!("Read back {} contacts unchanged", back.len());

    let escaped = LayoutBuilder::with_options(DelimitedOptions::csv().with_separator(';').with_escape('\\'))
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("city", converter::string()))
        .field(FieldDefinition::column("note", converter::string()))
        .field(FieldDefinition::column("age", converter::integer()).nullable(""))
        .build()?;

    println!("\n=== Semicolons with backslash escapes ===");
    print!("{}", to_string(&escaped, &contacts())?);

    let pipe = LayoutBuilder::with_options(DelimitedOptions::pipe())
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("city", converter::string()))
        .field(FieldDefinition::column("note", converter::string()))
        .field(FieldDefinition::column("age", converter::integer()).nullable(""))
        .build()?;

    println!("\n=== Pipes without quoting ===");
    match to_string(&pipe, &contacts()) {
        Ok(text) => print!("{}", text),
        Err(err) => println!("cannot write: {}", err),
    }

    println!("\n=== Dynamic records ===");
    let rows: Vec<Record> = from_str(&pipe, "Ng\\|Tran|Hanoi|vip|41\n")?;
    for (name, value) in rows[0].iter() {
        println!("  {} = {}", name, value);
    }

    Ok(())
}
