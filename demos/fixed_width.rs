//! Writing and reading a fixed-width file.
//!
//! Run with: cargo run --example fixed_width

use serde::{Deserialize, Serialize};
use serde_flatfile::{converter, from_reader, to_writer, FieldDefinition, LayoutBuilder};
use std::error::Error;
use std::io::Cursor;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    id: u32,
    description: String,
    nullable_int: Option<i32>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let layout = LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("Id", 5, converter::integer()).align_right('0'))
        .field(FieldDefinition::new("Description", 20, converter::string()))
        .field(
            FieldDefinition::new("NullableInt", 3, converter::integer())
                .align_right('0')
                .nullable("   "),
        )
        .build()?;

    let entries: Vec<Entry> = (1..=5)
        .map(|id| Entry {
            id,
            description: format!("Description {}", id),
            nullable_int: if id == 5 { None } else { Some(id as i32 * 3) },
        })
        .collect();

    let mut file = Vec::new();
    let count = to_writer(&layout, &mut file, &entries)?;
    println!("Wrote {} records ({} bytes):", count, file.len());
    print!("{}", String::from_utf8(file.clone())?);

    println!("\nReading back:");
    for entry in from_reader::<Entry, _>(&layout, Cursor::new(file))? {
        println!("  {:?}", entry?);
    }

    println!("\nA short line aborts the read:");
    let damaged = "00001Description 1       003\n00002Descr\n";
    for result in from_reader::<Entry, _>(&layout, damaged.as_bytes())? {
        match result {
            Ok(entry) => println!("  ok: {:?}", entry),
            Err(err) => println!("  error: {}", err),
        }
    }

    Ok(())
}
