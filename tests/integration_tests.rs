use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_flatfile::converter::{self, BoolConverter};
use serde_flatfile::{
    from_reader, from_str, to_string, to_writer, DelimitedOptions, Decimal, Error,
    FieldDefinition, Layout, LayoutBuilder, LineTerminator, Record, RecordWriter, Value,
};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    id: u32,
    description: String,
    nullable_int: Option<i32>,
}

fn entry(id: u32, nullable_int: Option<i32>) -> Entry {
    Entry {
        id,
        description: format!("Description {}", id),
        nullable_int,
    }
}

fn entry_layout() -> Layout {
    LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("Id", 5, converter::integer()).align_right('0'))
        .field(FieldDefinition::new("Description", 20, converter::string()))
        .field(
            FieldDefinition::new("NullableInt", 3, converter::integer())
                .align_right('0')
                .nullable("   "),
        )
        .build()
        .unwrap()
}

#[test]
fn test_fixed_width_scenario() {
    let entries = vec![entry(1, Some(3)), entry(5, None)];
    let text = to_string(&entry_layout(), &entries).unwrap();
    assert_eq!(
        text,
        "00001Description 1       003\n00005Description 5          \n"
    );

    let back: Vec<Entry> = from_str(&entry_layout(), &text).unwrap();
    assert_eq!(back, entries);
}

#[test]
fn test_count_and_order_preserved() {
    let entries: Vec<Entry> = (1..=250)
        .map(|i| entry(i, if i % 3 == 0 { None } else { Some(i as i32 % 1000) }))
        .collect();
    let text = to_string(&entry_layout(), &entries).unwrap();
    assert_eq!(text.lines().count(), 250);

    let back: Vec<Entry> = from_str(&entry_layout(), &text).unwrap();
    assert_eq!(back, entries);
}

#[test]
fn test_short_record_fails_fast() {
    let input = "00001Description 1       003\n00002Desc\n00003Description 3       001\n";
    let mut reader = from_reader::<Entry, _>(&entry_layout(), input.as_bytes()).unwrap();

    let first = reader.next().unwrap().unwrap();
    assert_eq!(first, entry(1, Some(3)));

    match reader.next() {
        Some(Err(Error::RecordTooShort {
            line,
            expected,
            found,
        })) => {
            assert_eq!(line, 2);
            assert_eq!(expected, 28);
            assert_eq!(found, 9);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(reader.next().is_none());
    assert!(reader.next().is_none());
}

#[test]
fn test_conversion_error_names_field_and_token() {
    let input = "00001Description 1       003\n000x2Description 2       004\n";
    let err = from_str::<Entry>(&entry_layout(), input).unwrap_err();
    match err {
        Error::Conversion {
            line, field, raw, ..
        } => {
            assert_eq!(line, 2);
            assert_eq!(field, "Id");
            assert_eq!(raw, "000x2");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_overflow_policies() {
    #[derive(Serialize)]
    struct Code {
        code: String,
    }

    let strict = LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("code", 5, converter::string()))
        .build()
        .unwrap();
    let err = to_string(&strict, &[Code { code: "TooLongValue".into() }]).unwrap_err();
    assert!(matches!(
        err,
        Error::FieldOverflow {
            entity: 1,
            width: 5,
            length: 12,
            ..
        }
    ));

    let lenient = LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("code", 5, converter::string()).truncate())
        .build()
        .unwrap();
    let text = to_string(&lenient, &[Code { code: "TooLongValue".into() }]).unwrap();
    assert_eq!(text, "TooLo\n");
}

#[test]
fn test_write_error_reports_entity_ordinal() {
    let entries = vec![entry(1, Some(1)), entry(2, Some(2)), entry(3, Some(4000))];
    let mut buffer = Vec::new();
    let err = to_writer(&entry_layout(), &mut buffer, &entries).unwrap_err();
    assert_eq!(err.entity(), Some(3));
    match err {
        Error::FieldOverflow { field, .. } => assert_eq!(field, "NullableInt"),
        other => panic!("unexpected {:?}", other),
    }
    // no rollback of what was already written
    assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 2);
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Contact {
    name: String,
    note: String,
    age: Option<u8>,
}

fn contact_layout(builder: LayoutBuilder) -> Layout {
    builder
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("note", converter::string()))
        .field(FieldDefinition::column("age", converter::integer()).nullable(""))
        .build()
        .unwrap()
}

#[test]
fn test_csv_quoting_roundtrip() {
    let layout = contact_layout(LayoutBuilder::delimited(','));
    let contacts = vec![
        Contact {
            name: "Doe, Jane".into(),
            note: "said \"hi\"".into(),
            age: Some(41),
        },
        Contact {
            name: "Plain".into(),
            note: "line one\nline two".into(),
            age: None,
        },
    ];

    let text = to_string(&layout, &contacts).unwrap();
    assert_eq!(
        text,
        "\"Doe, Jane\",\"said \"\"hi\"\"\",41\nPlain,\"line one\nline two\",\n"
    );

    let back: Vec<Contact> = from_str(&layout, &text).unwrap();
    assert_eq!(back, contacts);
}

#[test]
fn test_escape_character_roundtrip() {
    let layout = contact_layout(LayoutBuilder::with_options(
        DelimitedOptions::csv().with_escape('\\'),
    ));
    let contacts = vec![Contact {
        name: "C:\\temp".into(),
        note: "a \"quoted\", b".into(),
        age: Some(7),
    }];

    let text = to_string(&layout, &contacts).unwrap();
    assert_eq!(text, "\"C:\\\\temp\",\"a \\\"quoted\\\", b\",7\n");
    let back: Vec<Contact> = from_str(&layout, &text).unwrap();
    assert_eq!(back, contacts);
}

#[test]
fn test_pipe_without_quotes() {
    let layout = contact_layout(LayoutBuilder::with_options(DelimitedOptions::pipe()));
    let contacts = vec![Contact {
        name: "a|b".into(),
        note: "plain".into(),
        age: None,
    }];
    let text = to_string(&layout, &contacts).unwrap();
    assert_eq!(text, "a\\|b|plain|\n");
    assert_eq!(from_str::<Contact>(&layout, &text).unwrap(), contacts);

    let multiline = vec![Contact {
        name: "x".into(),
        note: "two\nlines".into(),
        age: None,
    }];
    assert!(matches!(
        to_string(&layout, &multiline),
        Err(Error::Unrepresentable { entity: 1, .. })
    ));
}

#[test]
fn test_unterminated_quote_at_end_of_input() {
    let layout = contact_layout(LayoutBuilder::delimited(','));
    let err = from_str::<Contact>(&layout, "a,b,1\n\"open,b,2\nstill open\n").unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_token_count_mismatch() {
    let layout = contact_layout(LayoutBuilder::delimited(','));
    let err = from_str::<Contact>(&layout, "a,b,1\na,b,1,extra\n").unwrap_err();
    assert!(matches!(
        err,
        Error::TokenCountMismatch {
            line: 2,
            expected: 3,
            found: 4
        }
    ));
}

#[test]
fn test_header_written_and_skipped() {
    let layout = LayoutBuilder::delimited('\t')
        .with_header()
        .terminator(LineTerminator::CrLf)
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("note", converter::string()))
        .field(FieldDefinition::column("age", converter::integer()).nullable(""))
        .build()
        .unwrap();

    let contacts = vec![Contact {
        name: "Ann".into(),
        note: "tab\there".into(),
        age: Some(30),
    }];
    let text = to_string(&layout, &contacts).unwrap();
    assert_eq!(text, "name\tnote\tage\r\nAnn\t\"tab\there\"\t30\r\n");

    let back: Vec<Contact> = from_str(&layout, &text).unwrap();
    assert_eq!(back, contacts);
}

#[test]
fn test_optional_trailing_columns() {
    let layout = LayoutBuilder::delimited(',')
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("note", converter::string()).optional())
        .field(
            FieldDefinition::column("age", converter::integer())
                .nullable("")
                .optional(),
        )
        .build()
        .unwrap();

    let back: Vec<Contact> = from_str(&layout, "Ann\nBob,hello\nCy,x,5\n").unwrap();
    assert_eq!(back[0].note, "");
    assert_eq!(back[0].age, None);
    assert_eq!(back[1].note, "hello");
    assert_eq!(back[2].age, Some(5));
}

#[test]
fn test_blank_lines() {
    let input = "00001Description 1       003\n\n00002Description 2          \n";

    let with_blanks: Vec<Entry> = from_str(&entry_layout(), input).unwrap();
    assert_eq!(with_blanks.len(), 3);
    assert_eq!(
        with_blanks[1],
        Entry {
            id: 0,
            description: String::new(),
            nullable_int: None
        }
    );

    let skipping = LayoutBuilder::fixed_width()
        .skip_blank_lines()
        .field(FieldDefinition::new("Id", 5, converter::integer()).align_right('0'))
        .field(FieldDefinition::new("Description", 20, converter::string()))
        .field(
            FieldDefinition::new("NullableInt", 3, converter::integer())
                .align_right('0')
                .nullable("   "),
        )
        .build()
        .unwrap();
    let without_blanks: Vec<Entry> = from_str(&skipping, input).unwrap();
    assert_eq!(without_blanks, vec![entry(1, Some(3)), entry(2, None)]);
}

#[test]
fn test_crlf_input_reads_like_lf() {
    let input = "00001Description 1       003\r\n00002Description 2          \r\n";
    let back: Vec<Entry> = from_str(&entry_layout(), input).unwrap();
    assert_eq!(back, vec![entry(1, Some(3)), entry(2, None)]);
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Payment {
    account: String,
    #[serde(rename = "type")]
    kind: PaymentKind,
    amount: Decimal,
    booked: NaiveDate,
    urgent: bool,
    currency: char,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
enum PaymentKind {
    Debit,
    Credit,
}

fn payment_layout() -> Layout {
    LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("account", 8, converter::string()))
        .filler(2)
        .field(FieldDefinition::new("type", 6, converter::string()))
        .field(
            FieldDefinition::new("amount", 10, converter::decimal().with_implied_scale(2))
                .align_right('0'),
        )
        .field(FieldDefinition::new("booked", 8, converter::date("%Y%m%d")))
        .field(FieldDefinition::new("urgent", 1, BoolConverter::new("Y", "N")))
        .field(FieldDefinition::new("currency", 1, converter::character()))
        .filler_char('.')
        .build()
        .unwrap()
}

#[test]
fn test_typed_fields_roundtrip() {
    let payments = vec![
        Payment {
            account: "ACC-001".into(),
            kind: PaymentKind::Credit,
            amount: "1234.50".parse().unwrap(),
            booked: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            urgent: true,
            currency: 'E',
        },
        Payment {
            account: "ACC-002".into(),
            kind: PaymentKind::Debit,
            amount: "-7".parse().unwrap(),
            booked: NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
            urgent: false,
            currency: 'U',
        },
    ];

    let text = to_string(&payment_layout(), &payments).unwrap();
    assert_eq!(
        text,
        "ACC-001 ..Credit000012345020240309YE\nACC-002 ..Debit 000000-70019991231NU\n"
    );

    let back: Vec<Payment> = from_str(&payment_layout(), &text).unwrap();
    assert_eq!(back, payments);
}

#[test]
fn test_implied_scale_rejects_lost_digits() {
    let payments = vec![Payment {
        account: "A".into(),
        kind: PaymentKind::Debit,
        amount: "0.125".parse().unwrap(),
        booked: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        urgent: false,
        currency: 'E',
    }];
    let err = to_string(&payment_layout(), &payments).unwrap_err();
    assert!(matches!(err, Error::Format { entity: 1, ref field, .. } if field == "amount"));
}

#[test]
fn test_unknown_enum_variant_is_entity_error() {
    let text = "ACC-001 ..Refund000012345020240309YE\n";
    let err = from_str::<Payment>(&payment_layout(), text).unwrap_err();
    assert!(matches!(err, Error::EntityConstruction { line: 1, .. }), "{:?}", err);
}

#[test]
fn test_dynamic_records() {
    let layout = payment_layout();
    let text = "ACC-001 ..Credit000012345020240309YE\n";
    let records: Vec<Record> = from_str(&layout, text).unwrap();
    let record = &records[0];

    assert_eq!(record.get("amount"), Some(&Value::Decimal("1234.50".parse().unwrap())));
    assert_eq!(
        record.get("booked").and_then(Value::as_date),
        NaiveDate::from_ymd_opt(2024, 3, 9)
    );
    assert_eq!(record.get("urgent"), Some(&Value::Bool(true)));

    let again = to_string(&layout, &records).unwrap();
    assert_eq!(again, text);
}

#[test]
fn test_json_values_as_entities() {
    let layout = contact_layout(LayoutBuilder::delimited(';'));
    let rows: Vec<serde_json::Value> = from_str(&layout, "Ann;hi;30\nBob;;\n").unwrap();
    assert_eq!(rows[0], serde_json::json!({"name": "Ann", "note": "hi", "age": 30}));
    assert_eq!(rows[1], serde_json::json!({"name": "Bob", "note": "", "age": null}));

    let text = to_string(&layout, &rows).unwrap();
    assert_eq!(text, "Ann;hi;30\nBob;;\n");
}

#[test]
fn test_unmapped_properties() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Wide {
        name: String,
        note: String,
        age: Option<u8>,
        internal_id: u64,
        #[serde(default)]
        tag: String,
    }

    let layout = contact_layout(LayoutBuilder::delimited(','));
    let text = to_string(
        &layout,
        &[Wide {
            name: "Ann".into(),
            note: "n".into(),
            age: None,
            internal_id: 99,
            tag: "x".into(),
        }],
    )
    .unwrap();
    assert_eq!(text, "Ann,n,\n");

    // internal_id has no column and no default
    let err = from_str::<Wide>(&layout, &text).unwrap_err();
    assert!(matches!(err, Error::EntityConstruction { line: 1, .. }));
}

#[test]
fn test_missing_entity_field_on_write() {
    #[derive(Serialize)]
    struct Narrow {
        name: String,
    }

    let layout = contact_layout(LayoutBuilder::delimited(','));
    let err = to_string(&layout, &[Narrow { name: "A".into() }]).unwrap_err();
    assert!(matches!(err, Error::EntityExtraction { entity: 1, .. }));
}

#[test]
fn test_incremental_writer() {
    let mut writer = RecordWriter::new(&entry_layout(), Vec::new()).unwrap();
    for i in 1..=3 {
        writer.write(&entry(i, Some(i as i32))).unwrap();
    }
    assert_eq!(writer.written(), 3);
    let bytes = writer.into_inner().unwrap();

    let back: Vec<Entry> = from_str(&entry_layout(), std::str::from_utf8(&bytes).unwrap()).unwrap();
    assert_eq!(back.len(), 3);
}

#[test]
fn test_layout_is_shareable_across_threads() {
    let layout = entry_layout();
    let handles: Vec<_> = (0..4u32)
        .map(|n| {
            let layout = layout.clone();
            std::thread::spawn(move || to_string(&layout, &[entry(n, None)]).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().len(), 29);
    }
}

#[test]
fn test_zero_padded_nullable_roundtrip() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Count {
        n: Option<u32>,
    }

    let layout = LayoutBuilder::fixed_width()
        .field(
            FieldDefinition::new("n", 3, converter::integer())
                .align_right('0')
                .nullable(""),
        )
        .build()
        .unwrap();

    let counts = vec![Count { n: None }, Count { n: Some(42) }];
    let text = to_string(&layout, &counts).unwrap();
    assert_eq!(text, "000\n042\n");
    assert_eq!(from_str::<Count>(&layout, &text).unwrap(), counts);

    let records: Vec<Record> = from_str(&layout, "000\n").unwrap();
    assert_eq!(records[0].get("n"), Some(&Value::Null));

    // zero and null share a token, so zero cannot be written
    let err = to_string(&layout, &[Count { n: Some(0) }]).unwrap_err();
    assert!(matches!(err, Error::Unrepresentable { entity: 1, .. }), "{:?}", err);
}

#[test]
fn test_fixed_width_rejects_embedded_line_break() {
    #[derive(Serialize)]
    struct Row {
        id: u32,
        label: String,
    }

    let layout = LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("id", 3, converter::integer()).align_right('0'))
        .field(FieldDefinition::new("label", 6, converter::string()))
        .build()
        .unwrap();

    let rows = vec![
        Row { id: 1, label: "a\nb".into() },
        Row { id: 2, label: "c".into() },
    ];
    let mut buffer = Vec::new();
    let err = to_writer(&layout, &mut buffer, &rows).unwrap_err();
    match err {
        Error::Unrepresentable { entity, field, .. } => {
            assert_eq!(entity, 1);
            assert_eq!(field, "label");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(buffer.is_empty());
}
