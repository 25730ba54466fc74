use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use serde_flatfile::{converter, from_str, to_string, FieldDefinition, Layout, LayoutBuilder, Record};

#[derive(Serialize, Deserialize, Clone)]
struct Product {
    sku: String,
    name: String,
    price: f64,
    quantity: u32,
    discontinued: Option<bool>,
}

fn products(size: u32) -> Vec<Product> {
    (0..size)
        .map(|i| Product {
            sku: format!("SKU{:05}", i),
            name: format!("Product, \"{}\"", i),
            price: 9.99 + f64::from(i),
            quantity: i,
            discontinued: if i % 4 == 0 { None } else { Some(i % 2 == 0) },
        })
        .collect()
}

fn fixed_layout() -> Layout {
    LayoutBuilder::fixed_width()
        .field(FieldDefinition::new("sku", 8, converter::string()))
        .field(FieldDefinition::new("name", 20, converter::string()))
        .field(
            FieldDefinition::new("price", 10, converter::float().with_precision(2))
                .align_right(' '),
        )
        .field(FieldDefinition::new("quantity", 6, converter::integer()).align_right('0'))
        .field(FieldDefinition::new("discontinued", 5, converter::boolean()).nullable("     "))
        .build()
        .unwrap()
}

fn csv_layout() -> Layout {
    LayoutBuilder::delimited(',')
        .with_header()
        .field(FieldDefinition::column("sku", converter::string()))
        .field(FieldDefinition::column("name", converter::string()))
        .field(FieldDefinition::column("price", converter::float()))
        .field(FieldDefinition::column("quantity", converter::integer()))
        .field(FieldDefinition::column("discontinued", converter::boolean()).nullable(""))
        .build()
        .unwrap()
}

fn benchmark_write(c: &mut Criterion) {
    for (name, layout) in [("write_fixed_width", fixed_layout()), ("write_csv", csv_layout())] {
        let mut group = c.benchmark_group(name);

        for size in [10, 50, 100, 500].iter() {
            let data = products(*size);
            group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
                b.iter(|| to_string(black_box(&layout), black_box(&data)))
            });
        }
        group.finish();
    }
}

fn benchmark_read(c: &mut Criterion) {
    for (name, layout) in [("read_fixed_width", fixed_layout()), ("read_csv", csv_layout())] {
        let mut group = c.benchmark_group(name);

        for size in [10, 50, 100, 500].iter() {
            let text = to_string(&layout, &products(*size)).unwrap();
            group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
                b.iter(|| from_str::<Product>(black_box(&layout), black_box(&text)))
            });
        }
        group.finish();
    }
}

fn benchmark_read_records(c: &mut Criterion) {
    let layout = fixed_layout();
    let text = to_string(&layout, &products(100)).unwrap();

    c.bench_function("read_dynamic_records", |b| {
        b.iter(|| from_str::<Record>(black_box(&layout), black_box(&text)))
    });
}

criterion_group!(benches, benchmark_write, benchmark_read, benchmark_read_records);
criterion_main!(benches);
