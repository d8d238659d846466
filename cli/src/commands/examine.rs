use anyhow::{Context, Result};
use incomescope::{
    crs::Crs,
    io::shp::{inspect, numeric_field, read_shapefile},
    stats::describe,
    Value,
};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ExamineArgs) -> Result<()> {
    let items = read_shapefile(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let inspection = inspect(&items, args.n);

    println!("{}", args.input.display());
    println!("  records: {}", inspection.records);
    match Crs::from_shapefile(&args.input) {
        Ok(Some(crs)) => println!("  crs: {crs}"),
        Ok(None) => println!("  crs: unknown (no .prj)"),
        Err(e) => println!("  crs: unrecognized ({e})"),
    }
    for (kind, count) in &inspection.shape_kinds {
        println!("  geometry {kind}: {count}");
    }
    println!("  fields ({}): {}", inspection.fields.len(), inspection.fields.join(", "));

    for (i, record) in inspection.sample.iter().enumerate() {
        println!("\n  record {i}");
        for (field, value) in record {
            println!("    {field:<12} {value}");
        }
    }

    // quick statistics over every field that parses as a number
    println!();
    for field in &inspection.fields {
        let values = items.iter().enumerate()
            .map(|(row, (_, record))| numeric_field(record, field, row).map(Value::from_option))
            .collect::<Result<Vec<_>, _>>();
        let Ok(values) = values else {
            if cli.verbose > 0 { eprintln!("[examine] {field}: not numeric, skipped") }
            continue;
        };
        let s = describe(field, &values);
        let f = |x: Option<f64>| x.map_or("n/a".to_string(), |x| format!("{x:.3}"));
        println!("  {field:<12} n={:<5} missing={:<4} mean={} min={} max={}", s.count, s.excluded, f(s.mean), f(s.min), f(s.max));
    }

    Ok(())
}
