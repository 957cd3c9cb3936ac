use crate::cli::ReportFormat;
use crate::model::CheckRow;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

pub fn print_report(rows: &[CheckRow]) {
    println!("-------------------------------------------------");
    for row in rows {
        match &row.latest {
            Some(latest) if row.current != *latest => {
                println!("{}: {} -> {} ({})", row.repo, row.current, latest, row.status)
            }
            Some(latest) => println!("{}: {} ({})", row.repo, latest, row.status),
            None => println!("{}: {}", row.repo, row.status),
        }
    }
    println!("-------------------------------------------------");
}

pub fn write_report(
    rows: &[CheckRow],
    format: ReportFormat,
    prefix: &str,
) -> anyhow::Result<PathBuf> {
    let path = match format {
        ReportFormat::Json => {
            let path = PathBuf::from(format!("{prefix}.json"));
            let mut f = File::create(&path)?;
            writeln!(f, "{}", serde_json::to_string_pretty(rows)?)?;
            path
        }
        ReportFormat::Csv => {
            let path = PathBuf::from(format!("{prefix}.csv"));
            let mut wtr = csv::Writer::from_path(&path)?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
            path
        }
    };
    println!("Saved {} report rows to {}", rows.len(), path.display());
    Ok(path)
}
