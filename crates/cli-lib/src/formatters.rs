use std::io::Write;

use corpusql_lib::Table;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Csv,
}

pub fn write_table(out: &mut impl Write, table: &Table, format: OutputFormat) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, table),
        OutputFormat::Csv => write_csv(out, table),
    }
}

fn write_text(out: &mut impl Write, table: &Table) -> std::io::Result<()> {
    writeln!(out, "{}", table.columns.join("\t"))?;
    for row in &table.rows {
        let cells: Vec<String> = row.0.iter().map(|c| c.render()).collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

fn write_csv(out: &mut impl Write, table: &Table) -> std::io::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        let cells: Vec<String> = row.0.iter().map(|c| c.render()).collect();
        writer.write_record(&cells)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusql_lib::{Cell, Row};

    fn sample_table() -> Table {
        Table {
            columns: vec!["p".to_string()],
            rows: vec![Row(vec![Cell::Text("Einstein".to_string())])],
        }
    }

    #[test]
    fn text_format_is_tab_separated() {
        let mut buf = Vec::new();
        write_table(&mut buf, &sample_table(), OutputFormat::Text).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "p\nEinstein\n");
    }

    #[test]
    fn csv_format_quotes_where_needed() {
        let mut buf = Vec::new();
        write_table(&mut buf, &sample_table(), OutputFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "p\nEinstein\n");
    }
}
