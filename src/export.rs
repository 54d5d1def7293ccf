use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::extract::{ResultSet, Row};

pub fn write_csv(path: &Path, result: &ResultSet) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(file, result).with_context(|| format!("Failed to write {}", path.display()))
}

/// Header first, even for an empty result, then one line per row in order.
pub fn write_rows<W: Write>(out: W, result: &ResultSet) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(Row::HEADER)?;
    for row in result.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
