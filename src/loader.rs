use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::ingest::RawRow;

pub fn load_csv(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path)?;
    let rows = read_rows(file)?;
    debug!(path = %path.display(), rows = rows.len(), "loaded campaign sheet");
    Ok(rows)
}

/// Reads every data row as a column-name to cell-text map.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawRow>() {
        rows.push(result?);
    }
    Ok(rows)
}
