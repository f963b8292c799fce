use super::Table;
use crate::error::AppError;

pub(crate) fn render(table: &Table) -> Result<Vec<u8>, AppError> {
    let mut wtr = ::csv::Writer::from_writer(Vec::new());
    if !table.columns.is_empty() {
        wtr.write_record(&table.columns)
            .map_err(|e| AppError::Export(e.to_string()))?;
    }
    for row in table.text_rows() {
        wtr.write_record(&row)
            .map_err(|e| AppError::Export(e.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| AppError::Export(e.to_string()))
}
