use crate::project::{Column, FlatRecord};
use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{error, info};

/// Concatenate records row-wise, in input order, widening to the union of
/// all columns. Union order is first-encounter; rows of a record lacking a
/// column are null-filled there.
pub fn merge_records(records: &[FlatRecord]) -> FlatRecord {
    let mut union: Vec<String> = Vec::new();
    for record in records {
        for column in &record.columns {
            if !union.contains(&column.name) {
                union.push(column.name.clone());
            }
        }
    }

    let mut columns: Vec<Column> = union
        .into_iter()
        .map(|name| Column {
            name,
            cells: Vec::new(),
        })
        .collect();

    for record in records {
        let rows = record.row_count();
        for column in &mut columns {
            match record.columns.iter().find(|c| c.name == column.name) {
                Some(src) => column.cells.extend(src.cells.iter().cloned()),
                None => column.cells.extend(std::iter::repeat_n(None, rows)),
            }
        }
    }

    FlatRecord { columns }
}

/// Merge `records` and write them under `sheet_name` in the artifact.
/// Failures are logged and never escape the sink; content already in the
/// artifact stays intact either way.
pub fn export(records: &[FlatRecord], artifact: &Path, sheet_name: &str) {
    let non_empty: Vec<FlatRecord> = records.iter().filter(|r| !r.is_empty()).cloned().collect();
    if non_empty.is_empty() {
        info!("no rows to write for sheet {sheet_name}, skipping");
        return;
    }

    let merged = merge_records(&non_empty);
    match append_sheet(artifact, sheet_name, &merged) {
        Ok(()) => info!(
            "wrote sheet {sheet_name} ({} rows) to {}",
            merged.row_count(),
            artifact.display()
        ),
        Err(e) => error!("failed to write sheet {sheet_name}: {e:#}"),
    }
}

/// Write `record` as `sheet_name`, carrying over every other sheet already
/// present in the artifact. A sheet of the same name is replaced. The
/// workbook is rewritten to a temp file and renamed into place so a failed
/// write cannot corrupt the existing artifact.
pub fn append_sheet(artifact: &Path, sheet_name: &str, record: &FlatRecord) -> Result<()> {
    let carried = if artifact.is_file() {
        read_sheets(artifact)?
            .into_iter()
            .filter(|(name, _)| name != sheet_name)
            .collect()
    } else {
        Vec::new()
    };

    let mut workbook = Workbook::new();

    for (name, rows) in &carried {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(text) = cell {
                    sheet.write_string(r as u32, c as u16, text.as_str())?;
                }
            }
        }
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;
    for (c, column) in record.columns.iter().enumerate() {
        sheet.write_string(0, c as u16, column.name.as_str())?;
        for (r, cell) in column.cells.iter().enumerate() {
            if let Some(text) = cell {
                sheet.write_string(r as u32 + 1, c as u16, text.as_str())?;
            }
        }
    }

    if let Some(parent) = artifact.parent() {
        crate::util::ensure_dir(parent)?;
    }
    let tmp = artifact.with_extension("xlsx.tmp");
    workbook
        .save(&tmp)
        .with_context(|| format!("saving workbook: {}", tmp.display()))?;
    std::fs::rename(&tmp, artifact)
        .with_context(|| format!("replacing artifact: {}", artifact.display()))?;
    Ok(())
}

/// All sheets of an existing artifact as rows of optional strings.
fn read_sheets(path: &Path) -> Result<Vec<(String, Vec<Vec<Option<String>>>)>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("opening artifact: {}", path.display()))?;

    let mut sheets = Vec::new();
    for (name, range) in workbook.worksheets() {
        let rows: Vec<Vec<Option<String>>> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::Empty => None,
                        Data::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect()
            })
            .collect();
        sheets.push((name, rows));
    }
    Ok(sheets)
}
