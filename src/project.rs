use crate::config::OccurrencePolicy;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Column-oriented table fragment projected from one response payload.
/// Every column holds the same number of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Option<String>>,
}

impl FlatRecord {
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.cells.len())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_count() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    /// Preferred ordering for field columns; discovered extras follow
    /// lexicographically.
    pub field_order: Vec<String>,
    /// Same, for table-cell columns.
    pub table_order: Vec<String>,
    pub occurrence: OccurrencePolicy,
}

#[derive(Debug, Default)]
pub struct Projection {
    pub fields: Option<FlatRecord>,
    pub table_cells: Option<FlatRecord>,
}

/// One `{value, ...}` occurrence record. Extra keys (position, confidence)
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
struct Occurrence {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct TableRelationship {
    #[serde(default)]
    cells: Vec<BTreeMap<String, Occurrence>>,
}

#[derive(Debug, Deserialize)]
struct Stamp {
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    shape: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    page_number: Option<i64>,
}

/// Flatten one extraction response payload into up to two FlatRecords.
/// A malformed fields or table-cells collection is logged and yields `None`
/// for that record only.
pub fn project(payload: &Value, opts: &ProjectOptions) -> Projection {
    let structures: Vec<Value> = payload
        .pointer("/result/detail_structure")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    report_stamps(&structures);

    let fields = match flatten_fields(&structures, &opts.field_order, opts.occurrence) {
        Ok(rec) => rec,
        Err(e) => {
            warn!("malformed fields collection, skipping: {e}");
            None
        }
    };

    let table_cells = match flatten_table_cells(&structures, &opts.table_order) {
        Ok(rec) => rec,
        Err(e) => {
            warn!("malformed table cells collection, skipping: {e}");
            None
        }
    };

    Projection {
        fields,
        table_cells,
    }
}

/// Requested keys that were actually discovered, in the requested order,
/// followed by the remaining discovered keys lexicographically.
fn resolve_order(requested: &[String], discovered: &BTreeSet<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(discovered.len());
    for key in requested {
        if discovered.contains(key) && !out.contains(key) {
            out.push(key.clone());
        }
    }
    for key in discovered {
        if !out.contains(key) {
            out.push(key.clone());
        }
    }
    out
}

fn flatten_fields(
    structures: &[Value],
    order: &[String],
    policy: OccurrencePolicy,
) -> Result<Option<FlatRecord>, serde_json::Error> {
    // One map per detail structure: field name -> occurrence values.
    let mut records: Vec<BTreeMap<String, Vec<Option<String>>>> = Vec::new();
    for structure in structures {
        let Some(raw) = structure.get("fields") else {
            continue;
        };
        let fields: BTreeMap<String, Vec<Occurrence>> = serde_json::from_value(raw.clone())?;
        records.push(
            fields
                .into_iter()
                .map(|(k, occs)| (k, occs.into_iter().map(|o| cell_text(&o.value)).collect()))
                .collect(),
        );
    }

    if records.is_empty() {
        return Ok(None);
    }

    let discovered: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.keys().cloned())
        .collect();
    let ordered = resolve_order(order, &discovered);

    // Rows contributed per structure: one under first/last, the longest
    // occurrence list seen anywhere under all.
    let span = match policy {
        OccurrencePolicy::First | OccurrencePolicy::Last => 1,
        OccurrencePolicy::All => records
            .iter()
            .flat_map(|r| r.values().map(Vec::len))
            .max()
            .unwrap_or(1)
            .max(1),
    };

    let mut columns: Vec<Column> = ordered
        .into_iter()
        .map(|name| Column {
            name,
            cells: Vec::with_capacity(records.len() * span),
        })
        .collect();

    for record in &records {
        for column in &mut columns {
            let values = record.get(&column.name);
            match policy {
                OccurrencePolicy::First => {
                    column
                        .cells
                        .push(values.and_then(|v| v.first().cloned()).flatten());
                }
                OccurrencePolicy::Last => {
                    column
                        .cells
                        .push(values.and_then(|v| v.last().cloned()).flatten());
                }
                OccurrencePolicy::All => {
                    let mut taken = 0;
                    if let Some(values) = values {
                        for v in values.iter().take(span) {
                            column.cells.push(v.clone());
                            taken += 1;
                        }
                    }
                    for _ in taken..span {
                        column.cells.push(None);
                    }
                }
            }
        }
    }

    Ok(Some(FlatRecord { columns }))
}

fn flatten_table_cells(
    structures: &[Value],
    order: &[String],
) -> Result<Option<FlatRecord>, serde_json::Error> {
    // Every cell, in document order, becomes one row.
    let mut cells: Vec<BTreeMap<String, Option<String>>> = Vec::new();
    for structure in structures {
        let Some(raw) = structure.get("tables_relationship") else {
            continue;
        };
        let relationships: Vec<TableRelationship> = serde_json::from_value(raw.clone())?;
        for rel in relationships {
            for cell in rel.cells {
                cells.push(
                    cell.into_iter()
                        .map(|(k, occ)| (k, cell_text(&occ.value)))
                        .collect(),
                );
            }
        }
    }

    if cells.is_empty() {
        return Ok(None);
    }

    let discovered: BTreeSet<String> = cells.iter().flat_map(|c| c.keys().cloned()).collect();
    let ordered = resolve_order(order, &discovered);

    let mut columns: Vec<Column> = ordered
        .into_iter()
        .map(|name| Column {
            name,
            cells: Vec::with_capacity(cells.len()),
        })
        .collect();

    for cell in &cells {
        for column in &mut columns {
            column
                .cells
                .push(cell.get(&column.name).cloned().flatten());
        }
    }

    Ok(Some(FlatRecord { columns }))
}

/// Stamps and seals are diagnostic only; they never reach a FlatRecord.
fn report_stamps(structures: &[Value]) {
    for structure in structures {
        let Some(raw) = structure.get("stamps") else {
            continue;
        };
        let Ok(stamps) = serde_json::from_value::<Vec<Stamp>>(raw.clone()) else {
            warn!("unreadable stamps entry, ignoring");
            continue;
        };
        for stamp in stamps {
            info!(
                color = stamp.color.as_deref().unwrap_or("-"),
                shape = stamp.shape.as_deref().unwrap_or("-"),
                kind = stamp.kind.as_deref().unwrap_or("-"),
                value = stamp.value.as_deref().unwrap_or("-"),
                page = stamp.page_number.unwrap_or(-1),
                "stamp detected"
            );
        }
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
