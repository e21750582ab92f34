//! Raw row validation.
//!
//! Rows arrive as loosely-typed cells (CSV text or JSON numbers). Validation
//! either produces an [`InventoryRecord`] or a [`RowRejection`] listing every
//! problem found in the row. Values are never clamped or defaulted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockroute_core::{InventoryRecord, InvalidInput, ItemId, StoreId, WarehouseId};

/// A raw cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// One raw tabular row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(pub BTreeMap<String, RawValue>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }
}

/// A rejected row and every reason it was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    /// Zero-based index in the input sequence.
    pub row: usize,
    #[serde(serialize_with = "serialize_reasons")]
    pub reasons: Vec<InvalidInput>,
}

fn serialize_reasons<S>(reasons: &[InvalidInput], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(reasons.iter().map(ToString::to_string))
}

/// Partial-success outcome of validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub records: Vec<InventoryRecord>,
    pub rejections: Vec<RowRejection>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
    }
}

/// Validate an ordered sequence of raw rows.
pub fn validate(rows: &[RawRow]) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        match validate_row(row) {
            Ok(record) => outcome.records.push(record),
            Err(reasons) => outcome.rejections.push(RowRejection { row: index, reasons }),
        }
    }

    outcome
}

/// Validate a single row, collecting all violations.
pub fn validate_row(row: &RawRow) -> Result<InventoryRecord, Vec<InvalidInput>> {
    let mut reasons = Vec::new();

    let item_id = collect(&mut reasons, identifier(row, "item_id").and_then(ItemId::new));
    let store_id = collect(&mut reasons, identifier(row, "store_id").and_then(StoreId::new));
    let warehouse_id = collect(
        &mut reasons,
        identifier(row, "warehouse_id").and_then(WarehouseId::new),
    );

    let demand = collect(&mut reasons, number(row, "demand").and_then(non_negative("demand")));
    let order_cost = collect(
        &mut reasons,
        number(row, "order_cost").and_then(positive("order_cost")),
    );
    let holding_cost = collect(
        &mut reasons,
        number(row, "holding_cost").and_then(|value| {
            if value > 0.0 {
                Ok(value)
            } else {
                Err(InvalidInput::DivisionByZero {
                    field: "holding_cost",
                    value,
                })
            }
        }),
    );
    let inventory_level = collect(
        &mut reasons,
        number(row, "inventory_level").and_then(non_negative("inventory_level")),
    );

    match (item_id, store_id, warehouse_id, demand, order_cost, holding_cost, inventory_level) {
        (
            Some(item_id),
            Some(store_id),
            Some(warehouse_id),
            Some(demand),
            Some(order_cost),
            Some(holding_cost),
            Some(inventory_level),
        ) if reasons.is_empty() => Ok(InventoryRecord {
            item_id,
            store_id,
            warehouse_id,
            demand,
            order_cost,
            holding_cost,
            inventory_level,
        }),
        _ => Err(reasons),
    }
}

fn collect<T>(reasons: &mut Vec<InvalidInput>, result: Result<T, InvalidInput>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(reason) => {
            reasons.push(reason);
            None
        }
    }
}

fn identifier(row: &RawRow, field: &'static str) -> Result<String, InvalidInput> {
    match row.get(field) {
        None => Err(InvalidInput::Missing { field }),
        Some(RawValue::Text(text)) => Ok(text.clone()),
        // Spreadsheet exports turn numeric ids into numbers; 7.0 renders as "7".
        Some(RawValue::Number(n)) if n.is_finite() => Ok(n.to_string()),
        Some(RawValue::Number(n)) => Err(InvalidInput::malformed(format!(
            "field `{field}` is not a valid identifier: {n}"
        ))),
    }
}

fn number(row: &RawRow, field: &'static str) -> Result<f64, InvalidInput> {
    let value = match row.get(field) {
        None => return Err(InvalidInput::Missing { field }),
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(InvalidInput::Missing { field });
            }
            trimmed.parse::<f64>().map_err(|_| InvalidInput::NotNumeric {
                field,
                raw: text.clone(),
            })?
        }
    };

    if !value.is_finite() {
        return Err(InvalidInput::NotNumeric {
            field,
            raw: value.to_string(),
        });
    }
    Ok(value)
}

fn non_negative(field: &'static str) -> impl Fn(f64) -> Result<f64, InvalidInput> {
    move |value| {
        if value >= 0.0 {
            Ok(value)
        } else {
            Err(InvalidInput::OutOfRange {
                field,
                value,
                expected: ">= 0",
            })
        }
    }
}

fn positive(field: &'static str) -> impl Fn(f64) -> Result<f64, InvalidInput> {
    move |value| {
        if value > 0.0 {
            Ok(value)
        } else {
            Err(InvalidInput::OutOfRange {
                field,
                value,
                expected: "> 0",
            })
        }
    }
}
