//! Tabular value shaping: filtering, sorting and paging.
//!
//! A value is a table when it is a non-empty array of JSON objects (one
//! object per row). Tables are never shipped whole unless the client asks
//! for `fullValue`; otherwise a filtered, sorted page goes out together with
//! the row count.

use std::cmp::Ordering;

use lumy_types::messages::DataType;
use lumy_types::{
    DataTabularDataFilter, DataTabularDataFilterCondition, DataTabularDataSortingMethod,
    Direction, FilterOperator, TableStats,
};
use serde_json::Value;

use crate::backend::IoValue;

/// Page size used when a filter does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// The only filter item operator understood so far.
const CONTAINS: &str = "contains";

/// Shape a raw value for the client.
///
/// - simple values go out as they are, without stats
/// - tables without a filter go out as stats only
/// - tables with `fullValue` go out whole
/// - other tables are filtered, sorted and paged
pub fn shape_value(value: Option<Value>, filter: Option<&DataTabularDataFilter>) -> IoValue {
    let Some(value) = value else {
        return IoValue::default();
    };
    if DataType::of(&value) != DataType::Table {
        return IoValue::simple(value);
    }
    let Value::Array(rows) = value else {
        return IoValue::simple(value);
    };

    let Some(filter) = filter else {
        return IoValue {
            value: None,
            stats: Some(stats(rows.len())),
        };
    };

    if filter.full_value == Some(true) {
        let rows_count = rows.len();
        return IoValue {
            value: Some(Value::Array(rows)),
            stats: Some(stats(rows_count)),
        };
    }

    let mut rows = filter_rows(rows, filter.condition.as_ref());
    sort_rows(&mut rows, filter.sorting.as_ref());
    let rows_count = rows.len();
    let page = paginate(rows, filter.offset, filter.page_size);

    IoValue {
        value: Some(Value::Array(page)),
        stats: Some(stats(rows_count)),
    }
}

/// Slice a list into one page.
pub fn paginate<T>(items: Vec<T>, offset: Option<usize>, page_size: Option<usize>) -> Vec<T> {
    let offset = offset.unwrap_or(0);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    items.into_iter().skip(offset).take(page_size).collect()
}

fn stats(rows_count: usize) -> TableStats {
    TableStats { rows_count }
}

fn filter_rows(rows: Vec<Value>, condition: Option<&DataTabularDataFilterCondition>) -> Vec<Value> {
    let Some(condition) = condition else {
        return rows;
    };
    let items: Vec<_> = condition
        .items
        .iter()
        .filter(|item| item.operator == CONTAINS)
        .collect();
    if items.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| {
            let mut matches = items.iter().map(|item| {
                let cell = row.get(&item.column).map(display).unwrap_or_default();
                cell.contains(&display(&item.value))
            });
            match condition.operator {
                FilterOperator::And => matches.all(|m| m),
                FilterOperator::Or => matches.any(|m| m),
            }
        })
        .collect()
}

fn sort_rows(rows: &mut [Value], sorting: Option<&DataTabularDataSortingMethod>) {
    let Some(sorting) = sorting else {
        return;
    };
    let Some(direction) = sorting.direction else {
        return;
    };
    rows.sort_by(|a, b| {
        let ordering = compare(a.get(&sorting.column), b.get(&sorting.column));
        match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(a), Some(b)) => display(a).cmp(&display(b)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Cell text used for `contains` matching: strings unquoted.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
