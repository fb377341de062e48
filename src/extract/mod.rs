// src/extract/mod.rs
//
// Turns one fetched ledger page into flat records. Each member owns one
// `table.memtable`: the thead carries the display name and the header row,
// the body rows are either the tab-cell ending-balance summary or ordinary
// transactions.

pub mod columns;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use self::columns::{parse_amount, ColumnLayout};
use crate::period::PeriodWindow;
use crate::record::{Record, Value};

static MEMBER_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.memtable").expect("valid member table selector"));
static HEADER_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.header-row").expect("valid header row selector"));
static HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3").expect("valid heading selector"));

/// The ending-balance cell reads like
/// `Value of this account as of 01/31/23: $1,234.56.`: the amount sits
/// between the first colon and an optional trailing period.
static ENDING_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*(.+?)\.?\s*$").expect("valid ending amount regex"));

/// Row class marking the ending-balance summary.
const ENDING_ROW_CLASS: &str = "tab-cell";
/// Transaction label carried by the synthetic ending-value record.
const ENDING_LABEL: &str = "Ending Value";

/// Classification of one non-blank body row.
#[derive(Debug)]
enum RowKind {
    /// The tab-cell summary row; only the parsed account value survives.
    EndingBalance { account_value: f64 },
    /// An ordinary ledger row: one parsed value per cell, in header order.
    Transaction { cells: Vec<Option<Value>> },
}

/// Extract every member's ledger rows from one report page.
pub fn extract_report(html: &str, period: &PeriodWindow) -> Result<Vec<Record>> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for table in document.select(&MEMBER_TABLE) {
        let head = table_head(table).context("member table has no thead")?;
        let name = member_name(head)?;
        let layout = header_layout(head)
            .with_context(|| format!("reading header row for member {:?}", name))?;

        for row in body_rows(table) {
            if row_is_blank(row) {
                continue;
            }
            let kind = classify_row(row, &layout)
                .with_context(|| format!("parsing ledger row for member {:?}", name))?;
            records.push(flatten(kind, &name, &layout, period));
        }
    }

    Ok(records)
}

/// First direct `thead` child of the member table.
fn table_head(table: ElementRef) -> Option<ElementRef> {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "thead")
}

fn member_name(head: ElementRef) -> Result<String> {
    let heading = head
        .select(&HEADING)
        .next()
        .context("member table has no name heading")?;
    Ok(element_text(heading))
}

fn header_layout(head: ElementRef) -> Result<ColumnLayout> {
    let header_row = head
        .select(&HEADER_ROW)
        .next()
        .context("member table has no header row")?;
    let headers: Vec<String> = direct_cells(header_row).map(element_text).collect();
    ColumnLayout::from_headers(headers)
}

/// The table's own body rows: `tr` children of the table element and of its
/// direct `tbody`/`tfoot` children. The thead rows are metadata, and rows
/// of nested tables are never visited.
fn body_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Direct `td` children of a row, skipping anything a nested table owns.
fn direct_cells(row: ElementRef) -> impl Iterator<Item = ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
}

fn row_is_blank(row: ElementRef) -> bool {
    row.text().all(|text| text.trim().is_empty())
}

fn row_has_class(row: ElementRef, class: &str) -> bool {
    row.value()
        .attr("class")
        .map(|attr| attr.split_whitespace().next() == Some(class))
        .unwrap_or(false)
}

/// Visible text of an element: descendant text nodes trimmed and joined
/// with single spaces, so inline markup reads as one string.
fn element_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn classify_row(row: ElementRef, layout: &ColumnLayout) -> Result<RowKind> {
    if row_has_class(row, ENDING_ROW_CLASS) {
        let cell = direct_cells(row)
            .next()
            .context("ending-balance row has no value cell")?;
        let text = element_text(cell);
        let captured = ENDING_AMOUNT
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .with_context(|| format!("no account value in ending-balance row {:?}", text))?;
        let account_value = parse_amount(captured.as_str())
            .with_context(|| format!("ending-balance row {:?}", text))?;
        return Ok(RowKind::EndingBalance { account_value });
    }

    let texts: Vec<String> = direct_cells(row).map(element_text).collect();
    let cells = layout.parse_row(&texts)?;
    Ok(RowKind::Transaction { cells })
}

/// Attach the member/period envelope and flatten one classified row into an
/// output record, header columns in order.
fn flatten(kind: RowKind, name: &str, layout: &ColumnLayout, period: &PeriodWindow) -> Record {
    let mut record = Record::new();
    record.push("Name", Some(Value::Text(name.to_string())));
    record.push("Month", Some(Value::Int(period.label())));

    match kind {
        RowKind::EndingBalance { account_value } => {
            for column in layout.names() {
                let value = match column {
                    "Date" => Some(Value::Date(period.end)),
                    "Transaction" => Some(Value::Text(ENDING_LABEL.to_string())),
                    _ => None,
                };
                record.push(column, value);
            }
            record.push("Account Value", Some(Value::Amount(account_value)));
        }
        RowKind::Transaction { cells } => {
            for (index, value) in cells.into_iter().enumerate() {
                if let Some(column) = layout.name_at(index) {
                    record.push(column, value);
                }
            }
            record.push("Account Value", None);
        }
    }

    record
}
