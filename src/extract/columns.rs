use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use crate::record::Value;

/// Report columns holding dollar/unit amounts.
const AMOUNT_COLUMNS: &[&str] = &[
    "Unit Value",
    "Paid in this date",
    "Total paid in to date",
    "Total paid in plus earnings to date",
    "Units purchased",
    "Total units",
];

/// Fields every record carries outside the header-mapped columns.
const RESERVED_COLUMNS: &[&str] = &["Name", "Month", "Account Value"];

/// Transaction dates come as two-digit years, e.g. `01/15/23`.
const CELL_DATE_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Amount,
    Text,
}

impl ColumnKind {
    fn for_name(name: &str) -> Self {
        if name == "Date" {
            ColumnKind::Date
        } else if AMOUNT_COLUMNS.contains(&name) {
            ColumnKind::Amount
        } else {
            ColumnKind::Text
        }
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    kind: ColumnKind,
}

/// Ordered, typed column descriptors for one member table, built once from
/// its header row and applied positionally to every body row.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    columns: Vec<Column>,
}

impl ColumnLayout {
    /// Build the layout from the header cell texts, in order. Duplicate
    /// names and names colliding with the synthetic record fields are
    /// malformed input.
    pub fn from_headers(headers: Vec<String>) -> Result<Self> {
        let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
        for name in headers {
            if RESERVED_COLUMNS.contains(&name.as_str()) {
                bail!("report header {:?} collides with a synthetic record field", name);
            }
            if columns.iter().any(|column| column.name == name) {
                bail!("duplicate report header {:?}", name);
            }
            let kind = ColumnKind::for_name(&name);
            columns.push(Column { name, kind });
        }
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|column| column.name.as_str())
    }

    /// Parse one body row's cell texts positionally. Empty text is a null
    /// cell; a cell beyond the header layout is malformed input.
    pub fn parse_row(&self, texts: &[String]) -> Result<Vec<Option<Value>>> {
        if texts.len() > self.columns.len() {
            bail!(
                "row has {} cells but the header names only {} columns",
                texts.len(),
                self.columns.len(),
            );
        }
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                if text.is_empty() {
                    Ok(None)
                } else {
                    self.parse_cell(index, text).map(Some)
                }
            })
            .collect()
    }

    /// Parse one trimmed, non-empty cell text under the column at `index`.
    pub fn parse_cell(&self, index: usize, text: &str) -> Result<Value> {
        let column = self
            .columns
            .get(index)
            .with_context(|| format!("cell {} has no matching header column", index))?;
        match column.kind {
            ColumnKind::Date => {
                let date = NaiveDate::parse_from_str(text, CELL_DATE_FORMAT)
                    .with_context(|| format!("invalid {} cell {:?}", column.name, text))?;
                Ok(Value::Date(date))
            }
            ColumnKind::Amount => {
                let amount = parse_amount(text)
                    .with_context(|| format!("invalid {} cell {:?}", column.name, text))?;
                Ok(Value::Amount(amount))
            }
            ColumnKind::Text => Ok(Value::Text(text.to_string())),
        }
    }
}

/// Parse a report money/unit amount: the `$` sign and thousands commas are
/// stripped, a parenthesized value is negative.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let (negative, inner) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let value: f64 = cleaned
        .trim()
        .parse()
        .with_context(|| format!("unparseable amount {:?}", raw))?;
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_parse_with_currency_markup() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("$0.00").unwrap(), 0.0);
        assert_eq!(parse_amount("($50.00)").unwrap(), -50.0);
        assert_eq!(parse_amount("1234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount(" $2.50 ").unwrap(), 2.5);
    }

    #[test]
    fn garbage_amounts_are_errors() {
        assert!(parse_amount("n/a").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("(open").is_err());
    }

    #[test]
    fn kinds_follow_the_column_name() {
        let layout = ColumnLayout::from_headers(vec![
            "Date".to_string(),
            "Transaction".to_string(),
            "Units purchased".to_string(),
        ])
        .unwrap();

        assert_eq!(
            layout.parse_cell(0, "01/15/23").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()),
        );
        assert_eq!(
            layout.parse_cell(1, "Monthly payment").unwrap(),
            Value::Text("Monthly payment".to_string()),
        );
        assert_eq!(
            layout.parse_cell(2, "$10.00").unwrap(),
            Value::Amount(10.0),
        );
    }

    #[test]
    fn rows_map_empty_cells_to_null() {
        let layout = ColumnLayout::from_headers(vec![
            "Date".to_string(),
            "Transaction".to_string(),
            "Unit Value".to_string(),
        ])
        .unwrap();

        let cells = layout
            .parse_row(&[
                "01/15/23".to_string(),
                String::new(),
                "$12.50".to_string(),
            ])
            .unwrap();

        assert_eq!(cells.len(), 3);
        assert!(cells[1].is_none());
        assert_eq!(cells[2], Some(Value::Amount(12.5)));
    }

    #[test]
    fn extra_cells_without_headers_are_rejected() {
        let layout =
            ColumnLayout::from_headers(vec!["Date".to_string(), "Transaction".to_string()])
                .unwrap();
        let err = layout
            .parse_row(&[
                "01/15/23".to_string(),
                "Payment".to_string(),
                "extra".to_string(),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = ColumnLayout::from_headers(vec!["Date".to_string(), "Date".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn reserved_headers_are_rejected() {
        for reserved in ["Name", "Month", "Account Value"] {
            assert!(ColumnLayout::from_headers(vec![reserved.to_string()]).is_err());
        }
    }

    #[test]
    fn bad_dates_are_errors() {
        let layout = ColumnLayout::from_headers(vec!["Date".to_string()]).unwrap();
        assert!(layout.parse_cell(0, "13/45/23").is_err());
        assert!(layout.parse_cell(0, "January 15").is_err());
    }
}
