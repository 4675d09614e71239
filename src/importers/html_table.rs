//! HTML table extraction
//!
//! Several SII exports ship an HTML document under a spreadsheet extension.
//! Tables are read with `scraper`; header rows are those inside `<thead>` or
//! made only of `<th>` cells, otherwise the first row.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::tabular::{CellValue, RawRow, Table, TableOrigin};
use crate::error::{IngestError, Result};

/// Upper bound for `colspan` expansion
const MAX_COLSPAN: usize = 64;

/// A table as found in the document, before selection
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Extract every non-empty `<table>` of a document, in document order
pub fn parse_html_tables(html: &str) -> Vec<HtmlTable> {
    let document = Html::parse_document(html);
    let Ok(table_sel) = Selector::parse("table") else {
        return Vec::new();
    };
    let Ok(row_sel) = Selector::parse("tr") else {
        return Vec::new();
    };

    let mut tables = Vec::new();
    for table in document.select(&table_sel) {
        // Rows of nested tables belong to the nested table only
        let own_rows: Vec<ElementRef> = table
            .select(&row_sel)
            .filter(|row| belongs_to(row, &table))
            .collect();

        let mut header_parts: Vec<Vec<String>> = Vec::new();
        let mut body: Vec<Vec<String>> = Vec::new();

        for row in own_rows {
            let cells = row_cells(&row);
            if cells.iter().all(|(text, _)| text.is_empty()) {
                continue;
            }
            let in_thead = row
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name() == "thead"))
                .unwrap_or(false);
            let all_th = cells.iter().all(|(_, is_th)| *is_th);

            if body.is_empty() && (in_thead || all_th) {
                header_parts.push(cells.into_iter().map(|(text, _)| text).collect());
            } else {
                body.push(cells.into_iter().map(|(text, _)| text).collect());
            }
        }

        if header_parts.is_empty() && !body.is_empty() {
            header_parts.push(body.remove(0));
        }
        if header_parts.is_empty() {
            continue;
        }

        tables.push(HtmlTable {
            headers: merge_header_rows(&header_parts),
            rows: body,
        });
    }

    debug!("Found {} html tables", tables.len());
    tables
}

/// Choose a table: the best positive score wins, else the second table
/// (the first one is usually a banner), else the only one.
pub fn select_table<F>(tables: &[HtmlTable], score: F) -> Option<usize>
where
    F: Fn(&[String]) -> usize,
{
    if tables.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    for (idx, table) in tables.iter().enumerate() {
        let s = score(&table.headers);
        if s > 0 && best.map(|(_, b)| s > b).unwrap_or(true) {
            best = Some((idx, s));
        }
    }

    match best {
        Some((idx, _)) => Some(idx),
        None if tables.len() > 1 => Some(1),
        None => Some(0),
    }
}

/// Parse an HTML document into the best-matching `Table`
pub fn html_to_table<F>(html: &str, file: &str, score: F) -> Result<Table>
where
    F: Fn(&[String]) -> usize,
{
    let tables = parse_html_tables(html);
    let idx = select_table(&tables, score)
        .ok_or_else(|| IngestError::format(file, "no html table found"))?;
    let table_count = tables.len();
    let chosen = tables
        .into_iter()
        .nth(idx)
        .ok_or_else(|| IngestError::format(file, "no html table found"))?;

    let rows = chosen
        .rows
        .into_iter()
        .map(|cells| RawRow::new(cells.iter().map(|c| CellValue::text(c)).collect()))
        .collect();

    Ok(Table::new(
        chosen.headers,
        rows,
        TableOrigin::Html {
            table_index: idx,
            table_count,
        },
    ))
}

fn belongs_to(row: &ElementRef, table: &ElementRef) -> bool {
    row.ancestors()
        .find(|node| matches!(node.value(), Node::Element(e) if e.name() == "table"))
        .map(|node| node.id() == table.id())
        .unwrap_or(false)
}

/// Cell texts of a row with `colspan` expanded; the flag marks `<th>` cells
fn row_cells(row: &ElementRef) -> Vec<(String, bool)> {
    let mut cells = Vec::new();
    for child in row.children().filter_map(ElementRef::wrap) {
        let name = child.value().name();
        if name != "td" && name != "th" {
            continue;
        }
        let text = child
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let span = child
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        for _ in 0..span {
            cells.push((text.clone(), name == "th"));
        }
    }
    cells
}

/// Flatten multi-row headers into one label per column
fn merge_header_rows(parts: &[Vec<String>]) -> Vec<String> {
    let width = parts.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            let mut labels: Vec<&str> = Vec::new();
            for part in parts {
                if let Some(label) = part.get(col) {
                    if !label.is_empty() && labels.last() != Some(&label.as_str()) {
                        labels.push(label);
                    }
                }
            }
            labels.join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TABLES: &str = r#"
        <html><body>
          <table><tr><td>Servicio de Impuestos Internos</td></tr></table>
          <table>
            <tr><th>Tipo Doc</th><th>Monto Neto</th></tr>
            <tr><td>33</td><td>1.000</td></tr>
          </table>
        </body></html>"#;

    #[test]
    fn test_parse_tables_and_headers() {
        let tables = parse_html_tables(TWO_TABLES);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].headers, vec!["Tipo Doc", "Monto Neto"]);
        assert_eq!(tables[1].rows, vec![vec!["33".to_string(), "1.000".to_string()]]);
    }

    #[test]
    fn test_select_defaults_to_second_table() {
        let tables = parse_html_tables(TWO_TABLES);
        assert_eq!(select_table(&tables, |_| 0), Some(1));
    }

    #[test]
    fn test_select_prefers_best_score() {
        let tables = parse_html_tables(TWO_TABLES);
        let idx = select_table(&tables, |headers| {
            headers.iter().filter(|h| h.contains("Servicio")).count()
        });
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn test_multi_row_header_and_colspan() {
        let html = r#"<table>
            <thead>
              <tr><th colspan="2">Honorarios</th><th>Estado</th></tr>
              <tr><th>Brutos</th><th>Retenido</th><th></th></tr>
            </thead>
            <tr><td>100</td><td>10</td><td>VIGENTE</td></tr>
        </table>"#;
        let tables = parse_html_tables(html);
        assert_eq!(
            tables[0].headers,
            vec!["Honorarios Brutos", "Honorarios Retenido", "Estado"]
        );
    }

    #[test]
    fn test_nested_table_rows_stay_nested() {
        let html = r#"<table>
            <tr><th>A</th></tr>
            <tr><td><table><tr><td>inner</td></tr></table></td></tr>
        </table>"#;
        let tables = parse_html_tables(html);
        assert_eq!(tables[0].headers, vec!["A"]);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[1].headers, vec!["inner"]);
    }

    #[test]
    fn test_no_table_is_format_error() {
        let err = html_to_table("<p>nada</p>", "x.xls", |_| 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::FormatError { .. })
        ));
    }
}
