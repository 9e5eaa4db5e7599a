//! Discrepancy report rendered as self-contained, paginated HTML.
//!
//! Layout is fixed: claim header on the first page, the generated estimate grouped by
//! category (groups sorted by name), estimate totals, then the discrepancy table when the
//! comparison found any. Every page ends with the disclaimer and a `Page X of Y` marker.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use chrono::{DateTime, Utc};

use super::ArtifactError;
use crate::workflows::analysis::domain::{AuditReport, ComparisonResult, GeneratedEstimate, LineItem};
use crate::workflows::escalation::domain::ClaimSnapshot;

pub const REPORT_FILE_NAME: &str = "discrepancy_report.html";
pub const DISCLAIMER: &str = "Prepared for settlement review from an independent contractor \
estimate and the carrier estimate. Figures are estimates subject to inspection and do not \
constitute legal advice.";

const ROWS_PER_PAGE: usize = 32;
const HEADER_ROWS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    LineItems,
    Comparison,
}

#[derive(Debug, Clone, PartialEq)]
enum Row<'a> {
    Category(&'a str),
    Item { item: &'a LineItem, shaded: bool },
    Subtotal(f64),
    Overhead(f64),
    Total(f64),
    Discrepancy { index: usize, shaded: bool },
    Underpayment(f64),
}

impl Row<'_> {
    fn section(&self) -> Section {
        match self {
            Row::Discrepancy { .. } | Row::Underpayment(_) => Section::Comparison,
            _ => Section::LineItems,
        }
    }
}

pub fn render(
    snapshot: &ClaimSnapshot,
    report: &AuditReport,
    generated_at: DateTime<Utc>,
) -> Result<String, ArtifactError> {
    let estimate = report
        .generated_estimate
        .as_ref()
        .ok_or(ArtifactError::Incomplete("generated estimate"))?;
    let comparison = report
        .comparison
        .as_ref()
        .filter(|comparison| !comparison.discrepancies.is_empty());

    let rows = layout(estimate, comparison)?;
    let pages = paginate(rows);
    Ok(write_document(snapshot, comparison, &pages, generated_at)?)
}

fn layout<'a>(
    estimate: &'a GeneratedEstimate,
    comparison: Option<&ComparisonResult>,
) -> Result<Vec<Row<'a>>, ArtifactError> {
    let mut groups: BTreeMap<&str, Vec<&LineItem>> = BTreeMap::new();
    for item in &estimate.line_items {
        groups.entry(item.category.as_str()).or_default().push(item);
    }

    let mut rows = Vec::new();
    for (category, items) in groups {
        rows.push(Row::Category(category));
        rows.extend(items.into_iter().enumerate().map(|(index, item)| Row::Item {
            item,
            shaded: index % 2 == 1,
        }));
    }

    rows.push(Row::Subtotal(estimate.subtotal()));
    if let Some(overhead) = estimate.overhead_and_profit {
        rows.push(Row::Overhead(overhead));
    }
    let total = estimate
        .total()
        .map_err(|_| ArtifactError::Incomplete("estimate total"))?;
    rows.push(Row::Total(total));

    if let Some(comparison) = comparison {
        rows.extend(
            (0..comparison.discrepancies.len()).map(|index| Row::Discrepancy {
                index,
                shaded: index % 2 == 1,
            }),
        );
        rows.push(Row::Underpayment(comparison.summary.total_delta));
    }

    Ok(rows)
}

fn paginate(rows: Vec<Row<'_>>) -> Vec<Vec<Row<'_>>> {
    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut capacity = ROWS_PER_PAGE - HEADER_ROWS;

    for row in rows {
        if current.len() == capacity {
            pages.push(std::mem::take(&mut current));
            capacity = ROWS_PER_PAGE;
        }
        current.push(row);
    }
    pages.push(current);
    pages
}

fn write_document(
    snapshot: &ClaimSnapshot,
    comparison: Option<&ComparisonResult>,
    pages: &[Vec<Row<'_>>],
    generated_at: DateTime<Utc>,
) -> Result<String, fmt::Error> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
    writeln!(
        html,
        "<title>Discrepancy Report: Claim {}</title>",
        escape_html(snapshot.display_number())
    )?;
    writeln!(html, "<style>{STYLES}</style></head><body>")?;

    let total_pages = pages.len();
    for (page_index, rows) in pages.iter().enumerate() {
        writeln!(html, "<section class=\"page\">")?;
        if page_index == 0 {
            write_header(&mut html, snapshot, generated_at)?;
        }

        let mut start = 0;
        while start < rows.len() {
            let section = rows[start].section();
            let end = rows[start..]
                .iter()
                .position(|row| row.section() != section)
                .map_or(rows.len(), |offset| start + offset);
            write_table(&mut html, section, &rows[start..end], comparison)?;
            start = end;
        }

        writeln!(html, "<footer>")?;
        writeln!(html, "<p class=\"disclaimer\">{}</p>", escape_html(DISCLAIMER))?;
        writeln!(
            html,
            "<p class=\"page-number\">Page {} of {}</p>",
            page_index + 1,
            total_pages
        )?;
        writeln!(html, "</footer></section>")?;
    }

    writeln!(html, "</body></html>")?;
    Ok(html)
}

fn write_header(
    html: &mut String,
    snapshot: &ClaimSnapshot,
    generated_at: DateTime<Utc>,
) -> fmt::Result {
    let or_dash = |value: Option<&str>| escape_html(value.unwrap_or("—"));
    let incident = snapshot
        .incident_date
        .map(|date| date.format("%B %d, %Y").to_string());

    writeln!(html, "<header>")?;
    writeln!(html, "<h1>Claim Discrepancy Report</h1>")?;
    writeln!(html, "<dl>")?;
    writeln!(html, "<dt>Property</dt><dd>{}</dd>", escape_html(&snapshot.property_address))?;
    writeln!(html, "<dt>Claim number</dt><dd>{}</dd>", escape_html(snapshot.display_number()))?;
    writeln!(html, "<dt>Carrier</dt><dd>{}</dd>", or_dash(snapshot.carrier_name.as_deref()))?;
    writeln!(html, "<dt>Policy number</dt><dd>{}</dd>", or_dash(snapshot.policy_number.as_deref()))?;
    writeln!(html, "<dt>Loss type</dt><dd>{}</dd>", or_dash(snapshot.loss_type.as_deref()))?;
    writeln!(html, "<dt>Incident date</dt><dd>{}</dd>", or_dash(incident.as_deref()))?;
    writeln!(html, "<dt>Adjuster</dt><dd>{}</dd>", or_dash(snapshot.adjuster_name.as_deref()))?;
    writeln!(
        html,
        "<dt>Prepared</dt><dd>{}</dd>",
        generated_at.format("%B %d, %Y %H:%M UTC")
    )?;
    writeln!(html, "</dl></header>")
}

fn write_table(
    html: &mut String,
    section: Section,
    rows: &[Row<'_>],
    comparison: Option<&ComparisonResult>,
) -> fmt::Result {
    match section {
        Section::LineItems => {
            writeln!(html, "<table class=\"line-items\"><thead><tr><th>Description</th><th>Qty</th><th>Unit</th><th>Unit price</th><th>Total</th></tr></thead><tbody>")?;
        }
        Section::Comparison => {
            writeln!(html, "<table class=\"comparison\"><thead><tr><th>Item</th><th>Industry</th><th>Carrier</th><th>Delta</th><th>Justification</th></tr></thead><tbody>")?;
        }
    }

    for row in rows {
        match row {
            Row::Category(name) => writeln!(
                html,
                "<tr class=\"category\"><td colspan=\"5\">{}</td></tr>",
                escape_html(name)
            )?,
            Row::Item { item, shaded } => writeln!(
                html,
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                shade(*shaded),
                escape_html(&item.description),
                format_quantity(item.quantity),
                escape_html(&item.unit),
                format_money(item.unit_price),
                format_money(item.total)
            )?,
            Row::Subtotal(value) => total_row(html, "Subtotal", *value)?,
            Row::Overhead(value) => total_row(html, "Overhead &amp; profit", *value)?,
            Row::Total(value) => total_row(html, "Total", *value)?,
            Row::Discrepancy { index, shaded } => {
                if let Some(discrepancy) =
                    comparison.and_then(|comparison| comparison.discrepancies.get(*index))
                {
                    writeln!(
                        html,
                        "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        shade(*shaded),
                        escape_html(&discrepancy.item),
                        format_money(discrepancy.industry_price),
                        format_money(discrepancy.carrier_price),
                        format_money(discrepancy.delta),
                        escape_html(&discrepancy.justification)
                    )?;
                }
            }
            Row::Underpayment(value) => writeln!(
                html,
                "<tr class=\"total\"><td colspan=\"3\">Total underpayment</td><td>{}</td><td></td></tr>",
                format_money(*value)
            )?,
        }
    }

    writeln!(html, "</tbody></table>")
}

fn total_row(html: &mut String, label: &str, value: f64) -> fmt::Result {
    writeln!(
        html,
        "<tr class=\"total\"><td colspan=\"4\">{label}</td><td>{}</td></tr>",
        format_money(value)
    )
}

fn shade(shaded: bool) -> &'static str {
    if shaded {
        " class=\"shaded\""
    } else {
        ""
    }
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity:.2}")
    }
}

/// `$1,234.56`, with a leading minus for negative amounts.
pub(crate) fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (index, digit) in dollars.chars().enumerate() {
        if index > 0 && (dollars.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const STYLES: &str = "body{font-family:Helvetica,Arial,sans-serif;font-size:11px;color:#222}\
.page{page-break-after:always;min-height:10in;position:relative;padding-bottom:0.8in}\
table{width:100%;border-collapse:collapse;margin-top:12px}\
th,td{padding:4px 6px;border-bottom:1px solid #ddd;text-align:left}\
tr.shaded{background:#f4f6f8}tr.category td{font-weight:bold;background:#e3e8ee}\
tr.total td{font-weight:bold;border-top:2px solid #333}\
footer{position:absolute;bottom:0;width:100%;font-size:9px;color:#666}\
.page-number{text-align:right}";
