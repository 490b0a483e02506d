//! Plain-text tables for the terminal.

use std::path::Path;

use sentlab_core::align::{AlignedDataset, DailyTable};
use sentlab_core::data::{CacheEntry, Value};

use crate::session::{Headline, PriceHistory};

/// Right-aligned columns sized to their widest cell, with a rule under the
/// header.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:>w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = line(headers);
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in rows {
        out.push('\n');
        out.push_str(&line(row));
    }
    out
}

fn number(v: f64) -> String {
    if v.is_nan() {
        "-".to_string()
    } else {
        format!("{v:.4}")
    }
}

fn daily_rows(dates: &[chrono::NaiveDate], rows: &[Vec<f64>]) -> Vec<Vec<String>> {
    dates
        .iter()
        .zip(rows)
        .map(|(date, values)| {
            std::iter::once(date.to_string())
                .chain(values.iter().map(|&v| number(v)))
                .collect()
        })
        .collect()
}

fn with_date(columns: &[String]) -> Vec<String> {
    std::iter::once("Date".to_string())
        .chain(columns.iter().cloned())
        .collect()
}

pub fn aligned_report(aligned: &AlignedDataset) -> String {
    render_table(
        &with_date(aligned.columns()),
        &daily_rows(aligned.dates(), aligned.rows()),
    )
}

pub fn daily_table_report(table: &DailyTable) -> String {
    render_table(
        &with_date(table.columns()),
        &daily_rows(table.dates(), table.rows()),
    )
}

/// Bars, price moves and moving averages, one line per trading day.
pub fn price_history_report(history: &PriceHistory) -> String {
    let dataset = &history.dataset;
    let mut headers = with_date(
        &dataset
            .columns()
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>(),
    );
    headers.extend(history.moving_averages.iter().map(|(name, _)| name.clone()));

    let rows: Vec<Vec<String>> = dataset
        .records()
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut row = vec![record.date.to_string()];
            row.extend(record.values.iter().map(|value| match value {
                Value::Number(v) => number(*v),
                Value::Text(s) => s.clone(),
            }));
            row.extend(
                history
                    .moving_averages
                    .iter()
                    .map(|(_, values)| values.get(i).copied().map_or_else(String::new, number)),
            );
            row
        })
        .collect();
    render_table(&headers, &rows)
}

/// Numbered headline listing. Dates are approximate read-time ages.
pub fn headlines_report(ticker: &str, headlines: &[Headline]) -> String {
    let mut out = format!("Latest headlines for {ticker} (dates approximate)\n");
    out.push_str(&format!("{:^5}  {:<10}  {}\n", "#", "Date", "Headline"));
    out.push_str(&format!("{:-^5}  {:-<10}  {:-<8}", "", "", ""));
    for (i, h) in headlines.iter().enumerate() {
        out.push_str(&format!("\n{:^5}  {:<10}  {}", i + 1, h.approx_date, h.title));
    }
    out
}

pub fn profile_report(ticker: &str, attributes: &[(String, String)]) -> String {
    let width = attributes
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Attribute".len());
    let mut out = format!("Profile of {ticker}\n");
    out.push_str(&format!("{:>width$}   {}\n", "Attribute", "Value"));
    out.push_str(&format!("{:->width$}   {:-<5}", "", ""));
    for (name, value) in attributes {
        out.push_str(&format!("\n{name:>width$}   {value}"));
    }
    out
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

/// Cached artifacts with their row counts and date spans.
pub fn cache_status_report(cache_dir: &Path, entries: &[CacheEntry]) -> String {
    if entries.is_empty() {
        return format!("Cache is empty: {}", cache_dir.display());
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let headers: Vec<String> = ["Artifact", "Kind", "Rows", "Dates", "Cached at", "Size"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            let (rows, span, cached_at) = match &entry.meta {
                Some(meta) => (
                    meta.row_count.to_string(),
                    match (meta.first_date, meta.last_date) {
                        (Some(first), Some(last)) => format!("{first} to {last}"),
                        _ => "-".into(),
                    },
                    meta.cached_at.format("%Y-%m-%d %H:%M").to_string(),
                ),
                None => ("?".into(), "(no meta)".into(), "-".into()),
            };
            vec![
                entry.key.storage_name(),
                entry.key.kind().to_string(),
                rows,
                span,
                cached_at,
                format_size(entry.size_bytes),
            ]
        })
        .collect();

    format!(
        "Cache: {}\nArtifacts: {}\nTotal size: {}\n\n{}",
        cache_dir.display(),
        entries.len(),
        format_size(total),
        render_table(&headers, &rows)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn table_columns_are_padded_to_the_widest_cell() {
        let headers = vec!["A".to_string(), "Long".to_string()];
        let rows = vec![vec!["12345".to_string(), "x".to_string()]];
        let text = render_table(&headers, &rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "    A  Long");
        assert_eq!(lines[1], "-----------");
        assert_eq!(lines[2], "12345     x");
    }

    #[test]
    fn nan_renders_as_dash() {
        assert_eq!(number(f64::NAN), "-");
        assert_eq!(number(0.25), "0.2500");
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1_048_576), "3.0 MB");
    }

    #[test]
    fn daily_table_lists_every_date() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let table = DailyTable::from_rows(
            vec!["Compound".into()],
            vec![(d(2), vec![0.5]), (d(3), vec![f64::NAN])],
        )
        .unwrap();
        let text = daily_table_report(&table);
        assert!(text.contains("2024-01-02"));
        assert!(text.contains("0.5000"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn headline_listing_is_numbered() {
        let headlines = vec![Headline {
            approx_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            title: "Shares rally".into(),
        }];
        let text = headlines_report("AAPL", &headlines);
        assert!(text.contains("dates approximate"));
        assert!(text.lines().last().unwrap().contains("2024-03-10  Shares rally"));
    }

    #[test]
    fn empty_cache_says_so() {
        let text = cache_status_report(Path::new("data"), &[]);
        assert_eq!(text, "Cache is empty: data");
    }
}
