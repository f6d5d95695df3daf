use crate::pulls::Row;
use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::Path;
use tokio::fs::File;

const BAR_WIDTH: usize = 40;
const TITLE_WIDTH: usize = 60;

/// Pull request count per author, most active first, ties by login.
pub fn top_authors(rows: &[Row], limit: usize) -> Vec<(String, usize)> {
    let mut counts = HashMap::<&str, usize>::new();
    for row in rows {
        *counts.entry(row.author.as_str()).or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(author, count)| (author.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCount {
    /// Sunday closing the week.
    pub week: NaiveDate,
    pub merged: usize,
    pub closed: usize,
}

fn week_ending(date: NaiveDate) -> NaiveDate {
    date + Duration::days(6 - date.weekday().num_days_from_monday() as i64)
}

fn per_week(rows: &[Row]) -> BTreeMap<NaiveDate, usize> {
    let mut weeks = BTreeMap::new();
    for row in rows {
        match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(date) => *weeks.entry(week_ending(date)).or_default() += 1,
            Err(e) => warn!("Skipping #{} with date {:?}: {}", row.number, row.date, e),
        }
    }
    weeks
}

/// Weekly merged/closed counts, with empty weeks filled in between the first and last one.
pub fn evolution(merged: &[Row], closed: &[Row]) -> Vec<WeekCount> {
    let merged = per_week(merged);
    let closed = per_week(closed);

    let first = merged.keys().chain(closed.keys()).min().copied();
    let last = merged.keys().chain(closed.keys()).max().copied();
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut week = first;
    while week <= last {
        series.push(WeekCount {
            week,
            merged: merged.get(&week).copied().unwrap_or(0),
            closed: closed.get(&week).copied().unwrap_or(0),
        });
        week += Duration::days(7);
    }
    series
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(width - 1).collect();
        clipped.push('…');
        clipped
    }
}

pub fn render_table(rows: &[Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.repository.clone(),
                row.number.to_string(),
                clip(&row.title, TITLE_WIDTH),
                row.author.clone(),
                row.date.clone(),
                row.link.clone(),
            ]
        })
        .collect();
    render_grid(
        &["Repository", "Number", "Title", "Author", "Date", "Link"],
        &cells,
    )
}

/// Left-aligned columns separated by two spaces, with a dashed rule under the header.
pub fn render_grid(header: &[&str], cells: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_line = |line: &[&str]| {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        let _ = writeln!(out, "{}", padded.join("  ").trim_end());
    };
    push_line(header);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&rule.iter().map(String::as_str).collect::<Vec<_>>());
    for line in cells {
        push_line(&line.iter().map(String::as_str).collect::<Vec<_>>());
    }
    out
}

pub fn render_bars(counts: &[(String, usize)]) -> String {
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    let name_width = counts.iter().map(|(a, _)| a.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (author, count) in counts {
        let bar = "█".repeat((count * BAR_WIDTH).div_ceil(max));
        let _ = writeln!(out, "{:<name_width$}  {} {}", author, bar, count, name_width = name_width);
    }
    out
}

pub fn render_evolution(series: &[WeekCount]) -> String {
    let mut out = String::from("Week        Merged  Closed\n");
    for point in series {
        let _ = writeln!(
            out,
            "{}  {:>6}  {:>6}",
            point.week.format("%Y-%m-%d"),
            point.merged,
            point.closed
        );
    }
    out
}

/// Writes `rows` as CSV, replacing any existing file.
pub async fn export_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv_async::AsyncSerializer::from_writer(File::create(path).await?);
    for row in rows {
        writer.serialize(row).await?;
    }
    writer.flush().await?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
