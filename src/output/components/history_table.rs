use crate::format::{format_percent, format_score, health_icon};
use crate::history::HistoryEntry;
use crate::output::Theme;
use rich_rust::prelude::*;
use rich_rust::renderables::Cell;

/// Past runs, oldest first.
pub struct HistoryTable<'a> {
    entries: &'a [HistoryEntry],
    theme: &'a Theme,
}

impl<'a> HistoryTable<'a> {
    #[must_use]
    pub fn new(entries: &'a [HistoryEntry], theme: &'a Theme) -> Self {
        Self { entries, theme }
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let right = |name: &str| Column::new(name).justify(JustifyMethod::Right);
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.table_border.clone())
            .header_style(self.theme.table_header.clone())
            .title(Text::styled(
                format!("History ({} runs)", self.entries.len()),
                self.theme.panel_title.clone(),
            ))
            .with_column(Column::new("When").width(16))
            .with_column(right("Total"))
            .with_column(right("Failed"))
            .with_column(right("Pass rate"))
            .with_column(right("Quality"))
            .with_column(Column::new("Health").min_width(10))
            .with_column(Column::new("Env").max_width(16));

        for entry in self.entries {
            let meta = &entry.metadata;
            let health = meta.overall_health.map_or_else(String::new, |h| {
                format!("{} {}", health_icon(h), h.as_str())
            });
            let health_style = meta
                .overall_health
                .map_or_else(|| self.theme.muted.clone(), |h| self.theme.health_style(h));
            table.add_row(Row::new(vec![
                Cell::new(Text::new(entry.timestamp.format("%Y-%m-%d %H:%M").to_string()))
                    .style(self.theme.timestamp.clone()),
                Cell::new(Text::new(entry.total.to_string())).style(self.theme.count.clone()),
                Cell::new(Text::new(entry.failed.to_string())),
                Cell::new(Text::new(format_percent(Some(entry.pass_rate)))),
                Cell::new(Text::new(format_score(meta.quality_score))),
                Cell::new(Text::new(health)).style(health_style),
                Cell::new(Text::new(meta.test_env.clone().unwrap_or_default()))
                    .style(self.theme.muted.clone()),
            ]));
        }

        table
    }
}
