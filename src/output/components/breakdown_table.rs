use crate::format::{format_percent, truncate_name};
use crate::model::Totals;
use crate::output::Theme;
use crate::util::format_duration_ms;
use rich_rust::prelude::*;
use rich_rust::renderables::Cell;

/// Counts per index key (environment, browser, suite or category).
pub struct BreakdownTable<'a> {
    title: String,
    rows: Vec<(String, Totals)>,
    theme: &'a Theme,
}

impl<'a> BreakdownTable<'a> {
    pub fn new(title: impl Into<String>, theme: &'a Theme) -> Self {
        Self {
            title: title.into(),
            rows: vec![],
            theme,
        }
    }

    pub fn add(&mut self, label: impl Into<String>, totals: &Totals) -> &mut Self {
        self.rows.push((label.into(), *totals));
        self
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let right = |name: &str| Column::new(name).justify(JustifyMethod::Right).min_width(6);
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.table_border.clone())
            .header_style(self.theme.table_header.clone())
            .title(Text::styled(&self.title, self.theme.panel_title.clone()))
            .with_column(Column::new("Name").min_width(12).max_width(40))
            .with_column(right("Total"))
            .with_column(right("Passed"))
            .with_column(right("Failed"))
            .with_column(right("Skipped"))
            .with_column(right("Pass rate"))
            .with_column(right("Duration"));

        for (label, totals) in &self.rows {
            let failed_style = if totals.failed > 0 {
                self.theme.verdict_fail.clone()
            } else {
                self.theme.muted.clone()
            };
            let rate = (totals.total > 0).then(|| totals.pass_rate());
            table.add_row(Row::new(vec![
                Cell::new(Text::new(truncate_name(label, 40))).style(self.theme.suite_name.clone()),
                Cell::new(Text::new(totals.total.to_string())).style(self.theme.count.clone()),
                Cell::new(Text::new(totals.passed.to_string())).style(self.theme.verdict_pass.clone()),
                Cell::new(Text::new(totals.failed.to_string())).style(failed_style),
                Cell::new(Text::new(totals.skipped.to_string())).style(self.theme.muted.clone()),
                Cell::new(Text::new(format_percent(rate))),
                Cell::new(Text::new(format_duration_ms(totals.duration_ms)))
                    .style(self.theme.timestamp.clone()),
            ]));
        }

        table
    }
}
