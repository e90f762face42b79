use crate::monitor::StatusRecord;
use crate::output::Theme;
use crate::util::format_duration_ms;
use rich_rust::prelude::*;
use rich_rust::renderables::Cell;

/// Per-suite rows of a status monitor record.
pub struct StatusTable<'a> {
    record: &'a StatusRecord,
    theme: &'a Theme,
}

impl<'a> StatusTable<'a> {
    #[must_use]
    pub fn new(record: &'a StatusRecord, theme: &'a Theme) -> Self {
        Self { record, theme }
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let count = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |n| n.to_string());
        let right = |name: &str| Column::new(name).justify(JustifyMethod::Right);
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.table_border.clone())
            .header_style(self.theme.table_header.clone())
            .title(Text::styled(
                format!("Run status: {}", self.record.overall),
                self.theme.overall_status_style(self.record.overall),
            ))
            .with_column(Column::new("Suite").min_width(12).max_width(40))
            .with_column(Column::new("Status").min_width(8))
            .with_column(right("Tests"))
            .with_column(right("Passed"))
            .with_column(right("Failed"))
            .with_column(right("Duration"));

        for (name, state) in &self.record.suites {
            table.add_row(Row::new(vec![
                Cell::new(Text::new(name)).style(self.theme.suite_name.clone()),
                Cell::new(Text::new(state.status.as_str()))
                    .style(self.theme.suite_status_style(state.status)),
                Cell::new(Text::new(count(state.tests))),
                Cell::new(Text::new(count(state.passed))),
                Cell::new(Text::new(count(state.failed))),
                Cell::new(Text::new(
                    state.duration.map_or_else(|| "-".to_string(), format_duration_ms),
                ))
                .style(self.theme.timestamp.clone()),
            ]));
        }

        table
    }
}
