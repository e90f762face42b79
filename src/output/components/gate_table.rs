use crate::format::{format_score, verdict_icon};
use crate::metrics::GateResult;
use crate::output::Theme;
use rich_rust::prelude::*;
use rich_rust::renderables::Cell;

/// Gate verdicts in evaluation order.
pub struct GateTable<'a> {
    gates: &'a [GateResult],
    theme: &'a Theme,
}

impl<'a> GateTable<'a> {
    #[must_use]
    pub fn new(gates: &'a [GateResult], theme: &'a Theme) -> Self {
        Self { gates, theme }
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.table_border.clone())
            .header_style(self.theme.table_header.clone())
            .title(Text::styled("Quality gates", self.theme.panel_title.clone()))
            .with_column(Column::new("Gate").min_width(16))
            .with_column(Column::new("Actual").justify(JustifyMethod::Right).min_width(7))
            .with_column(Column::new("").justify(JustifyMethod::Center).width(2))
            .with_column(Column::new("Threshold").justify(JustifyMethod::Right).min_width(9))
            .with_column(Column::new("Verdict").min_width(9))
            .with_column(Column::new("Alert").min_width(8));

        for gate in self.gates {
            let verdict = format!("{} {}", verdict_icon(gate.verdict), gate.verdict.as_str());
            let alert = gate.severity.map_or("", |s| s.as_str());
            let alert_style = if alert == "critical" {
                self.theme.health_critical.clone()
            } else {
                self.theme.health_warning.clone()
            };
            table.add_row(Row::new(vec![
                Cell::new(Text::new(&gate.name)).style(self.theme.emphasis.clone()),
                Cell::new(Text::new(format_score(gate.actual))),
                Cell::new(Text::new(gate.comparison.symbol())).style(self.theme.muted.clone()),
                Cell::new(Text::new(format_score(Some(gate.threshold)))),
                Cell::new(Text::new(verdict)).style(self.theme.verdict_style(gate.verdict)),
                Cell::new(Text::new(alert)).style(alert_style),
            ]));
        }

        table
    }
}
