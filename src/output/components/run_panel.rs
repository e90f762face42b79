use crate::format::{format_percent, format_score, format_totals, format_trend, health_icon};
use crate::output::{OutputContext, Theme};
use crate::pipeline::RunOutcome;
use rich_rust::prelude::*;
use std::path::Path;

/// Headline numbers of one aggregation run.
pub struct RunPanel<'a> {
    outcome: &'a RunOutcome,
    report_root: &'a Path,
    theme: &'a Theme,
}

impl<'a> RunPanel<'a> {
    #[must_use]
    pub fn new(outcome: &'a RunOutcome, report_root: &'a Path, theme: &'a Theme) -> Self {
        Self {
            outcome,
            report_root,
            theme,
        }
    }

    /// The same content as plain lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let o = self.outcome;
        let m = &o.metrics;
        let mut lines = vec![
            format!(
                "{} health {}",
                health_icon(m.overall_health),
                m.overall_health
            ),
            format!("Tests:    {}", format_totals(&o.snapshot.totals)),
            format!("Pass:     {}", format_percent(Some(m.pass_rate))),
            format!("Quality:  {}", format_score(m.quality_score)),
            format!("Trend:    {}", format_trend(&o.trend)),
            format!(
                "Inputs:   {} artifact(s), {} media, {} diagnostic(s)",
                o.artifacts,
                o.media,
                o.snapshot.errors.len()
            ),
            format!("Reports:  {}", self.report_root.display()),
        ];
        if !o.history_saved {
            lines.push("History:  not saved (existing file is corrupt)".to_string());
        }
        lines
    }

    pub fn print(&self, ctx: &OutputContext) {
        let o = self.outcome;
        let m = &o.metrics;
        let mut content = Text::new("");

        content.append_styled(
            &format!("{} {}\n\n", health_icon(m.overall_health), m.overall_health),
            self.theme.health_style(m.overall_health),
        );

        let field = |content: &mut Text, label: &str, value: &str, style: Style| {
            content.append_styled(&format!("{label:<10}"), self.theme.dimmed.clone());
            content.append_styled(&format!("{value}\n"), style);
        };
        field(&mut content, "Tests", &format_totals(&o.snapshot.totals), self.theme.count.clone());
        field(&mut content, "Pass", &format_percent(Some(m.pass_rate)), self.theme.emphasis.clone());
        field(&mut content, "Quality", &format_score(m.quality_score), self.theme.emphasis.clone());
        field(
            &mut content,
            "Trend",
            &format_trend(&o.trend),
            self.theme.trend_style(o.trend.direction),
        );
        field(
            &mut content,
            "Inputs",
            &format!(
                "{} artifact(s), {} media, {} diagnostic(s)",
                o.artifacts,
                o.media,
                o.snapshot.errors.len()
            ),
            self.theme.muted.clone(),
        );
        field(
            &mut content,
            "Reports",
            &self.report_root.display().to_string(),
            self.theme.path.clone(),
        );
        if !o.history_saved {
            field(
                &mut content,
                "History",
                "not saved (existing file is corrupt)",
                self.theme.warning.clone(),
            );
        }

        let panel = Panel::from_rich_text(&content, ctx.width().min(100))
            .title(Text::styled("QA run", self.theme.panel_title.clone()))
            .box_style(self.theme.box_style)
            .border_style(self.theme.panel_border.clone());

        ctx.render(&panel);
    }
}
