//! Typed HTML view model.
//!
//! Templates never interpolate raw strings: every piece of adapter-derived
//! text goes through a [`Cell`] or [`Block`] and is escaped on render.

use crate::metrics::Health;

/// Escape text for element content and double-quoted attributes.
#[must_use]
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// CSS class for a health value.
#[must_use]
pub const fn health_class(health: Health) -> &'static str {
    match health {
        Health::Good => "good",
        Health::Warning => "warning",
        Health::Critical => "critical",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(u64),
    Percent(Option<f64>),
    Badge { class: &'static str, label: String },
    Link { href: String, label: String },
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn badge(class: &'static str, label: impl Into<String>) -> Self {
        Self::Badge {
            class,
            label: label.into(),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Text(s) => html_escape(s),
            Self::Count(n) => n.to_string(),
            Self::Percent(Some(p)) => format!("{p:.1}%"),
            Self::Percent(None) => "&ndash;".to_string(),
            Self::Badge { class, label } => {
                format!("<span class=\"badge {class}\">{}</span>", html_escape(label))
            }
            Self::Link { href, label } => format!(
                "<a href=\"{}\">{}</a>",
                html_escape(href),
                html_escape(label)
            ),
        }
    }
}

/// A table row; `tags` become `data-*` attributes the filter script reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub tags: Vec<(&'static str, String)>,
}

impl Row {
    #[must_use]
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.tags.push((key, value.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Row>,
    pub filterable: bool,
}

impl Table {
    #[must_use]
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            filterable: false,
        }
    }

    #[must_use]
    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn render(&self, out: &mut String) {
        if self.rows.is_empty() {
            out.push_str("<p class=\"empty\">No data.</p>\n");
            return;
        }
        let class = if self.filterable { " class=\"filterable\"" } else { "" };
        out.push_str(&format!("<table{class}>\n<thead><tr>"));
        for header in &self.headers {
            out.push_str(&format!("<th>{}</th>", html_escape(header)));
        }
        out.push_str("</tr></thead>\n<tbody>\n");
        for row in &self.rows {
            out.push_str("<tr");
            for (key, value) in &row.tags {
                out.push_str(&format!(" data-{key}=\"{}\"", html_escape(value)));
            }
            out.push('>');
            for cell in &row.cells {
                out.push_str(&format!("<td>{}</td>", cell.render()));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
    }
}

/// Headline number on a summary card.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub label: &'static str,
    pub value: String,
    pub class: &'static str,
}

impl Stat {
    pub fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            class: "",
        }
    }

    #[must_use]
    pub const fn class(mut self, class: &'static str) -> Self {
        self.class = class;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Stats(Vec<Stat>),
    Table(Table),
    Paragraph(String),
    List(Vec<String>),
    Gallery(Vec<Cell>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }
}

/// Filter controls rendered above the sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub environments: Vec<String>,
    pub browsers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub subtitle: String,
    pub health: Health,
    pub filters: Option<Filters>,
    pub sections: Vec<Section>,
}

impl Page {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>, health: Health) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            health,
            filters: None,
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut html = String::with_capacity(16 * 1024);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", html_escape(&self.title)));
        html.push_str(STYLE);
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!(
            "<header><h1>{}</h1><p>{}</p><span class=\"badge {}\">{}</span></header>\n",
            html_escape(&self.title),
            html_escape(&self.subtitle),
            health_class(self.health),
            self.health.as_str().to_uppercase(),
        ));

        if let Some(filters) = &self.filters {
            render_filters(filters, &mut html);
        }

        html.push_str("<nav>");
        for section in &self.sections {
            html.push_str(&format!(
                "<a href=\"#{}\">{}</a> ",
                html_escape(&section.id),
                html_escape(&section.title)
            ));
        }
        html.push_str("</nav>\n");

        for section in &self.sections {
            html.push_str(&format!(
                "<section id=\"{}\">\n<h2>{}</h2>\n",
                html_escape(&section.id),
                html_escape(&section.title)
            ));
            for block in &section.blocks {
                render_block(block, &mut html);
            }
            html.push_str("</section>\n");
        }

        if self.filters.is_some() {
            html.push_str(FILTER_SCRIPT);
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn render_filters(filters: &Filters, html: &mut String) {
    html.push_str("<div class=\"filters\">\n");
    html.push_str("<input id=\"filter-text\" type=\"search\" placeholder=\"Filter rows\">\n");
    for (id, label, values) in [
        ("filter-env", "All environments", &filters.environments),
        ("filter-browser", "All browsers", &filters.browsers),
    ] {
        html.push_str(&format!("<select id=\"{id}\"><option value=\"\">{label}</option>"));
        for value in values {
            let value = html_escape(value);
            html.push_str(&format!("<option value=\"{value}\">{value}</option>"));
        }
        html.push_str("</select>\n");
    }
    html.push_str("</div>\n");
}

fn render_block(block: &Block, html: &mut String) {
    match block {
        Block::Stats(stats) => {
            html.push_str("<div class=\"stats\">\n");
            for stat in stats {
                html.push_str(&format!(
                    "<div class=\"stat\"><div class=\"value {}\">{}</div><div class=\"label\">{}</div></div>\n",
                    stat.class,
                    html_escape(&stat.value),
                    html_escape(stat.label)
                ));
            }
            html.push_str("</div>\n");
        }
        Block::Table(table) => table.render(html),
        Block::Paragraph(text) => html.push_str(&format!("<p>{}</p>\n", html_escape(text))),
        Block::List(items) => {
            html.push_str("<ul>\n");
            for item in items {
                html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
            }
            html.push_str("</ul>\n");
        }
        Block::Gallery(items) => {
            if items.is_empty() {
                html.push_str("<p class=\"empty\">None found.</p>\n");
                return;
            }
            html.push_str("<ul class=\"gallery\">\n");
            for item in items {
                html.push_str(&format!("<li>{}</li>\n", item.render()));
            }
            html.push_str("</ul>\n");
        }
    }
}

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; background: #f5f5f5; color: #333; }
header { border-bottom: 2px solid #333; margin-bottom: 20px; }
h2 { color: #555; margin-top: 30px; }
nav a { margin-right: 12px; color: #2563eb; }
.stats { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 15px; margin: 20px 0; }
.stat { background: white; padding: 16px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); text-align: center; }
.stat .value { font-size: 1.8em; font-weight: bold; }
.stat .label { color: #666; margin-top: 5px; }
table { width: 100%; border-collapse: collapse; background: white; margin: 15px 0; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #eee; }
th { background: #f8f9fa; font-weight: 600; }
.badge { padding: 3px 8px; border-radius: 4px; font-size: 0.85em; }
.good, .pass { background: #dcfce7; color: #166534; }
.warning, .skipped { background: #fef9c3; color: #854d0e; }
.critical, .fail { background: #fee2e2; color: #991b1b; }
.filters { display: flex; gap: 10px; margin: 10px 0; }
.gallery { columns: 2; font-family: monospace; font-size: 0.9em; }
.empty { color: #888; font-style: italic; }
</style>
"#;

const FILTER_SCRIPT: &str = r#"<script>
(function () {
  var text = document.getElementById('filter-text');
  var env = document.getElementById('filter-env');
  var browser = document.getElementById('filter-browser');
  function apply() {
    var needle = text.value.toLowerCase();
    var rows = document.querySelectorAll('table.filterable tbody tr');
    rows.forEach(function (row) {
      var ok = row.textContent.toLowerCase().indexOf(needle) !== -1;
      if (env.value && row.dataset.env && row.dataset.env !== env.value) { ok = false; }
      if (browser.value && row.dataset.browser && row.dataset.browser !== browser.value) { ok = false; }
      row.style.display = ok ? '' : 'none';
    });
  }
  [text, env, browser].forEach(function (el) { el.addEventListener('input', apply); });
})();
</script>
"#;
