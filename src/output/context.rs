use super::Theme;
use crate::cli::Cli;
use crate::error::Result;
use rich_rust::prelude::*;
use rich_rust::renderables::Renderable;
use std::io::IsTerminal;

/// Central output coordinator that respects json/quiet/plain modes.
pub struct OutputContext {
    console: Console,
    theme: Theme,
    mode: OutputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Tables, colors, panels
    Rich,
    /// Plain text, no ANSI codes (for piping)
    Plain,
    /// JSON on stdout only
    Json,
    /// Nothing but errors
    Quiet,
}

impl OutputContext {
    #[must_use]
    pub fn from_args(args: &Cli) -> Self {
        Self::from_flags(args.json, args.quiet, args.no_color)
    }

    #[must_use]
    pub fn from_flags(json: bool, quiet: bool, no_color: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if no_color || std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal()
        {
            OutputMode::Plain
        } else {
            OutputMode::Rich
        };

        let console = Self::create_console(mode);

        Self {
            console,
            theme: Theme::default(),
            mode,
        }
    }

    fn create_console(mode: OutputMode) -> Console {
        match mode {
            OutputMode::Rich => Console::new(),
            OutputMode::Plain | OutputMode::Quiet | OutputMode::Json => {
                Console::builder().no_color().force_terminal(false).build()
            }
        }
    }

    pub fn is_rich(&self) -> bool {
        self.mode == OutputMode::Rich
    }
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
    pub fn is_quiet(&self) -> bool {
        self.mode == OutputMode::Quiet
    }
    pub fn is_plain(&self) -> bool {
        self.mode == OutputMode::Plain
    }
    pub fn width(&self) -> usize {
        self.console.width()
    }
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn print(&self, content: &str) {
        match self.mode {
            OutputMode::Rich | OutputMode::Plain => self.console.print(content),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    /// Plain lines bypass markup so paths with brackets print verbatim.
    pub fn line(&self, content: &str) {
        if !self.is_quiet() && !self.is_json() {
            println!("{content}");
        }
    }

    pub fn render<R: Renderable>(&self, renderable: &R) {
        if self.is_rich() {
            self.console.print_renderable(renderable);
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string(value)?);
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => {
                self.console.print(&format!("[bold green]✓[/] {}", message));
            }
            OutputMode::Plain => println!("✓ {}", message),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => {
                self.console
                    .print(&format!("[bold yellow]⚠[/] [yellow]{}[/]", message));
            }
            OutputMode::Plain => eprintln!("Warning: {}", message),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn info(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => {
                self.console.print(&format!("[blue]ℹ[/] {}", message));
            }
            OutputMode::Plain => println!("{}", message),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn section(&self, title: &str) {
        if self.is_rich() {
            let rule = Rule::with_title(Text::styled(title, self.theme.section.clone()));
            self.console.print_renderable(&rule);
        } else if self.is_plain() {
            println!("\n─── {} ───\n", title);
        }
    }

    pub fn newline(&self) {
        if !self.is_quiet() && !self.is_json() {
            println!();
        }
    }
}
