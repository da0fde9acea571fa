use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;
use std::time::Duration;

use linkclique::cli::pipeline::PipelineObserver;
use linkclique::ingest::IngestProgress;
use linkclique::report::SearchReport;
use linkclique::search::SearchProgress;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
    Plain,
}

pub struct Ui {
    palette: Palette,
    paint: bool,
    quiet: bool,
    bar_style: Option<ProgressStyle>,
}

impl Ui {
    pub fn new(theme: Theme, quiet: bool) -> Self {
        let stdout_is_tty = std::io::stdout().is_terminal();
        let paint = match theme {
            Theme::Plain => false,
            Theme::Auto | Theme::Light | Theme::Dark => stdout_is_tty,
        } && !quiet;

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = match theme {
            Theme::Plain => Palette::plain(),
            Theme::Light => Palette::light(),
            Theme::Dark | Theme::Auto => Palette::dark(),
        };

        let bar_style = ProgressStyle::with_template(
            "{prefix} {msg:<10} [{bar:30}] {pos}/{len} ({elapsed_precise}, eta {eta})",
        )
        .ok()
        .map(|style| style.progress_chars("=> "));

        Self {
            palette,
            paint,
            quiet,
            bar_style,
        }
    }

    pub fn spacer(&self) {
        if !self.quiet {
            println!();
        }
    }

    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        if self.quiet {
            return;
        }
        let rows: Vec<(String, String)> = rows
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        if rows.is_empty() {
            return;
        }

        self.heading(title);
        let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            if self.paint {
                println!(
                    "  {} {}",
                    self.palette.key.paint(format!("{key:>key_width$}:")),
                    self.palette.value.paint(value)
                );
            } else {
                println!("  {key:>key_width$}: {value}");
            }
        }
    }

    pub fn list<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let entries: Vec<String> = entries.into_iter().collect();
        if entries.is_empty() {
            return;
        }
        self.heading(title);
        for entry in entries {
            if self.paint {
                println!("  {} {entry}", self.palette.bullet.paint("•"));
            } else {
                println!("  - {entry}");
            }
        }
    }

    /// Prints the ranking; result lines are never decorated so they stay greppable.
    pub fn results(&self, report: &SearchReport) {
        if !self.quiet {
            self.heading(&format!("Top {} cliques", report.top_k));
        }
        for line in report.render_lines() {
            println!("{line}");
        }
        if !report.complete {
            let reason = report
                .abort_reason
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "search failed".to_string());
            self.warn(&format!("results are incomplete: {reason}"));
        }
    }

    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.paint {
            self.palette.info.paint(INFO_ICON)
        } else {
            Style::new().paint(INFO_ICON)
        };
        println!("{prefix} {message}");
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.paint {
            self.palette.success.paint(SUCCESS_ICON)
        } else {
            Style::new().paint(SUCCESS_ICON)
        };
        println!("{prefix} {message}");
    }

    pub fn warn(&self, message: &str) {
        if self.quiet {
            eprintln!("{message}");
            return;
        }
        let prefix = if self.paint {
            self.palette.warn.paint(WARNING_ICON)
        } else {
            Style::new().paint(WARNING_ICON)
        };
        eprintln!("{prefix} {message}");
    }

    /// Observer that drives one progress bar per pipeline phase.
    pub fn observer(&self) -> ProgressObserver<'_> {
        ProgressObserver {
            ui: self,
            ingest: None,
            search: None,
        }
    }

    fn bar(&self, label: &str, len: u64) -> Option<ProgressBar> {
        if self.quiet {
            return None;
        }
        let style = self.bar_style.clone()?;
        let pb = ProgressBar::new(len);
        pb.set_style(style);
        pb.set_prefix(self.icon(PROGRESS_ICON));
        pb.set_message(label.to_string());
        Some(pb)
    }

    fn icon(&self, icon: &str) -> String {
        if self.paint {
            self.palette.info.paint(icon).to_string()
        } else {
            icon.to_string()
        }
    }

    fn heading(&self, title: &str) {
        if self.quiet {
            println!("{title}");
            return;
        }
        let formatted = format!("{HEADING_ICON} {title}");
        if self.paint {
            println!("{}", self.palette.heading.paint(formatted));
        } else {
            println!("{formatted}");
        }
    }
}

pub struct ProgressObserver<'a> {
    ui: &'a Ui,
    ingest: Option<ProgressBar>,
    search: Option<ProgressBar>,
}

impl ProgressObserver<'_> {
    pub fn finish(&mut self) {
        for pb in [self.ingest.take(), self.search.take()].into_iter().flatten() {
            pb.finish_and_clear();
        }
    }
}

impl PipelineObserver for ProgressObserver<'_> {
    fn ingest_progress(&mut self, progress: IngestProgress, bytes_read: u64, total_bytes: u64) {
        if self.ingest.is_none() {
            self.ingest = self.ui.bar("ingest", total_bytes);
        }
        if let Some(pb) = &self.ingest {
            pb.set_position(bytes_read.min(total_bytes));
            pb.set_message(format!("{} docs", progress.documents));
        }
    }

    fn search_progress(&mut self, progress: SearchProgress) {
        if let Some(pb) = self.ingest.take() {
            pb.finish_and_clear();
        }
        if self.search.is_none() {
            self.search = self.ui.bar("search", progress.total);
        }
        if let Some(pb) = &self.search {
            pb.set_position(progress.processed);
            pb.set_message(format!("best {}", progress.best));
        }
    }
}

impl Drop for ProgressObserver<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs_f64() >= 1.0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{:.0}ms", duration.as_secs_f64() * 1_000.0)
    }
}

struct Palette {
    heading: Style,
    key: Style,
    value: Style,
    bullet: Style,
    info: Style,
    success: Style,
    warn: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            heading: Style::new().fg(Color::Purple).bold(),
            key: Style::new().fg(Color::LightBlue).bold(),
            value: Style::new().fg(Color::White),
            bullet: Style::new().fg(Color::LightBlue),
            info: Style::new().fg(Color::LightCyan),
            success: Style::new().fg(Color::LightGreen).bold(),
            warn: Style::new().fg(Color::Yellow).bold(),
        }
    }

    fn light() -> Self {
        Self {
            heading: Style::new().fg(Color::Blue).bold(),
            key: Style::new().fg(Color::Black).bold(),
            value: Style::new().fg(Color::Black),
            bullet: Style::new().fg(Color::Blue),
            info: Style::new().fg(Color::Purple),
            success: Style::new().fg(Color::Green).bold(),
            warn: Style::new().fg(Color::Red).bold(),
        }
    }

    fn plain() -> Self {
        Self {
            heading: Style::new(),
            key: Style::new(),
            value: Style::new(),
            bullet: Style::new(),
            info: Style::new(),
            success: Style::new(),
            warn: Style::new(),
        }
    }
}

const HEADING_ICON: &str = "▸";
const SUCCESS_ICON: &str = "✔";
const WARNING_ICON: &str = "⚠";
const INFO_ICON: &str = "ℹ";
const PROGRESS_ICON: &str = "▶";
