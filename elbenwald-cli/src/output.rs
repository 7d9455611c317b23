//! Output formatting abstraction for text vs JSON rendering
//!
//! All command output flows through [`OutputWriter`] which handles format
//! switching. The writer is also the report sink of `elbenwald check`, so
//! reports reach stdout the same way as every other payload.

use std::io::Write;

use serde::Serialize;

use elbenwald_core::error::ReportError;
use elbenwald_core::pipeline::{ReportEnvelope, ReportSink};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Writes CLI output in the selected format.
///
/// Handlers call `writer.render(&payload)` where `payload` implements both
/// `Serialize` (for JSON) and `Render` (for text).
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, payload)
    }

    /// Render a payload to `w`.
    ///
    /// `Text` delegates to `Render::render_text()`, `Json` serialises
    /// via `serde_json`.
    pub fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

impl ReportSink for OutputWriter {
    async fn deliver(&self, envelope: &ReportEnvelope) -> Result<(), ReportError> {
        self.render(envelope).map_err(|e| match e {
            CliError::JsonSerialize(e) => ReportError::Serialize(e.to_string()),
            other => ReportError::Write(format!("stdout: {other}")),
        })
    }
}

/// Human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

impl Render for ReportEnvelope {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = &self.report;
        writeln!(w, "Load balancer: {}", self.load_balancer.bold())?;
        writeln!(w, "  Check:     {}", self.check_id)?;
        writeln!(
            w,
            "  Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S %z")
        )?;

        if report.is_empty() {
            writeln!(w, "  (no instances registered)")?;
        } else {
            writeln!(
                w,
                "  {:<24} {:>8} {:>10}  {}",
                "ZONE", "HEALTHY", "TRANSIENT", "STATUS"
            )?;
            for (zone, stats) in &report.zone_stats {
                let status = if stats.healthy_count == 0 {
                    "DOWN".red().bold()
                } else if stats.transient_count > 0 {
                    "UNKNOWN".yellow()
                } else {
                    "OK".green()
                };
                writeln!(
                    w,
                    "  {:<24} {:>8} {:>10}  {}",
                    zone, stats.healthy_count, stats.transient_count, status
                )?;
            }
        }

        let minimum = report
            .minimum
            .map_or_else(|| "-".to_owned(), |m| m.to_string());
        writeln!(
            w,
            "  Total: {}  Zones: {} (healthy {}, unhealthy {}, unknown {})",
            report.total, report.zones, report.healthy_zones, report.unhealthy_zones,
            report.unknown_zones
        )?;
        writeln!(w, "  Minimum: {}  Average: {:.2}", minimum, report.average)?;
        Ok(())
    }
}
