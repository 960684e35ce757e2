//! Human-readable text output.

use std::io::{self, Write};

use yansi::{Color, Paint, Style};

use crate::duplicates::{GroupingResult, HashedImage, ScanSummary};

/// Plain-text report of a scan, optionally colored with ANSI escapes.
pub struct TextOutput<'a> {
    result: &'a GroupingResult<HashedImage>,
    summary: &'a ScanSummary,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a new text report.
    #[must_use]
    pub fn new(result: &'a GroupingResult<HashedImage>, summary: &'a ScanSummary) -> Self {
        Self {
            result,
            summary,
            color: true,
        }
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: impl std::fmt::Display, style: Style) -> String {
        if self.color {
            text.to_string().paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let heading = Style::new().bold();
        let keep = Style::new().fg(Color::Green);
        let dup = Style::new().fg(Color::Yellow);
        let warn = Style::new().fg(Color::Red);
        let summary = self.summary;

        if self.result.groups().is_empty() {
            writeln!(writer, "No duplicate images found.")?;
        } else {
            writeln!(
                writer,
                "{}",
                self.paint(
                    format!(
                        "Found {} duplicate group(s) ({}, {} bits, threshold {})",
                        self.result.groups().len(),
                        summary.algorithm,
                        summary.hash_bits,
                        summary.threshold
                    ),
                    heading
                )
            )?;
        }

        for (idx, group) in self.result.groups().iter().enumerate() {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.paint(
                    format!(
                        "Group {} ({} images, fingerprint {})",
                        idx + 1,
                        group.len(),
                        group.representative().fingerprint
                    ),
                    heading
                )
            )?;
            writeln!(
                writer,
                "  {} {}",
                self.paint("KEEP     ", keep),
                group.representative().entry.path.display()
            )?;
            for member in group.duplicates() {
                writeln!(
                    writer,
                    "  {} {}",
                    self.paint("DUPLICATE", dup),
                    member.entry.path.display()
                )?;
            }
        }

        if !summary.skipped.is_empty() {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.paint(
                    format!("Skipped {} image(s):", summary.skipped.len()),
                    warn
                )
            )?;
            for skip in &summary.skipped {
                writeln!(writer, "  {}: {}", skip.path.display(), skip.reason)?;
            }
        }

        if !summary.scan_errors.is_empty() {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.paint(
                    format!("{} file(s) could not be read:", summary.scan_errors.len()),
                    warn
                )
            )?;
            for error in &summary.scan_errors {
                writeln!(writer, "  {error}")?;
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Summary: {} image(s) found ({}), {} hashed, {} skipped, {} group(s), {} duplicate(s), {} unique, {:.2}s",
            summary.total_files,
            summary.total_size_display(),
            summary.images_hashed,
            summary.skipped.len(),
            summary.duplicate_groups,
            summary.duplicate_files,
            self.result.ungrouped().len() + self.result.groups().len(),
            summary.scan_duration.as_secs_f64()
        )?;
        Ok(())
    }

    /// Render the report as a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
