use std::io::Write;

use jobscout_core::{JobListing, Platform, PlatformOutcome, PlatformStatus};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print what a scrape is about to do.
pub fn print_scrape_header(
    w: &mut dyn Write,
    file_name: &str,
    resume_id: i64,
    location: &str,
    limit: usize,
    platforms: &[Platform],
    color: ColorMode,
) -> std::io::Result<()> {
    let names: Vec<&str> = platforms.iter().map(|p| p.display_name()).collect();
    if color.enabled() {
        writeln!(w, "{} {} (resume #{})", "Scraping for".bold(), file_name.bold().cyan(), resume_id)?;
    } else {
        writeln!(w, "Scraping for {} (resume #{})", file_name, resume_id)?;
    }
    writeln!(w, "Location: {location}, up to {limit} per platform")?;
    writeln!(w, "Platforms: {}", names.join(", "))?;
    writeln!(w)?;
    Ok(())
}

/// Print the keyword set, noting when the defaults stood in for an empty one.
pub fn print_keywords(
    w: &mut dyn Write,
    keywords: &[String],
    used_defaults: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    let joined = keywords.join(", ");
    if color.enabled() {
        writeln!(w, "{} {}", "Keywords:".bold(), joined.cyan())?;
    } else {
        writeln!(w, "Keywords: {joined}")?;
    }
    if used_defaults {
        let note = "(no keywords found in the resume, using defaults)";
        if color.enabled() {
            writeln!(w, "{}", note.dimmed())?;
        } else {
            writeln!(w, "{note}")?;
        }
    }
    Ok(())
}

/// One line per platform: what the fetch saw and how many records it added.
pub fn print_platform_outcomes(
    w: &mut dyn Write,
    outcomes: &[PlatformOutcome],
    color: ColorMode,
) -> std::io::Result<()> {
    for outcome in outcomes {
        let name = outcome.platform.display_name();
        let secs = outcome.elapsed.as_secs_f64();
        match &outcome.status {
            PlatformStatus::Found(n) => {
                let label = format!("FOUND {n}");
                if color.enabled() {
                    writeln!(w, "  {:<16} {} ({secs:.1}s)", name, label.green())?;
                } else {
                    writeln!(w, "  {:<16} {} ({secs:.1}s)", name, label)?;
                }
            }
            PlatformStatus::Empty => {
                let label = format!("EMPTY, {} placeholder(s)", outcome.contributed);
                if color.enabled() {
                    writeln!(w, "  {:<16} {} ({secs:.1}s)", name, label.yellow())?;
                } else {
                    writeln!(w, "  {:<16} {} ({secs:.1}s)", name, label)?;
                }
            }
            PlatformStatus::Failed(reason) => {
                let label = format!("FAILED: {reason}, {} placeholder(s)", outcome.contributed);
                if color.enabled() {
                    writeln!(w, "  {:<16} {} ({secs:.1}s)", name, label.red())?;
                } else {
                    writeln!(w, "  {:<16} {} ({secs:.1}s)", name, label)?;
                }
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

pub fn print_jobs(w: &mut dyn Write, jobs: &[JobListing], color: ColorMode) -> std::io::Result<()> {
    if jobs.is_empty() {
        writeln!(w, "No listings.")?;
        return Ok(());
    }

    for job in jobs {
        let inactive = if job.is_active { "" } else { " [inactive]" };
        if color.enabled() {
            writeln!(
                w,
                "{} {} {}{}",
                format!("[{}]", job.platform.display_name()).dimmed(),
                job.title.bold(),
                format!("at {}", job.company).cyan(),
                inactive.dimmed()
            )?;
        } else {
            writeln!(
                w,
                "[{}] {} at {}{}",
                job.platform.display_name(),
                job.title,
                job.company,
                inactive
            )?;
        }
        writeln!(w, "    {} | {}", job.location, job.link)?;
    }
    Ok(())
}

/// Print the closing line of a scrape.
pub fn print_summary(
    w: &mut dyn Write,
    jobs_created: usize,
    total_listed: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(
            w,
            "{} new listing(s) stored, {} on record for this resume",
            jobs_created.to_string().bold().green(),
            total_listed
        )?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{sep}")?;
        writeln!(
            w,
            "{jobs_created} new listing(s) stored, {total_listed} on record for this resume"
        )?;
        writeln!(w, "{sep}")?;
    }
    Ok(())
}
