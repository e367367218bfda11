//! Plain-text rendering of the view model.

use std::io::{self, Write};

use apart_core::{AppViewModel, FinishedJobView, JobKind, Partition, Phase, RunningJobView};

const BAR_WIDTH: usize = 20;

pub fn render(out: &mut impl Write, view: &AppViewModel) -> io::Result<()> {
    let phase = match view.phase {
        Phase::Loading => "waiting for apart-core",
        Phase::Ready => "ready",
        Phase::ShuttingDown => "shutting down",
    };
    writeln!(out, "== apart ({phase}) ==")?;

    writeln!(out, "Partitions:")?;
    if view.partitions.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for part in &view.partitions {
        writeln!(out, "  {}", partition_line(part))?;
    }
    if !view.compression_options.is_empty() {
        writeln!(out, "Compression: {}", view.compression_options.join(", "))?;
    }

    if !view.running.is_empty() {
        writeln!(out, "Running:")?;
        for job in &view.running {
            writeln!(out, "  {}", running_line(job))?;
        }
    }

    if !view.finished.is_empty() {
        writeln!(out, "Finished:")?;
        for job in &view.finished {
            writeln!(out, "  {}", finished_line(job))?;
        }
    }
    out.flush()
}

pub fn partition_line(part: &Partition) -> String {
    let mut line = format!("{:<20} {:>10}", part.title(), format_size(part.size));
    if let Some(fstype) = &part.fstype {
        line.push_str(&format!("  {fstype}"));
    }
    if part.mounted {
        line.push_str("  (mounted)");
    }
    line
}

pub fn running_line(job: &RunningJobView) -> String {
    let verb = match job.kind {
        JobKind::Clone => "clone",
        JobKind::Restore => "restore",
    };
    let filled = ((job.fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let status = if job.cancelling {
        "cancelling".to_owned()
    } else {
        match &job.remaining {
            Some(remaining) => format!("{}, {} left", job.rate, remaining),
            None => job.rate.clone(),
        }
    };
    format!(
        "[{}] {verb} {}  [{}{}] {:>3.0}%  {}  {}",
        job.job_id,
        job.title,
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        job.fraction * 100.0,
        job.elapsed,
        status
    )
}

pub fn finished_line(job: &FinishedJobView) -> String {
    let mark = if job.success { "ok  " } else { "FAIL" };
    let mut line = format!(
        "[{}] {mark} {}  {}  took {}",
        job.key, job.title, job.finished, job.runtime
    );
    if let Some(error) = &job.error {
        line.push_str(&format!("  ({error})"));
    }
    if let Some(file) = &job.image_file {
        line.push_str(&format!("  {file}"));
    }
    line
}

/// Error prompt for worker-reported failures.
pub fn report_failure(out: &mut impl Write, title: &str, detail: &str) -> io::Result<()> {
    writeln!(out, "!! {title}")?;
    writeln!(out, "!! {detail}")?;
    out.flush()
}

/// Binary units with one decimal, e.g. `1.5 GiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
