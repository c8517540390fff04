//! Batch executor with progress reporting.

use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::errors::BuildError;
use crate::core::package::Package;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Shared compiler options for package builds.
#[derive(Debug, Clone, Default)]
pub struct PackageBuildOptions {
    /// Package build parallelism (`-p`)
    pub parallelism: Option<usize>,
    pub race: bool,
    pub verbose: bool,
    /// Extra flags inserted before the package list
    pub extra_flags: Vec<String>,
}

/// `go build [-p n] [-race] [-v] [extra...] <targets...>`
pub fn package_build_command<I, S>(targets: I, opts: &PackageBuildOptions) -> ProcessBuilder
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cmd = ProcessBuilder::new("go").arg("build");
    if let Some(p) = opts.parallelism {
        cmd = cmd.args(["-p".to_string(), p.to_string()]);
    }
    if opts.race {
        cmd = cmd.arg("-race");
    }
    if opts.verbose {
        cmd = cmd.arg("-v");
    }
    cmd = cmd.args(&opts.extra_flags);
    cmd.args(targets.into_iter().map(|t| t.as_ref().to_string()))
}

/// Runs package batches one after another, stopping at the first failure.
pub struct BatchExecutor<'a> {
    runner: &'a dyn CommandRunner,
    opts: PackageBuildOptions,
    delay: Duration,
    show_progress: bool,
}

impl<'a> BatchExecutor<'a> {
    /// Create a new batch executor.
    pub fn new(runner: &'a dyn CommandRunner, opts: PackageBuildOptions) -> Self {
        BatchExecutor {
            runner,
            opts,
            delay: Duration::ZERO,
            show_progress: false,
        }
    }

    /// Pause between batches (not after the last one).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Show a progress bar instead of per-batch log lines.
    pub fn progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Build every batch in order.
    pub fn execute(&self, batches: &[&[Package]]) -> Result<BuildProgress, BuildError> {
        let start = Instant::now();
        let mut progress = BuildProgress::new(batches.len());

        let bar = if self.show_progress && batches.len() > 1 {
            let bar = ProgressBar::new(batches.len() as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map(|s| s.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            Some(bar)
        } else {
            None
        };

        for (i, batch) in batches.iter().enumerate() {
            let label = format!("batch {}/{}", i + 1, batches.len());
            let batch_start = Instant::now();

            match bar {
                Some(ref bar) => bar.set_message(label.clone()),
                None => tracing::info!("Building {} ({} packages)", label, batch.len()),
            }

            let cmd = package_build_command(batch.iter().map(Package::import_path), &self.opts);
            if let Err(e) = self.runner.run_cmd(&cmd) {
                if let Some(ref bar) = bar {
                    bar.abandon_with_message(format!("{} failed", label));
                }
                return Err(BuildError::build_failed(label, e));
            }

            progress.batch_done(batch.len());
            if let Some(ref bar) = bar {
                bar.inc(1);
            }
            tracing::debug!(
                "{} completed in {:.2}s",
                label,
                batch_start.elapsed().as_secs_f64()
            );

            if !self.delay.is_zero() && i + 1 < batches.len() {
                thread::sleep(self.delay);
            }
        }

        if let Some(bar) = bar {
            bar.finish_with_message("done");
        }

        eprintln!(
            "    Finished {} package(s) in {} batch(es) in {:.2}s",
            progress.package_count(),
            progress.batch_count(),
            start.elapsed().as_secs_f64()
        );

        Ok(progress)
    }
}

/// Progress of a batched build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildProgress {
    batches_done: usize,
    packages_done: usize,
    total_batches: usize,
}

impl BuildProgress {
    /// Create a new progress tracker.
    pub fn new(total_batches: usize) -> Self {
        BuildProgress {
            batches_done: 0,
            packages_done: 0,
            total_batches,
        }
    }

    /// Record a completed batch of `packages` packages.
    pub fn batch_done(&mut self, packages: usize) {
        self.batches_done += 1;
        self.packages_done += packages;
    }

    /// Get completed batch count.
    pub fn batch_count(&self) -> usize {
        self.batches_done
    }

    /// Get built package count.
    pub fn package_count(&self) -> usize {
        self.packages_done
    }

    /// Check if every batch has been built.
    pub fn is_complete(&self) -> bool {
        self.batches_done >= self.total_batches
    }
}
