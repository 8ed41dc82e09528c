use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::RwLock;

use crate::pipeline::{AbortReason, RunEvent, RunReport};
use crate::record::Diagnostic;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Only progress bar and final summary
    Summary = 1,   // Run progress (default)
    Detailed = 2,  // Per-candidate steps and diagnostics
    Debug = 3,     // Everything, including raw oracle output
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

/// User-facing progress and run summary for the CLI
#[derive(Clone)]
pub struct RunLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
    metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<String>,
}

#[derive(Default, Clone)]
struct RunMetadata {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    names_searched: usize,
    runs_aborted: usize,
    candidates_processed: usize,
    records: usize,
    diagnostics: usize,
    output_files: Vec<String>,
}

impl RunLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
            metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: String) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are shown at every verbosity
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", Local::now().format("%H:%M:%S%.3f"), level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Print above the progress bar when one is active
        if let Ok(guard) = self.progress_bar.try_read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    fn with_metadata(&self, f: impl FnOnce(&mut RunMetadata)) {
        if let Ok(mut metadata) = self.metadata.lock() {
            f(&mut metadata);
        }
    }

    /// Start the progress bar over `total_names` searches.
    pub async fn start_progress(&self, total_names: u64) {
        let pb = ProgressBar::new(total_names);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Starting...");

        *self.progress_bar.write().await = Some(pb);
        self.with_metadata(|m| m.start_time = Some(Instant::now()));
    }

    pub async fn update_progress(&self, message: &str) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.set_message(message.to_string());
        }
    }

    pub async fn advance_progress(&self) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.inc(1);
        }
    }

    pub async fn finish_progress(&self, final_message: &str) {
        if let Some(pb) = self.progress_bar.write().await.take() {
            pb.finish_and_clear();
        }
        self.with_metadata(|m| m.end_time = Some(Instant::now()));
        self.info(final_message);
    }

    /// Handle a pipeline event as it happens.
    pub fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::CandidateStarted { index, total, profile_url } => {
                self.with_metadata(|m| m.candidates_processed += 1);
                if let Ok(guard) = self.progress_bar.try_read() {
                    if let Some(pb) = guard.as_ref() {
                        pb.set_message(format!("candidate {}/{}: {}", index + 1, total, profile_url));
                    }
                }
                self.debug(&format!("Enriching candidate {}/{}: {}", index + 1, total, profile_url));
            }
            RunEvent::Recorded(record) => {
                self.info(&format!(
                    "{} -> {} ({})",
                    record.profile_url, record.org_name, record.classification
                ));
            }
            RunEvent::Diagnostic(diagnostic) => self.diagnostic(diagnostic),
        }
    }

    /// Diagnostics are part of the results, so they show at the default
    /// verbosity and go through the progress bar like every other line.
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("DIAG", &diagnostic.to_string());
        }
        if let Some(raw) = &diagnostic.raw {
            self.debug(&format!("Raw oracle output: {}", raw));
        }
    }

    /// Fold a finished run into the summary counters.
    pub fn record_run(&self, report: &RunReport) {
        self.with_metadata(|m| {
            m.names_searched += 1;
            m.records += report.records.len();
            m.diagnostics += report.diagnostics.len();
            if report.abort_reason().is_some() {
                m.runs_aborted += 1;
            }
        });
        if let Some(reason) = report.abort_reason() {
            let why = match reason {
                AbortReason::NoProfilesFound => "no profile URLs found",
                AbortReason::DiscoveryParseFailed => "profile search output could not be parsed",
                AbortReason::DiscoveryFailed => "profile search failed",
            };
            self.info(&format!("Search for '{}' ended early: {}", report.name, why));
        }
    }

    pub fn record_failed_run(&self, name: &str, error: &str) {
        self.with_metadata(|m| m.names_searched += 1);
        self.error(&format!("Search for '{}' failed: {}", name, error));
    }

    pub fn log_export_success(&self, path: &str) {
        self.with_metadata(|m| m.output_files.push(path.to_string()));
        self.info(&format!("Export completed: {}", path));
    }

    pub fn print_final_summary(&self) {
        let Ok(metadata) = self.metadata.lock() else {
            return;
        };

        println!("\n=== SEARCH SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            println!("Duration: {:.2}s", end.duration_since(start).as_secs_f64());
        }
        println!("Names Searched: {}", metadata.names_searched);
        println!("Searches Ended Early: {}", metadata.runs_aborted);
        println!("Candidates Processed: {}", metadata.candidates_processed);
        println!("Records: {}", metadata.records);
        println!("Diagnostics: {}", metadata.diagnostics);
        for file in &metadata.output_files {
            println!("Results Exported: {}", file);
        }
        println!("======================\n");

        if metadata.records > 0 {
            println!("✅ Search completed. Produced {} record(s).", metadata.records);
        } else {
            println!("✅ Search completed. No records produced.");
        }
    }

    /// Write all buffered log lines to the configured log file
    pub fn export_logs(&self) -> io::Result<()> {
        let Some(ref log_file_path) = self.log_file_path else {
            return Ok(());
        };
        let Ok(buffer) = self.log_buffer.lock() else {
            return Ok(());
        };

        if let Some(parent) = Path::new(log_file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)?;
        for entry in buffer.iter() {
            writeln!(file, "{}", entry)?;
        }
        file.flush()
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}
