use crate::core::rnd::Rnd;
use crate::domain::model::{Batch, RunReport, RunSettings, Sample};
use crate::domain::ports::{Storage, Workload};
use crate::utils::error::{ErrorSeverity, Result};
use crate::utils::monitor::SystemMonitor;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub struct DiceEngine<W: Workload> {
    workload: W,
    settings: RunSettings,
    monitor: SystemMonitor,
}

impl<W: Workload> DiceEngine<W> {
    pub fn new(workload: W, settings: RunSettings) -> Self {
        Self::new_with_monitoring(workload, settings, false)
    }

    pub fn new_with_monitoring(workload: W, settings: RunSettings, monitor_enabled: bool) -> Self {
        Self {
            workload,
            settings,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Produce `count` samples from one random source seeded by the settings.
    pub fn generate(&self) -> Result<Batch> {
        let mut rnd = Rnd::from_seed(self.settings.seed);
        let mut batch = Batch::default();

        for index in 0..self.settings.count {
            match self.workload.produce(&mut rnd, index) {
                Ok(sample) => batch.samples.push(sample),
                Err(e) if self.settings.keep_going && e.severity() < ErrorSeverity::Critical => {
                    tracing::warn!("⚠️ Sample {} failed: {}", index, e);
                    batch.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(
            "Generated {} samples ({} failed)",
            batch.samples.len(),
            batch.failed
        );
        Ok(batch)
    }

    pub async fn run<S: Storage>(&self, storage: &S) -> Result<RunReport> {
        tracing::info!(
            "🎲 Starting {} run: {} samples, seed {}",
            self.workload.name(),
            self.settings.count,
            self.settings
                .seed
                .map_or_else(|| "random".to_string(), |s| s.to_string())
        );

        // Generate
        let batch = self.generate()?;
        self.monitor.log_stats("Generate");

        // Store
        let files = match &self.settings.archive {
            Some(archive) => {
                let data = build_archive(&batch.samples)?;
                storage.write_file(archive, &data).await?;
                vec![archive.clone()]
            }
            None => {
                let mut files = Vec::with_capacity(batch.samples.len());
                for sample in &batch.samples {
                    storage.write_file(&sample.file_name, &sample.content).await?;
                    files.push(sample.file_name.clone());
                }
                files
            }
        };
        self.monitor.log_stats("Store");
        self.monitor.log_final_stats(batch.samples.len());

        tracing::info!(
            "✅ {} run finished: {} generated, {} failed",
            self.workload.name(),
            batch.samples.len(),
            batch.failed
        );

        Ok(RunReport {
            workload: self.workload.name().to_string(),
            generated: batch.samples.len(),
            failed: batch.failed,
            files,
        })
    }
}

pub fn build_archive(samples: &[Sample]) -> Result<Vec<u8>> {
    tracing::debug!("Creating ZIP file with {} files", samples.len());

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for sample in samples {
        zip.start_file(sample.file_name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(&sample.content)?;
    }
    Ok(zip.finish()?.into_inner())
}
