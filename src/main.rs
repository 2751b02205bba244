//! GPU Key Generation CLI
//!
//! Generates one private key and prints it as hex.

use clap::Parser;
use gpu_keygen::{
    metrics::{MetricsRegistry, MetricsSnapshot},
    EntropySources, FileConfig, KeyGenerator, KeygenError, SeedSelection,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Generate a private key from GPU-gathered entropy.
#[derive(Debug, Parser)]
#[command(name = "gpu-keygen", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Kernel source to load instead of the embedded program (GPU devices only).
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Mixer lanes (work-items per launch).
    #[arg(long)]
    width: Option<u32>,

    /// XOR every mixer lane into the seed instead of taking the first four.
    #[arg(long)]
    fold_all: bool,

    /// Fail instead of falling back to a CPU device.
    #[arg(long)]
    require_gpu: bool,

    /// Also print the candidate seed.
    #[arg(long)]
    show_entropy: bool,

    /// Print Prometheus metrics on exit.
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    fn load_config(&self) -> Result<FileConfig, KeygenError> {
        let mut config = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        if let Some(kernel) = &self.kernel {
            config.device.kernel_path = Some(kernel.clone());
        }
        if let Some(width) = self.width {
            config.mixer.width = width;
        }
        if self.fold_all {
            config.seed.selection = SeedSelection::FoldAll;
        }
        if self.require_gpu {
            config.device.allow_cpu_fallback = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<(), KeygenError> {
    let config = cli.load_config()?;
    let mut generator = KeyGenerator::from_config(&config)?.retain_entropy(cli.show_entropy);
    info!(device = %generator.device().info().name, "Using compute device");

    let mut sources = EntropySources::from_os_entropy();
    let result = generator.generate(&mut sources);

    if let Ok(key) = &result {
        if let Some(entropy) = &key.entropy {
            println!("Entropy (hex): {}", entropy.to_hex());
        }
        println!("Private Key (hex): {}", key.private_key.to_hex());
    }

    generator.release();

    if cli.metrics {
        match MetricsRegistry::new() {
            Ok(registry) => {
                registry.update(&MetricsSnapshot::from_components(&generator));
                match registry.encode() {
                    Ok(text) => print!("{}", text),
                    Err(e) => tracing::warn!("Metrics encoding failed: {}", e),
                }
            }
            Err(e) => tracing::warn!("Metrics registry unavailable: {}", e),
        }
    }

    result.map(|_| ())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("GPU Key Generator v{}", gpu_keygen::VERSION);

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {}", e.category(), e);
            ExitCode::FAILURE
        }
    }
}
