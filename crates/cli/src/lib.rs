mod check;
mod scan;

use clap::{Args, Parser, Subcommand};
use rescope_core::config::{ScanOptions, DEFAULT_MAX_ITERATIONS};
use rescope_core::logging::{init_logging, LoggingConfig};
use rescope_core::RescopeError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rescope",
    version,
    about = "Discover the resources a native image has to embed",
    long_about = "Rescope collects resource inclusion patterns from options, configuration files \
                  and build features, scans the classpath and module graph until no new pattern \
                  shows up, and reports the sealed resource set."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full discovery session and print the resource manifest
    #[command(
        long_about = "Loads resource configurations, scans every classpath element and module \
                            until a fixpoint is reached, seals the registry and prints what was \
                            registered."
    )]
    Scan {
        #[command(flatten)]
        input: InputArgs,

        /// Print the manifest as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Raise a fallback request when no resources are configured
        #[arg(long)]
        fallback_on_empty: bool,

        /// Fail when a fallback request is raised
        #[arg(long, requires = "fallback_on_empty")]
        strict: bool,
    },
    /// Validate patterns and resource configurations without scanning
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

/// Where resources and their configuration come from
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Classpath entries: directories or jar/zip archives, in order
    #[arg(value_name = "CLASSPATH_ENTRY")]
    pub classpath: Vec<PathBuf>,

    /// Resource pattern (regular expression matched against the full path)
    #[arg(short = 'I', long = "include", value_name = "REGEX")]
    pub include: Vec<String>,

    /// Resource configuration JSON file
    #[arg(long = "resource-config", value_name = "FILE")]
    pub config_files: Vec<PathBuf>,

    /// Resource configuration looked up by name in every classpath entry
    #[arg(long = "resource-config-resource", value_name = "NAME")]
    pub config_resources: Vec<String>,

    /// Runtime image: a jimage `modules` file, a JDK home or an exploded image
    #[arg(long, value_name = "PATH", conflicts_with = "system_modules")]
    pub runtime_image: Option<PathBuf>,

    /// Scan the module graph of the JDK found on this machine
    #[arg(long)]
    pub system_modules: bool,

    /// Analysis iterations allowed before giving up
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_ITERATIONS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_iterations: usize,
}

impl InputArgs {
    pub fn into_options(self) -> ScanOptions {
        ScanOptions {
            classpath: self.classpath,
            include: self.include,
            config_files: self.config_files,
            config_resources: self.config_resources,
            runtime_image: self.runtime_image,
            system_modules: self.system_modules,
            max_iterations: self.max_iterations,
        }
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Scan { .. } => "scan",
        Commands::Check { .. } => "check",
    };
    let _guard = init_logging(&LoggingConfig::new(component));

    match cli.command {
        Commands::Scan {
            input,
            json,
            fallback_on_empty,
            strict,
        } => scan::run(
            input.into_options(),
            scan::ScanFlags {
                json,
                fallback_on_empty,
                strict,
            },
        ),
        Commands::Check { input } => check::run(input.into_options()),
    }
}

/// Render a failure for the terminal. Internal errors are defects, so they
/// carry their whole cause chain and ask for a report.
pub fn render_error(error: &(dyn std::error::Error + 'static)) -> String {
    let internal = error
        .downcast_ref::<RescopeError>()
        .is_some_and(RescopeError::is_internal);
    if !internal {
        return format!("Error: {}", error);
    }

    let mut out = format!(
        "Internal error, please report this as a bug in rescope:\n  {}",
        error
    );
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    out
}
