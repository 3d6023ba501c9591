use rescope_api::{FallbackRequest, FallbackRequestSink};
use rescope_core::config::ScanOptions;
use rescope_core::registry::ResourceSummary;
use rescope_core::{BuildOutput, BuildSession, BundleCollector, RescopeError};
use serde::Serialize;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

pub struct ScanFlags {
    pub json: bool,
    pub fallback_on_empty: bool,
    pub strict: bool,
}

/// Raises a request whenever the build configured no resources.
struct EmptyResourcesFallback;

impl FallbackRequestSink for EmptyResourcesFallback {
    fn resource_fallback(&self) -> Option<FallbackRequest> {
        Some(FallbackRequest::new(
            "no --include pattern and no resource configuration was given",
        ))
    }
}

#[derive(Debug, Serialize)]
struct Manifest {
    resources: Vec<ResourceSummary>,
    bundles: Vec<String>,
    total_bytes: usize,
    iterations: usize,
    passes: usize,
    loaded_configurations: usize,
    fallback: Option<FallbackRequest>,
}

impl Manifest {
    fn new(output: &BuildOutput, bundles: Vec<String>) -> Self {
        Self {
            resources: output.resources.summaries(),
            bundles,
            total_bytes: output.resources.total_bytes(),
            iterations: output.iterations,
            passes: output.passes.len(),
            loaded_configurations: output.loaded_configurations,
            fallback: output.fallback.clone(),
        }
    }
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Digest")]
    digest: String,
}

impl From<&ResourceSummary> for ResourceRow {
    fn from(summary: &ResourceSummary) -> Self {
        Self {
            path: summary.path.clone(),
            size: format_size(summary.size),
            digest: summary.digest.clone(),
        }
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}

fn render_table(manifest: &Manifest) -> String {
    let mut out = String::new();
    if manifest.resources.is_empty() {
        out.push_str("No resources registered.\n");
    } else {
        let rows: Vec<ResourceRow> = manifest.resources.iter().map(ResourceRow::from).collect();
        out.push_str(&Table::new(rows).with(Style::psql()).to_string());
        out.push('\n');
    }

    out.push_str(&format!(
        "\nResources: {} ({})\n",
        manifest.resources.len(),
        format_size(manifest.total_bytes)
    ));
    out.push_str(&format!(
        "Iterations: {}, passes: {}, configurations: {}\n",
        manifest.iterations, manifest.passes, manifest.loaded_configurations
    ));
    if !manifest.bundles.is_empty() {
        out.push_str(&format!("Bundles: {}\n", manifest.bundles.join(", ")));
    }
    if let Some(fallback) = &manifest.fallback {
        out.push_str(&format!("Fallback requested: {}\n", fallback));
    }
    out
}

pub fn run(options: ScanOptions, flags: ScanFlags) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Scanning {} classpath entries with {} include patterns",
        options.classpath.len(),
        options.include.len()
    );

    let bundles = Arc::new(BundleCollector::new());
    let mut builder = BuildSession::builder(options).with_bundle_sink(bundles.clone());
    if flags.fallback_on_empty {
        builder = builder.with_fallback_sink(Arc::new(EmptyResourcesFallback));
    }

    let output = builder.build().run()?;
    let manifest = Manifest::new(&output, bundles.names());

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        print!("{}", render_table(&manifest));
    }

    if let Some(request) = output.fallback {
        if flags.strict {
            return Err(RescopeError::FallbackRequested(request).into());
        }
        warn!("Continuing without resource configuration: {}", request);
    }
    Ok(())
}
