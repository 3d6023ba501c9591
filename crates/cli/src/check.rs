use rescope_api::ResourcesRegistry;
use rescope_core::config::{load_configurations, ScanOptions};
use rescope_core::container::ClasspathElement;
use rescope_core::pattern::InclusionPatterns;
use rescope_core::{BundleCollector, ResourceRegistry};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, PartialEq, Eq)]
struct CheckReport {
    configurations: usize,
    patterns: usize,
    bundles: usize,
}

fn check(options: &ScanOptions) -> rescope_core::Result<CheckReport> {
    let classpath: Vec<ClasspathElement> = options
        .classpath
        .iter()
        .map(|path| ClasspathElement::from_path(path.clone()))
        .collect();

    let bundles = Arc::new(BundleCollector::new());
    let registry = ResourceRegistry::with_bundle_sink(bundles.clone());
    let configurations = load_configurations(options, &classpath, &registry)?;
    for pattern in &options.include {
        registry.add_resources(pattern)?;
    }

    let patterns = InclusionPatterns::compile(&registry.patterns().drain())?;
    Ok(CheckReport {
        configurations,
        patterns: patterns.len(),
        bundles: bundles.names().len(),
    })
}

pub fn run(options: ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let report = check(&options)?;
    info!("Resource configuration is valid");
    println!(
        "{} patterns, {} bundles from {} configuration sources",
        report.patterns, report.bundles, report.configurations
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescope_core::RescopeError;
    use std::fs;

    #[test]
    fn test_check_counts_sources() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("resources.json");
        fs::write(
            &config,
            r#"{"resources":[{"pattern":"a/.*"},{"pattern":""}],"bundles":[{"name":"app.Messages"}]}"#,
        )
        .unwrap();

        let options = ScanOptions {
            include: vec![r"b\.txt".to_string(), r"a/.*".to_string()],
            config_files: vec![config],
            ..Default::default()
        };

        let report = check(&options).unwrap();
        assert_eq!(
            report,
            CheckReport {
                configurations: 1,
                patterns: 2,
                bundles: 1,
            }
        );
    }

    #[test]
    fn test_check_rejects_malformed_pattern() {
        let options = ScanOptions {
            include: vec!["[unclosed".to_string()],
            ..Default::default()
        };
        match check(&options) {
            Err(RescopeError::PatternSyntax { pattern, .. }) => assert_eq!(pattern, "[unclosed"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
