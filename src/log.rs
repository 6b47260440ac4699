use crate::filters::FilterSummary;
use crate::input::JobConfig;
use crate::model::{MeasurementVariable, QualityFlagVariable};
use std::time::Duration;

pub fn show_greeting(source: &str, quiet: bool) {
    if quiet {
        return;
    }
    println!("=== ADCP Quality-Controlled Plot ===");
    println!("Loading configuration from: {}", source);
}

pub fn config_echo(config: &JobConfig, quiet: bool) {
    if quiet {
        return;
    }
    println!("\nConfiguration:");
    println!("  Input dataset: {}", config.input);
    println!("  Variable: {}", config.variable_name);
    println!("  Flag variable: {}", config.flag_variable());
    println!("  Depth axis: {}", config.depth_variable);
    println!("  Time axis: {}", config.time_variable);
    println!("  Accepted flags: {:?}", config.accepted_flags.codes());
    println!("  Colormap levels: {}", config.levels);
    println!(
        "  Output figure: {} ({}x{})",
        config.output, config.figure.width, config.figure.height
    );
}

pub fn show_variable_info(measurement: &MeasurementVariable, flags: &QualityFlagVariable, quiet: bool) {
    if quiet {
        return;
    }
    println!("\nVariables:");
    println!(
        "  {}: {:?}, {} in {}, valid range [{}, {}]",
        measurement.name,
        measurement.shape(),
        measurement.long_name,
        measurement.units,
        measurement.valid_range.min,
        measurement.valid_range.max
    );
    println!("  {}: {:?}", flags.name, flags.shape());
    for (position, meaning) in flags.flag_meanings.iter().enumerate() {
        let code = flags
            .flag_values
            .as_ref()
            .and_then(|values| values.get(position).copied())
            .unwrap_or(position as i32);
        println!("    {}: {}", code, meaning);
    }
}

pub fn show_filter_summary(summary: &FilterSummary, accepted: &str, quiet: bool) {
    if quiet {
        return;
    }
    println!("\nQuality Control ({}):", accepted);
    println!("  Samples: {}", summary.total);
    println!(
        "  Accepted: {} ({:.1}%)",
        summary.accepted,
        percentage(summary.accepted, summary.total)
    );
    println!("  Rejected: {}", summary.rejected);
    println!("  Missing in source: {}", summary.missing);
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

pub fn show_farewell_with_timing(output: &str, elapsed: Duration, quiet: bool) {
    if quiet {
        return;
    }
    println!("\nFigure written to: {}", output);
    println!("=== Plot completed in {:.2}s ===", elapsed.as_secs_f64());
}
