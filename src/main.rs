use adcp_qcplot::cli::{Cli, Commands, OutputFormat, generate_template, load_config, log_filter, validation_report};
use adcp_qcplot::info::{
    get_dataset_info, print_dataset_info_csv, print_dataset_info_human, print_dataset_info_json,
    print_dataset_info_yaml,
};
use adcp_qcplot::log::{config_echo, show_farewell_with_timing, show_greeting};
use adcp_qcplot::{JobOutcome, RunOptions, process_plot_job};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file should still be reported through the logger.
    let config = load_config(cli.config.as_deref());
    let configured_level = config
        .as_ref()
        .ok()
        .and_then(|c| c.cli_options.log_level.clone());

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(filter) = log_filter(cli.verbose, cli.quiet, configured_level.as_deref()) {
        builder.parse_filters(&filter);
    }
    builder.init();

    match cli.command {
        Commands::Plot(ref args) => {
            let start_time = Instant::now();
            let source = cli
                .config
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "command line".to_string());
            show_greeting(&source, cli.quiet);

            let config = config.context("Failed to load configuration")?;
            let job = args.apply_to(config.job).context("Invalid command-line arguments")?;
            config_echo(&job, cli.quiet);

            let options = RunOptions {
                force: args.force,
                dry_run: args.dry_run,
                quiet: cli.quiet,
            };
            let outcome = process_plot_job(&job, &options)
                .await
                .with_context(|| format!("Failed to plot {}", job.input))?;

            match outcome {
                JobOutcome::Validated => {
                    if !cli.quiet {
                        println!("\nDry run: configuration is valid");
                    }
                }
                JobOutcome::Plotted(report) => {
                    show_farewell_with_timing(&report.output, start_time.elapsed(), cli.quiet);
                }
            }
        }
        Commands::Validate {
            ref config_file,
            detailed,
        } => {
            let config = match config_file {
                Some(path) => load_config(Some(path.as_path())),
                None => config,
            }
            .context("Failed to load configuration")?;

            let checks = validation_report(&config.job);
            let passed = checks.iter().all(|c| c.passed);
            match cli.output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checks)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&checks)?),
                OutputFormat::Csv => {
                    println!("check,passed,message");
                    for check in &checks {
                        println!("{},{},\"{}\"", check.name, check.passed, check.message);
                    }
                }
                OutputFormat::Human => {
                    for check in checks.iter().filter(|c| detailed || !c.passed) {
                        println!(
                            "{} {}: {}",
                            if check.passed { "✓" } else { "✗" },
                            check.name,
                            check.message
                        );
                    }
                    if passed {
                        println!("Configuration is valid");
                    }
                }
            }
            if !passed {
                anyhow::bail!("Configuration validation failed");
            }
        }
        Commands::Info {
            ref file,
            detailed,
            ref variable,
            format,
        } => {
            let info = get_dataset_info(file, variable.as_deref(), detailed).await?;
            let configured_format = config.ok().and_then(|c| c.cli_options.output_format);
            let format = format
                .or(if cli.output_format != OutputFormat::Human {
                    Some(cli.output_format)
                } else {
                    None
                })
                .or(configured_format)
                .unwrap_or(OutputFormat::Human);
            match format {
                OutputFormat::Human => print_dataset_info_human(&info),
                OutputFormat::Json => print_dataset_info_json(&info)?,
                OutputFormat::Yaml => print_dataset_info_yaml(&info)?,
                OutputFormat::Csv => print_dataset_info_csv(&info)?,
            }
        }
        Commands::Template {
            ref template_type,
            ref output,
            ref format,
        } => {
            let template = generate_template(template_type, format)?;
            write_or_print(output.as_ref(), template.as_bytes())?;
        }
        Commands::Completions { shell, ref output } => {
            let mut command = Cli::command();
            let mut buffer = Vec::new();
            clap_complete::generate(shell, &mut command, "adcp-qcplot", &mut buffer);
            write_or_print(output.as_ref(), &buffer)?;
        }
    }

    Ok(())
}

fn write_or_print(output: Option<&PathBuf>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
            log::info!("Wrote {:?}", path);
        }
        None => std::io::stdout().write_all(content)?,
    }
    Ok(())
}
