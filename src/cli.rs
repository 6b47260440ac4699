//! # CLI Module
//!
//! Command-line interface for adcp-qcplot:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variables with the ADCP_QCPLOT_ prefix
//! - Merging of command line, environment, config file and defaults
//! - Configuration templates and shell completions

use crate::error::QcPlotResult;
use crate::filters::AcceptedFlagSet;
use crate::input::{DEFAULT_INPUT, FigureConfig, JobConfig, load_document};
use crate::storage::StorageFactory;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Quality-controlled ADCP current profile plots from NetCDF datasets
#[derive(Parser, Debug)]
#[command(name = "adcp-qcplot")]
#[command(about = "Plot quality-controlled ADCP velocity profiles from NetCDF datasets")]
#[command(version)]
#[command(long_about = "
adcp-qcplot reads an ADCP (acoustic Doppler current profiler) velocity record from a
NetCDF dataset, keeps only samples whose quality-control flag is accepted, and draws a
two-panel figure: a depth vs profile-index heatmap on a blue-white-red scale, and the
profile index against calendar time.

FEATURES:
  • Quality-control filtering with configurable accepted flag codes
  • Local files, OPeNDAP endpoints, HTTP(S) downloads and S3 objects
  • PNG or SVG output, written locally or uploaded to S3
  • Configuration files: JSON and YAML format support with templates
  • Shell completions: Auto-completion for bash, zsh, fish, and PowerShell

EXAMPLES:
  # Plot the default WATR50 mooring record
  adcp-qcplot plot

  # Plot a local file, good data only
  adcp-qcplot plot adcp.nc ucur.png --accept 1

  # Northward velocity as SVG
  adcp-qcplot plot adcp.nc vcur.svg -n VCUR

  # Using config file
  adcp-qcplot plot --config watr50.yaml

  # File inspection
  adcp-qcplot info adcp.nc --detailed
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "ADCP_QCPLOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter an ADCP dataset and render the figure
    #[command(long_about = "
Filter an ADCP dataset by quality-control flag and render the two-panel figure.

Every option can also come from an ADCP_QCPLOT_* environment variable or a
configuration file. Command line beats environment, which beats the file,
which beats the built-in defaults.

EXAMPLES:
  # Default dataset and output
  adcp-qcplot plot

  # Accept only good data and use a finer palette
  adcp-qcplot plot adcp.nc ucur.png --accept 1 --levels 128

  # S3 in, S3 out
  adcp-qcplot plot s3://moorings/watr50.nc s3://figures/watr50.png

  # Check the job without reading the dataset
  adcp-qcplot plot --config watr50.json --dry-run
")]
    Plot(PlotArgs),

    /// Validate configuration file or arguments
    #[command(long_about = "
Validate a job configuration without reading the dataset.

Checks variable names, accepted flag codes, level count, figure size, and the
shape of the input and output paths (existence for local inputs).

EXAMPLES:
  adcp-qcplot validate watr50.json
  adcp-qcplot validate watr50.yaml --detailed
")]
    Validate {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Show detailed validation report
        #[arg(long)]
        detailed: bool,
    },

    /// Show information about an ADCP dataset
    #[command(long_about = "
Inspect a NetCDF dataset (local, OPeNDAP, HTTP(S) or S3) and display its
dimensions, variables, attributes and quality-control variables.

EXAMPLES:
  adcp-qcplot info adcp.nc
  adcp-qcplot info adcp.nc --detailed
  adcp-qcplot info adcp.nc -n UCUR_quality_control
  adcp-qcplot info adcp.nc --format json
")]
    Info {
        /// Dataset path or URL
        file: String,

        /// Include global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for dataset information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Generate configuration templates
    #[command(long_about = "
Generate job configuration templates.

Available templates:
• basic: local NetCDF file in, PNG out
• opendap: the IMOS WATR50 mooring served over OPeNDAP
• s3: dataset and figure on S3

EXAMPLES:
  adcp-qcplot template basic
  adcp-qcplot template s3 --format yaml -o s3_job.yaml
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, and PowerShell.

EXAMPLES:
  adcp-qcplot completions bash > ~/.bash_completion.d/adcp-qcplot
  adcp-qcplot completions zsh -o _adcp-qcplot
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Arguments of `plot`; each one overrides the configuration file.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct PlotArgs {
    /// Dataset path or URL (local, OPeNDAP, HTTP(S) or S3)
    #[arg(value_name = "INPUT", env = "ADCP_QCPLOT_INPUT")]
    pub input: Option<String>,

    /// Figure path (local or S3); `.svg` selects SVG output
    #[arg(value_name = "OUTPUT", env = "ADCP_QCPLOT_OUTPUT")]
    pub output: Option<String>,

    /// Measurement variable to plot
    #[arg(short = 'n', long, env = "ADCP_QCPLOT_VARIABLE")]
    pub variable: Option<String>,

    /// Depth coordinate variable
    #[arg(long, env = "ADCP_QCPLOT_DEPTH_VARIABLE")]
    pub depth_variable: Option<String>,

    /// Time coordinate variable
    #[arg(long, env = "ADCP_QCPLOT_TIME_VARIABLE")]
    pub time_variable: Option<String>,

    /// Quality-control variable (default: <variable>_quality_control)
    #[arg(long, env = "ADCP_QCPLOT_FLAG_VARIABLE")]
    pub flag_variable: Option<String>,

    /// Accepted flag codes, comma separated
    #[arg(long, value_delimiter = ',', env = "ADCP_QCPLOT_ACCEPT")]
    pub accept: Option<Vec<i32>>,

    /// Colormap level count (even)
    #[arg(long, env = "ADCP_QCPLOT_LEVELS")]
    pub levels: Option<usize>,

    /// Figure width in pixels
    #[arg(long, env = "ADCP_QCPLOT_WIDTH")]
    pub width: Option<u32>,

    /// Figure height in pixels
    #[arg(long, env = "ADCP_QCPLOT_HEIGHT")]
    pub height: Option<u32>,

    /// Force overwrite existing output files
    #[arg(long, env = "ADCP_QCPLOT_FORCE")]
    pub force: bool,

    /// Dry run - validate configuration without plotting
    #[arg(long, env = "ADCP_QCPLOT_DRY_RUN")]
    pub dry_run: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
    /// CSV output (where applicable)
    Csv,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Local NetCDF file to PNG
    Basic,
    /// IMOS WATR50 mooring over OPeNDAP
    Opendap,
    /// S3 storage template
    S3,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Job configuration plus CLI-only options, as read from a config file.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct CliConfig {
    #[serde(flatten)]
    pub job: JobConfig,

    /// CLI-specific options
    #[serde(default)]
    pub cli_options: CliOptions,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct CliOptions {
    /// Default log level when neither RUST_LOG nor -v/-q is given
    pub log_level: Option<String>,

    /// Default format for `info`
    pub output_format: Option<OutputFormat>,
}

impl CliConfig {
    /// Loads a config file the same way as [`JobConfig::from_file`].
    pub fn from_file(path: &Path) -> QcPlotResult<Self> {
        load_document(path)
    }
}

/// The config file if one was given, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> QcPlotResult<CliConfig> {
    match path {
        Some(path) => CliConfig::from_file(path),
        None => Ok(CliConfig::default()),
    }
}

impl PlotArgs {
    /// Applies command-line (and environment) values on top of `job`.
    pub fn apply_to(&self, mut job: JobConfig) -> QcPlotResult<JobConfig> {
        if let Some(input) = &self.input {
            job.input = input.clone();
        }
        if let Some(output) = &self.output {
            job.output = output.clone();
        }
        if let Some(variable) = &self.variable {
            job.variable_name = variable.clone();
        }
        if let Some(depth_variable) = &self.depth_variable {
            job.depth_variable = depth_variable.clone();
        }
        if let Some(time_variable) = &self.time_variable {
            job.time_variable = time_variable.clone();
        }
        if let Some(flag_variable) = &self.flag_variable {
            job.flag_variable = Some(flag_variable.clone());
        }
        if let Some(accept) = &self.accept {
            job.accepted_flags = AcceptedFlagSet::new(accept.clone())?;
        }
        if let Some(levels) = self.levels {
            job.levels = levels;
        }
        if let Some(width) = self.width {
            job.figure.width = width;
        }
        if let Some(height) = self.height {
            job.figure.height = height;
        }
        Ok(job)
    }
}

/// One line of a validation report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

impl ValidationCheck {
    fn new(name: &str, passed: bool, message: impl Into<String>) -> Self {
        ValidationCheck {
            name: name.to_string(),
            passed,
            message: message.into(),
        }
    }
}

/// Runs every configuration check and collects the outcomes.
pub fn validation_report(config: &JobConfig) -> Vec<ValidationCheck> {
    let mut checks = Vec::new();

    checks.push(match config.validate() {
        Ok(()) => ValidationCheck::new("job", true, "fields are well formed"),
        Err(e) => ValidationCheck::new("job", false, e.to_string()),
    });

    let input = &config.input;
    checks.push(if StorageFactory::is_opendap_url(input) {
        ValidationCheck::new("input", true, format!("OPeNDAP endpoint {}", input))
    } else if StorageFactory::is_local_path(input) {
        let exists = Path::new(input).exists();
        ValidationCheck::new(
            "input",
            exists,
            if exists {
                format!("local file {}", input)
            } else {
                format!("local file {} does not exist", input)
            },
        )
    } else {
        ValidationCheck::new("input", true, format!("remote object {} (downloaded before reading)", input))
    });

    let output = &config.output;
    checks.push(if StorageFactory::is_http_path(output) {
        ValidationCheck::new("output", false, "figures cannot be written to HTTP URLs")
    } else {
        ValidationCheck::new(
            "output",
            true,
            format!("{} figure at {}", crate::render::ImageFormat::from_path(output).extension(), output),
        )
    });

    checks.push(ValidationCheck::new(
        "variables",
        true,
        format!(
            "{} with flags {}, depth {}, time {}",
            config.variable_name,
            config.flag_variable(),
            config.depth_variable,
            config.time_variable
        ),
    ));
    checks
}

/// Renders a job template in the requested format.
pub fn generate_template(template_type: &TemplateType, format: &ConfigFormat) -> QcPlotResult<String> {
    let job = match template_type {
        TemplateType::Basic => JobConfig {
            input: "data/adcp.nc".to_string(),
            output: "figures/ucur.png".to_string(),
            ..JobConfig::default()
        },
        TemplateType::Opendap => JobConfig {
            input: DEFAULT_INPUT.to_string(),
            output: "watr50_ucur.png".to_string(),
            flag_variable: Some("UCUR_quality_control".to_string()),
            ..JobConfig::default()
        },
        TemplateType::S3 => JobConfig {
            input: "s3://my-bucket/moorings/adcp.nc".to_string(),
            output: "s3://my-bucket/figures/ucur.svg".to_string(),
            figure: FigureConfig {
                width: 1300,
                height: 1800,
            },
            ..JobConfig::default()
        },
    };
    match format {
        ConfigFormat::Json => job.to_json(),
        ConfigFormat::Yaml => job.to_yaml(),
    }
}

/// Log filter for the given flags: `-v` is debug, `-q` is error, otherwise
/// `RUST_LOG` (left to env_logger), then the configured level, then info.
pub fn log_filter(verbose: bool, quiet: bool, configured: Option<&str>) -> Option<String> {
    if verbose {
        Some("debug".to_string())
    } else if quiet {
        Some("error".to_string())
    } else if std::env::var("RUST_LOG").is_ok() {
        None
    } else {
        Some(configured.unwrap_or("info").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QcPlotError;
    use crate::testing::env_lock;

    #[test]
    fn test_apply_overrides() {
        let args = PlotArgs {
            input: Some("adcp.nc".to_string()),
            variable: Some("VCUR".to_string()),
            accept: Some(vec![1]),
            levels: Some(32),
            width: Some(800),
            ..PlotArgs::default()
        };
        let job = args.apply_to(JobConfig::default()).unwrap();
        assert_eq!(job.input, "adcp.nc");
        assert_eq!(job.output, crate::input::DEFAULT_OUTPUT);
        assert_eq!(job.variable_name, "VCUR");
        assert_eq!(job.flag_variable(), "VCUR_quality_control");
        assert_eq!(job.accepted_flags.codes(), &[1]);
        assert_eq!(job.levels, 32);
        assert_eq!(job.figure.size(), (800, crate::input::DEFAULT_HEIGHT));

        let empty = PlotArgs {
            accept: Some(vec![]),
            ..PlotArgs::default()
        };
        assert!(empty.apply_to(JobConfig::default()).is_err());
    }

    #[test]
    fn test_templates_round_trip() {
        for template in [TemplateType::Basic, TemplateType::Opendap, TemplateType::S3] {
            let json = generate_template(&template, &ConfigFormat::Json).unwrap();
            let from_json = JobConfig::from_json(&json).unwrap();
            assert!(from_json.validate().is_ok());

            let yaml = generate_template(&template, &ConfigFormat::Yaml).unwrap();
            assert_eq!(JobConfig::from_yaml(&yaml).unwrap(), from_json);
        }
    }

    #[test]
    fn test_validation_report() {
        let config = JobConfig {
            input: "/nonexistent/adcp.nc".to_string(),
            output: "https://example.org/figure.png".to_string(),
            ..JobConfig::default()
        };
        let report = validation_report(&config);
        let failed: Vec<&str> = report.iter().filter(|c| !c.passed).map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["input", "output"]);

        let report = validation_report(&JobConfig::default());
        assert!(report.iter().all(|c| c.passed));
    }

    #[test]
    fn test_cli_config_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("job.yml");
        std::fs::write(
            &yaml_path,
            "input: adcp.nc\nlevels: 32\ncli_options:\n  log_level: warn\n",
        )
        .unwrap();
        let config = load_config(Some(&yaml_path)).unwrap();
        assert_eq!(config.job.input, "adcp.nc");
        assert_eq!(config.job.levels, 32);
        assert_eq!(config.cli_options.log_level.as_deref(), Some("warn"));

        // Unknown extension: JSON first, then YAML.
        let sniffed = dir.path().join("job.conf");
        std::fs::write(&sniffed, r#"{"variable_name": "VCUR"}"#).unwrap();
        assert_eq!(load_config(Some(&sniffed)).unwrap().job.variable_name, "VCUR");
        std::fs::write(&sniffed, "variable_name: WCUR\ncli_options:\n  output_format: json\n").unwrap();
        let sniffed_yaml = load_config(Some(&sniffed)).unwrap();
        assert_eq!(sniffed_yaml.job.variable_name, "WCUR");
        assert_eq!(sniffed_yaml.cli_options.output_format, Some(OutputFormat::Json));

        let broken = dir.path().join("job.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(load_config(Some(&broken)), Err(QcPlotError::Config(_))));

        assert_eq!(load_config(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn test_log_filter() {
        let _guard = env_lock();
        let original = std::env::var("RUST_LOG").ok();

        assert_eq!(log_filter(true, false, Some("warn")).as_deref(), Some("debug"));
        assert_eq!(log_filter(false, true, None).as_deref(), Some("error"));

        unsafe {
            std::env::remove_var("RUST_LOG");
        }
        assert_eq!(log_filter(false, false, None).as_deref(), Some("info"));
        assert_eq!(log_filter(false, false, Some("warn")).as_deref(), Some("warn"));

        unsafe {
            std::env::set_var("RUST_LOG", "trace");
        }
        assert_eq!(log_filter(false, false, Some("warn")), None);

        unsafe {
            std::env::remove_var("RUST_LOG");
            if let Some(ref val) = original {
                std::env::set_var("RUST_LOG", val);
            }
        }
    }
}
