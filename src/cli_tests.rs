//! # CLI Integration Tests
//!
//! Argument parsing, environment variables and precedence between the
//! command line, the environment and configuration files.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;

    use crate::cli::{Cli, Commands, ConfigFormat, OutputFormat, PlotArgs, TemplateType, load_config};
    use crate::input::JobConfig;
    use crate::testing::env_lock;

    fn plot_args(cli: &Cli) -> &PlotArgs {
        match &cli.command {
            Commands::Plot(args) => args,
            other => panic!("Expected Plot command, got {:?}", other),
        }
    }

    /// Test basic CLI argument parsing
    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["adcp-qcplot", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error.to_string().contains("profile-index heatmap"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["adcp-qcplot", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "adcp-qcplot",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/job.yaml",
            "template",
            "basic",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/job.yaml")));
    }

    #[test]
    fn test_plot_command_basic() {
        let _guard = env_lock();
        let cli = Cli::parse_from(["adcp-qcplot", "plot", "adcp.nc", "ucur.png", "-n", "VCUR"]);

        let args = plot_args(&cli);
        assert_eq!(args.input, Some("adcp.nc".to_string()));
        assert_eq!(args.output, Some("ucur.png".to_string()));
        assert_eq!(args.variable, Some("VCUR".to_string()));
        assert_eq!(args.accept, None);
        assert!(!args.force);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_plot_command_without_arguments() {
        let _guard = env_lock();
        let cli = Cli::parse_from(["adcp-qcplot", "plot"]);
        let job = plot_args(&cli).apply_to(JobConfig::default()).unwrap();
        assert_eq!(job, JobConfig::default());
    }

    #[test]
    fn test_plot_command_all_options() {
        let _guard = env_lock();
        let cli = Cli::parse_from([
            "adcp-qcplot",
            "plot",
            "s3://moorings/watr50.nc",
            "figures/watr50.svg",
            "--depth-variable",
            "DEPTH",
            "--time-variable",
            "JULD",
            "--flag-variable",
            "UCUR_QC",
            "--accept",
            "1,2,5",
            "--levels",
            "128",
            "--width",
            "800",
            "--height",
            "1200",
            "--force",
            "--dry-run",
        ]);

        let args = plot_args(&cli);
        assert_eq!(args.accept, Some(vec![1, 2, 5]));
        assert!(args.force);
        assert!(args.dry_run);

        let job = args.apply_to(JobConfig::default()).unwrap();
        assert_eq!(job.input, "s3://moorings/watr50.nc");
        assert_eq!(job.output, "figures/watr50.svg");
        assert_eq!(job.depth_variable, "DEPTH");
        assert_eq!(job.time_variable, "JULD");
        assert_eq!(job.flag_variable(), "UCUR_QC");
        assert_eq!(job.accepted_flags.codes(), &[1, 2, 5]);
        assert_eq!(job.levels, 128);
        assert_eq!(job.figure.size(), (800, 1200));
    }

    #[test]
    fn test_invalid_plot_arguments() {
        let _guard = env_lock();
        assert!(Cli::try_parse_from(["adcp-qcplot", "plot", "--accept", "1,good"]).is_err());
        assert!(Cli::try_parse_from(["adcp-qcplot", "plot", "--levels", "-4"]).is_err());
        assert!(Cli::try_parse_from(["adcp-qcplot", "plot", "--width", "wide"]).is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from([
            "adcp-qcplot",
            "info",
            "adcp.nc",
            "--detailed",
            "-n",
            "UCUR",
            "--format",
            "json",
        ]);

        if let Commands::Info {
            file,
            detailed,
            variable,
            format,
        } = &cli.command
        {
            assert_eq!(file, "adcp.nc");
            assert!(detailed);
            assert_eq!(variable, &Some("UCUR".to_string()));
            assert_eq!(format, &Some(OutputFormat::Json));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["adcp-qcplot", "validate", "job.json", "--detailed"]);

        if let Commands::Validate {
            config_file,
            detailed,
        } = &cli.command
        {
            assert_eq!(config_file, &Some(PathBuf::from("job.json")));
            assert!(detailed);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_template_command() {
        let cli = Cli::parse_from([
            "adcp-qcplot",
            "template",
            "opendap",
            "--output",
            "watr50.yaml",
            "--format",
            "yaml",
        ]);

        if let Commands::Template {
            template_type,
            output,
            format,
        } = &cli.command
        {
            assert_eq!(template_type, &TemplateType::Opendap);
            assert_eq!(output, &Some(PathBuf::from("watr50.yaml")));
            assert_eq!(format, &ConfigFormat::Yaml);
        } else {
            panic!("Expected Template command");
        }

        assert!(Cli::try_parse_from(["adcp-qcplot", "template", "weather"]).is_err());
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["adcp-qcplot", "completions", "zsh", "-o", "_adcp-qcplot"]);
        if let Commands::Completions { shell, output } = &cli.command {
            assert_eq!(*shell, clap_complete::Shell::Zsh);
            assert_eq!(output, &Some(PathBuf::from("_adcp-qcplot")));
        } else {
            panic!("Expected Completions command");
        }
    }

    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["adcp-qcplot", "--verbose", "--quiet", "info", "adcp.nc"]);
        assert!(result.is_err());

        let cli_quiet = Cli::parse_from(["adcp-qcplot", "--quiet", "info", "adcp.nc"]);
        assert!(!cli_quiet.verbose);
        assert!(cli_quiet.quiet);
    }

    /// Command line beats environment, which beats the config file
    #[test]
    fn test_environment_and_config_precedence() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("job.json");
        std::fs::write(
            &config_path,
            r#"{"input": "from_config.nc", "output": "config.png", "levels": 16, "accepted_flags": [1]}"#,
        )
        .unwrap();

        unsafe {
            std::env::set_var("ADCP_QCPLOT_CONFIG", &config_path);
            std::env::set_var("ADCP_QCPLOT_OUTPUT", "env.png");
            std::env::set_var("ADCP_QCPLOT_LEVELS", "32");
            std::env::set_var("ADCP_QCPLOT_ACCEPT", "1,2,8");
        }

        let cli = Cli::parse_from(["adcp-qcplot", "plot", "--levels", "48"]);
        assert_eq!(cli.config, Some(config_path.clone()));

        let config = load_config(cli.config.as_deref()).unwrap();
        let job = plot_args(&cli).apply_to(config.job).unwrap();
        assert_eq!(job.input, "from_config.nc"); // config file only
        assert_eq!(job.output, "env.png"); // environment beats config
        assert_eq!(job.levels, 48); // command line beats environment
        assert_eq!(job.accepted_flags.codes(), &[1, 2, 8]);
        assert_eq!(job.variable_name, "UCUR"); // default

        unsafe {
            std::env::remove_var("ADCP_QCPLOT_CONFIG");
            std::env::remove_var("ADCP_QCPLOT_OUTPUT");
            std::env::remove_var("ADCP_QCPLOT_LEVELS");
            std::env::remove_var("ADCP_QCPLOT_ACCEPT");
        }
    }
}
