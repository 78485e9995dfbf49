use clap::Parser;

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Parser, Debug)]
#[command(version = "0.1")]
pub struct CliOpts {
    /// Sets the custom configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Turn debugging information on. Ignored when CINEMA_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let opts = CliOpts::parse_from([
            "cinemad",
            "--config",
            "prod.toml",
            "-dd",
            "--log-format",
            "json",
        ]);
        assert_eq!(Some("prod.toml".to_owned()), opts.config);
        assert_eq!(2, opts.debug);
        assert!(matches!(opts.log_format, LogFormat::Json));
    }
}
