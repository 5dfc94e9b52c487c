use crate::icloudsort_core::checksum::ChecksumPolicy;
use crate::icloudsort_core::planner::DEFAULT_DIR_PATTERN;
use clap::Parser;
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Process and organize iCloud Photos archives")]
pub struct Cli {
    /// Directory containing uncompressed iCloud Photos archives, including the 'Photos' directory
    #[arg(long, required = true)]
    pub source: PathBuf,

    /// Directory where organized photos will be saved (omit for a dry run)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Do not process photos from the Personal Library
    #[arg(long)]
    pub skip_personal_library: bool,

    /// Do not process photos from the Shared Library
    #[arg(long)]
    pub skip_shared_library: bool,

    /// Validate iCloud checksums
    #[arg(long)]
    pub validate_checksums: bool,

    /// What a failed checksum does: stop the run, or skip just that photo
    #[arg(long, value_enum, default_value_t = ChecksumPolicy::Abort)]
    pub checksum_policy: ChecksumPolicy,

    /// Overwrite existing files in the output directory
    #[arg(short = 'y', long)]
    pub overwrite: bool,

    /// Make no changes, just print what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output directory layout below Personal/ and Shared/ (e.g. "year/month", "year/month-day")
    #[arg(long, default_value = DEFAULT_DIR_PATTERN)]
    pub date_format: String,

    /// Do not set copied files' modification and access times to the creation date
    #[arg(long)]
    pub no_set_timestamps: bool,

    /// Do not read embedded metadata; date every photo from the catalogs
    #[arg(long)]
    pub skip_metadata: bool,

    /// Enable file logging to icloudsort.log
    #[arg(long = "log")]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug)]
    pub log_level: LevelFilter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["icloudsort", "--source", "/export"]);
        assert_eq!(cli.source, PathBuf::from("/export"));
        assert!(cli.output.is_none());
        assert_eq!(cli.date_format, "year/month");
        assert_eq!(cli.checksum_policy, ChecksumPolicy::Abort);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from([
            "icloudsort",
            "--source",
            "/export",
            "--output",
            "/out",
            "-y",
            "-n",
            "-v",
            "--checksum-policy",
            "skip-record",
        ]);
        assert!(cli.overwrite && cli.dry_run && cli.verbose);
        assert_eq!(cli.checksum_policy, ChecksumPolicy::SkipRecord);
    }
}
