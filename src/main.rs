use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use kodegen_codesign_tree::{
    CancelToken, FailurePolicy, ProcessRunner, Reporter, SignRequest, SignSettings,
    TerminalReporter, codesign_tree, paths,
};

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// Validation and signing errors are propagated with `?` up to `main`, which
// prints them once in red and exits non-zero. Nothing is signed unless the
// whole map validates.
//
// Status output goes through `TerminalReporter`, whose terminal I/O errors are
// ignored: a closed stdout must not abort a signing run half way.
// ============================================================================

#[derive(Parser)]
#[command(name = "kodegen_codesign_tree")]
#[command(version, about = "Run codesign over a directory tree as described by a JSON map file")]
struct Cli {
    /// Print information about arguments and the codesign commands to be executed
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Don't do anything, just print codesign commands
    #[arg(long, short = 'n')]
    simulate: bool,

    /// The JSON codesigning map file path
    #[arg(long, short = 'm')]
    map_file: PathBuf,

    /// The entitlement file directory
    #[arg(long, short = 'd')]
    ent_dir: PathBuf,

    /// The root dir, e.g. /Users/me/MyApp.app
    #[arg(long, short = 'r')]
    root_dir: PathBuf,

    /// The codesigning identity to use
    #[arg(long, short = 's')]
    sign: String,

    /// Path to the codesign executable (defaults to /usr/bin/codesign)
    #[arg(long)]
    codesign_path: Option<PathBuf>,

    /// Stop at the first failed codesign invocation
    #[arg(long)]
    fail_fast: bool,

    /// Pass each matched path to codesign only once per map entry
    #[arg(long)]
    dedupe: bool,

    /// Path to settings file (TOML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

impl Cli {
    /// Settings from the config file, if any, with flags applied on top.
    fn settings(&self) -> Result<SignSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                let path = paths::expand_tilde_path("settings file", path)?;
                SignSettings::load(&path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?
            }
            None => SignSettings::default(),
        };

        settings.verbose |= self.verbose;
        settings.simulate |= self.simulate;
        settings.dedupe |= self.dedupe;
        if self.fail_fast {
            settings.failure_policy = FailurePolicy::FailFast;
        }
        if let Some(codesign_path) = &self.codesign_path {
            settings.codesign_path = codesign_path.clone();
        }

        Ok(settings)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut reporter = TerminalReporter::default();

    match run(&cli, &mut reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, reporter: &mut TerminalReporter) -> Result<()> {
    let request = SignRequest {
        map_file: cli.map_file.clone(),
        entitlements_dir: cli.ent_dir.clone(),
        root_dir: cli.root_dir.clone(),
        identity: cli.sign.clone(),
        settings: cli.settings()?,
    };

    let summary = codesign_tree(&request, &mut ProcessRunner, reporter, &CancelToken::new())?;

    if request.settings.verbose && !request.settings.simulate {
        reporter.success(&format!("Signed {} map entries", summary.entries.len()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "kodegen_codesign_tree",
            "-m",
            "map.json",
            "-d",
            "ent",
            "-r",
            "App.app",
            "-s",
            "Developer ID Application",
            "-n",
            "--fail-fast",
            "--codesign-path",
            "/opt/codesign",
        ]);
        let settings = cli.settings().unwrap();

        assert!(settings.simulate);
        assert!(!settings.verbose);
        assert_eq!(settings.failure_policy, FailurePolicy::FailFast);
        assert_eq!(settings.codesign_path, PathBuf::from("/opt/codesign"));
        assert_eq!(cli.sign, "Developer ID Application");
    }
}
