use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for prism")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and docs in order, stopping at the first failure
    Check,
    /// Check formatting
    Fmt,
    /// Lint every target with warnings denied
    Clippy,
    /// Run the workspace tests
    Test {
        /// Restrict to one crate, e.g. `prism-render`
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Launch the model viewer, forwarding any extra arguments
    Viewer {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// One cargo invocation with a label for the log line.
struct Step {
    label: &'static str,
    args: Vec<String>,
}

impl Step {
    fn new(label: &'static str, args: &[&str]) -> Self {
        Self {
            label,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn run(&self) -> Result<()> {
        println!("==> cargo {}", self.args.join(" "));
        let status = Command::new("cargo").args(&self.args).status()?;
        if !status.success() {
            anyhow::bail!("{} failed ({status})", self.label);
        }
        Ok(())
    }
}

fn fmt() -> Step {
    Step::new("fmt", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Step {
    Step::new("clippy", &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
}

fn test(package: Option<String>) -> Step {
    match package {
        Some(package) => Step::new("test", &["test", "-p"]).arg(package),
        None => Step::new("test", &["test", "--workspace"]),
    }
}

fn doc() -> Step {
    Step::new("doc", &["doc", "--workspace", "--no-deps"])
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let steps = match cli.command {
        Commands::Check => vec![fmt(), clippy(), test(None), doc()],
        Commands::Fmt => vec![fmt()],
        Commands::Clippy => vec![clippy()],
        Commands::Test { package } => vec![test(package)],
        Commands::Doc => vec![doc()],
        Commands::Build { release } => {
            let build = Step::new("build", &["build", "--workspace"]);
            vec![if release { build.arg("--release") } else { build }]
        }
        Commands::Viewer { args } => {
            let run = Step::new("viewer", &["run", "-p", "prism-viewer", "--"]);
            vec![args.into_iter().fold(run, Step::arg)]
        }
    };

    for step in &steps {
        step.run()?;
    }
    Ok(())
}
