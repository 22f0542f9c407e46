//! # gatekeeper
//!
//! Administration CLI for verification rule sets:
//! - check, migrate and evaluate rule set documents offline
//! - import, export, list and clear guild rule sets in the configured database

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gatekeeper_common::models::{BotMember, MemberProfile, Role, RoleDirectory};
use gatekeeper_db::cache::GuildConfigCache;
use gatekeeper_db::Database;
use gatekeeper_rules::serializer::{export, parse_with, ImportOptions};
use gatekeeper_rules::{evaluate, plan_verification, validate_against_directory, RuleSet};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(
    name = "gatekeeper",
    version,
    about = "Manage role verification rule sets"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a rule set document and print a summary
    Check(CheckArgs),
    /// Rewrite a (possibly legacy) document in the current format
    Migrate(MigrateArgs),
    /// Show which rule a member would match
    Evaluate(EvaluateArgs),
    /// Replace a guild's stored rule set with a document
    Import {
        guild: String,
        file: PathBuf,
    },
    /// Print a guild's stored rule set
    Export {
        guild: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List guilds that have a rule set
    List,
    /// Delete a guild's rule set
    Clear { guild: String },
}

#[derive(Args, Debug)]
struct CheckArgs {
    file: PathBuf,
    /// Role directory snapshot (JSON) to check every rule's roles against
    #[arg(long)]
    directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    file: PathBuf,
    /// Base year for legacy rules when the document has none
    #[arg(long)]
    base_year: Option<i32>,
    /// Write to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    file: PathBuf,
    #[arg(long)]
    department: String,
    /// Account creation year
    #[arg(long)]
    year: i32,
    /// Full name, used to preview renaming
    #[arg(long)]
    name: Option<String>,
    /// Role directory snapshot (JSON); resolves the decision into a plan
    #[arg(long)]
    directory: Option<PathBuf>,
}

/// On-disk shape of a role directory snapshot.
#[derive(Debug, Deserialize)]
struct DirectoryFile {
    bot: BotMember,
    roles: Vec<Role>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    gatekeeper_common::config::init()?;

    // Initialize tracing (structured logging). Logs go to stderr so command
    // output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper=info,gatekeeper_rules=info,gatekeeper_db=info".into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let options = ImportOptions::from(&gatekeeper_common::config::get().verification);

    match cli.command {
        Command::Check(args) => {
            let ruleset = read_ruleset(&args.file, &options)?;
            print!("{}", summarize(&ruleset));
            if let Some(path) = args.directory {
                let directory = read_directory(&path)?;
                validate_against_directory(&ruleset, &directory)?;
                println!("All roles resolve against {}", path.display());
            }
        }
        Command::Migrate(args) => {
            let options = match args.base_year {
                Some(year) => options.with_base_year(year),
                None => options,
            };
            let ruleset = read_ruleset(&args.file, &options)?;
            write_output(args.out.as_deref(), &export(&ruleset)?)?;
        }
        Command::Evaluate(args) => {
            let ruleset = read_ruleset(&args.file, &options)?;
            let output = match args.directory {
                Some(path) => {
                    let directory = read_directory(&path)?;
                    let profile = MemberProfile {
                        department: args.department,
                        account_year: args.year,
                        full_name: args.name,
                        nickname: None,
                    };
                    let plan = plan_verification(&ruleset, &profile, &directory)?;
                    serde_json::to_string_pretty(&plan)?
                }
                None => {
                    let decision = evaluate(&ruleset, &args.department, args.year);
                    serde_json::to_string_pretty(&decision)?
                }
            };
            println!("{output}");
        }
        Command::Import { guild, file } => {
            let cache = open_cache(options).await?;
            let document = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let ruleset = cache
                .import(&guild, &document)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Imported {} rules for guild {guild}", ruleset.len());
        }
        Command::Export { guild, out } => {
            let cache = open_cache(options).await?;
            let document = cache
                .export(&guild)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            write_output(out.as_deref(), &document)?;
        }
        Command::List => {
            let cache = open_cache(options).await?;
            for guild in cache.guilds().await? {
                println!("{guild}");
            }
        }
        Command::Clear { guild } => {
            let cache = open_cache(options).await?;
            if cache.clear(&guild).await? {
                println!("Cleared rule set for guild {guild}");
            } else {
                println!("Guild {guild} has no rule set");
            }
        }
    }

    Ok(())
}

async fn open_cache(options: ImportOptions) -> anyhow::Result<GuildConfigCache> {
    let db = Database::connect(gatekeeper_common::config::get()).await?;
    db.migrate().await?;
    Ok(GuildConfigCache::new(db, options))
}

fn read_ruleset(path: &Path, options: &ImportOptions) -> anyhow::Result<RuleSet> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_with(&text, options).with_context(|| format!("importing {}", path.display()))
}

fn read_directory(path: &Path) -> anyhow::Result<RoleDirectory> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: DirectoryFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing role directory {}", path.display()))?;
    Ok(RoleDirectory::new(file.roles, file.bot))
}

fn write_output(out: Option<&Path>, document: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            fs::write(path, document).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

/// Human-readable listing of a rule set, one line per rule in match order.
fn summarize(ruleset: &RuleSet) -> String {
    let mut out = format!(
        "{} rules (base year {})\n",
        ruleset.len(),
        ruleset.base_year
    );
    if let Some(plan) = ruleset.rename_plan() {
        out.push_str(&format!(
            "rename: {:?}{}\n",
            plan.kind,
            if plan.force { " (forced)" } else { "" }
        ));
    }
    for (index, rule) in ruleset.rules.iter().enumerate() {
        let year = rule.year.map(|y| format!(" {y}")).unwrap_or_default();
        out.push_str(&format!(
            "{:>3}. {} '{}', year {}{} -> {}\n",
            index + 1,
            rule.match_type,
            rule.department,
            rule.year_match,
            year,
            rule.roles.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use gatekeeper_rules::{MatchType, Rule, YearMatch};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_summarize_lists_rules_in_order() {
        let ruleset = RuleSet::new(
            2021,
            vec![
                Rule::new(vec!["SE".into()], "VPA/Software Engineering", MatchType::Exact, YearMatch::Equal, Some(2020)).unwrap(),
                Rule::new(vec!["Non-SE".into()], "", MatchType::Anything, YearMatch::All, None).unwrap(),
            ],
        );
        let text = summarize(&ruleset);
        assert_eq!(
            text,
            "2 rules (base year 2021)\n  1. exact 'VPA/Software Engineering', year equal 2020 -> SE\n  2. anything 'any', year all -> Non-SE\n"
        );
    }

    #[test]
    fn test_directory_file_shape() {
        let file: DirectoryFile = serde_json::from_str(
            r#"{
                "bot": { "highest_position": 5, "permissions": "MANAGE_ROLES" },
                "roles": [
                    { "id": "0190c3a4-5f1e-7c3a-9b1d-2e4f6a8b0c1d", "name": "SE", "position": 1 }
                ]
            }"#,
        )
        .unwrap();
        let directory = RoleDirectory::new(file.roles, file.bot);
        let role = directory.get("SE").expect("role present");
        assert!(directory.is_assignable(role));
    }
}
