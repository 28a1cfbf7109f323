//! # Sensemaker CLI (`sense`)
//!
//! The `sense` binary reads a survey base from the configured record store
//! and prints the dashboard views: the rating heatmap, comment themes,
//! priorities and stipend tallies, filtered comments, and insights with
//! their citations resolved. It can also tag comments, cite comments in
//! insights, and capture or restore view pointers.
//!
//! ## Usage
//!
//! ```bash
//! sense --config ./config/sense.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sense check` | Load every table and report counts and ingest issues |
//! | `sense heatmap` | Rating distribution per quantitative question |
//! | `sense themes` | Plus/delta counts per free-text question |
//! | `sense priorities` | Top-priority tally |
//! | `sense stipend` | Salary-range tally |
//! | `sense comments` | Filtered free-text comments |
//! | `sense tag <comment> <plus\|delta\|none>` | Set a comment's sentiment |
//! | `sense star <comment>` | Toggle a comment's star |
//! | `sense insight list\|show\|cite` | Read insights and cite comments |
//! | `sense pointer capture\|restore` | Save or apply a view pointer |
//!
//! ## Examples
//!
//! ```bash
//! # Heatmap for one department, most negative first
//! sense heatmap --department History --sort bucket1 --desc
//!
//! # Starred comments mentioning rent
//! sense comments --tag star --search rent
//!
//! # Cite a comment at the start of an insight
//! sense insight cite recInsight R-104 --at 0
//!
//! # Reopen the view a pointer was captured from
//! sense --pointer '{"type":"comments","selectedTag":"delta"}' comments
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sensemaker::annotate::TagChange;
use sensemaker::commands::{self, Session};
use sensemaker::config;
use sensemaker::insight;
use sensemaker::logging;
use sensemaker::progress::ProgressMode;
use sensemaker_core::pointer::ViewKind;

/// Sensemaker CLI: explore a labor survey's ratings, comments, and
/// insights from the terminal.
#[derive(Parser)]
#[command(
    name = "sense",
    about = "Sensemaker — explore survey ratings, tagged comments, and cited insights",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sense.toml")]
    config: PathBuf,

    /// Only rows and comments from this department (by name).
    #[arg(long, global = true)]
    department: Option<String>,

    /// Case-insensitive text filter.
    #[arg(long, global = true)]
    search: Option<String>,

    /// Start from the filters saved in a view pointer (JSON).
    #[arg(long, global = true)]
    pointer: Option<String>,

    /// Fetch progress on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every table and report record counts and ingest issues.
    Check {
        #[arg(long)]
        json: bool,
    },

    /// Rating distribution for each quantitative question.
    Heatmap {
        /// Sort key: label, bucket0..bucket3, average, total, or answered.
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending.
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        json: bool,
    },

    /// Sentiment counts per free-text question.
    Themes {
        #[arg(long)]
        json: bool,
    },

    /// How often each top priority was chosen.
    Priorities {
        #[arg(long)]
        json: bool,
    },

    /// How often each salary-increase range was chosen.
    Stipend {
        #[arg(long)]
        json: bool,
    },

    /// List free-text comments matching the filters.
    Comments {
        /// Tag key, or `untagged` for comments with no tags.
        #[arg(long)]
        tag: Option<String>,
        /// `cited`, `uncited`, or an insight id.
        #[arg(long)]
        insight: Option<String>,
        /// Question display label.
        #[arg(long)]
        issue: Option<String>,
        /// `Economic`, `Non-Economic`, or `Unknown`.
        #[arg(long)]
        economic: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Set a comment's sentiment tag. The star is kept.
    Tag {
        /// Comment record id or survey handle.
        comment: String,
        /// `plus`, `delta`, or `none`.
        sentiment: TagChange,
    },

    /// Toggle a comment's star.
    Star {
        /// Comment record id or survey handle.
        comment: String,
    },

    /// Read insights and cite comments in them.
    Insight {
        #[command(subcommand)]
        action: InsightAction,
    },

    /// Capture or restore view pointers.
    Pointer {
        #[command(subcommand)]
        action: PointerAction,
    },
}

#[derive(Subcommand)]
enum InsightAction {
    /// List every insight.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one insight with its citations resolved.
    Show {
        id: String,
        /// Show cited comments in full.
        #[arg(long)]
        expand: bool,
        #[arg(long)]
        json: bool,
    },
    /// Insert a citation of a comment into an insight and save it.
    Cite {
        insight: String,
        /// Comment record id or survey handle.
        comment: String,
        /// Character offset in the body. Defaults to the end.
        #[arg(long)]
        at: Option<usize>,
    },
}

#[derive(Subcommand)]
enum PointerAction {
    /// Print a pointer for the current filters.
    Capture {
        /// heatmap, comments, priorities, stipend, or contract.
        view: ViewKind,
        /// View-specific `key=value` pairs.
        #[arg(long = "set", value_parser = parse_key_val)]
        set: Vec<(String, String)>,
        /// Also save the pointer on this insight.
        #[arg(long)]
        attach: Option<String>,
    },
    /// Print the filter state a pointer restores.
    Restore {
        /// Pointer JSON.
        json: String,
    },
}

/// Parse a `key=value` pair for `--set` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let state = commands::initial_state(cli.pointer.as_deref(), cli.department, cli.search)?;

    // Commands that don't require config
    match &cli.command {
        Commands::Pointer {
            action: PointerAction::Restore { json },
        } => {
            return commands::run_pointer_restore(&state, json);
        }
        Commands::Pointer {
            action:
                PointerAction::Capture {
                    view,
                    set,
                    attach: None,
                },
        } => {
            let pointer = commands::capture_pointer(&state, *view, set)?;
            println!("{}", serde_json::to_string_pretty(&pointer)?);
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let reporter = progress.reporter();
    let mut session = Session::open(cfg, reporter.as_ref()).await?;

    match cli.command {
        Commands::Check { json } => commands::run_check(&session, json)?,
        Commands::Heatmap { sort, desc, json } => {
            commands::run_heatmap(&session, &state, sort.as_deref(), desc, json)?
        }
        Commands::Themes { json } => commands::run_themes(&session, &state, json)?,
        Commands::Priorities { json } => commands::run_priorities(&session, &state, json)?,
        Commands::Stipend { json } => commands::run_stipend(&session, &state, json)?,
        Commands::Comments {
            tag,
            insight,
            issue,
            economic,
            limit,
            json,
        } => {
            let state = commands::comment_filters(state, tag, insight, issue, economic)?;
            commands::run_comments(&session, &state, limit, json)?;
        }
        Commands::Tag { comment, sentiment } => {
            if !matches!(sentiment, TagChange::Sentiment(_)) {
                anyhow::bail!("expected plus, delta, or none; use `sense star` to toggle the star");
            }
            commands::run_tag(&mut session, &comment, &sentiment).await?;
        }
        Commands::Star { comment } => {
            commands::run_tag(&mut session, &comment, &TagChange::ToggleStar).await?;
        }
        Commands::Insight { action } => match action {
            InsightAction::List { json } => commands::run_insight_list(&session, json)?,
            InsightAction::Show { id, expand, json } => {
                commands::run_insight_show(&session, &id, expand, json)?
            }
            InsightAction::Cite {
                insight,
                comment,
                at,
            } => commands::run_insight_cite(&mut session, &insight, &comment, at).await?,
        },
        Commands::Pointer { action } => match action {
            PointerAction::Capture {
                view,
                set,
                attach: Some(insight_id),
            } => {
                let pointer = commands::capture_pointer(&state, view, &set)?;
                let table = session.config.tables.insights.clone();
                insight::attach_pointer(
                    session.store.as_ref(),
                    &table,
                    &mut session.snapshot,
                    &insight_id,
                    pointer.clone(),
                )
                .await?;
                println!("{}", serde_json::to_string_pretty(&pointer)?);
            }
            PointerAction::Capture { attach: None, .. } | PointerAction::Restore { .. } => {
                // Handled above (before config loading)
                unreachable!()
            }
        },
    }

    Ok(())
}
