//! Kittens log command: print revisions straight from the repository

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use kittens_core::source::{REV_FIRST, REV_HEAD};
use kittens_core::{LogLimit, Revision, RevisionRef, RevisionSource, SvnClient};

use crate::config::{ConfigLoader, RawKittensConfig};

/// Arguments for the log command
#[derive(Debug, Args)]
pub struct LogArgs {
    /// First revision of the range (-1 for HEAD, 0 for the first revision)
    #[arg(short, long, default_value_t = REV_HEAD, allow_negative_numbers = true)]
    pub start: i64,

    /// Last revision of the range (-1 for HEAD, 0 for the first revision)
    #[arg(short, long, default_value_t = REV_FIRST, allow_negative_numbers = true)]
    pub end: i64,

    /// Maximum number of revisions, zero or negative for no limit
    #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
    pub limit: i64,

    /// Repository to query (defaults to the configured log source)
    #[arg(long, value_name = "URL")]
    pub source: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: LogArgs) -> Result<()> {
    let mut raw = RawKittensConfig::default();
    raw.log_source.url = args.source.clone();
    let config = ConfigLoader::load_with(raw)?;

    let client = SvnClient::with_timeout(&config.log_source.url, config.log_source.timeout())?;
    let revisions = client
        .log(
            RevisionRef::from_raw(args.start),
            RevisionRef::from_raw(args.end),
            LogLimit::from_raw(args.limit),
        )
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&revisions)?);
    } else {
        println!("{}", render_table(&revisions));
    }
    Ok(())
}

fn render_table(revisions: &[Revision]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Revision").fg(Color::Cyan),
        Cell::new("Author").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Summary").fg(Color::Cyan),
    ]);

    for revision in revisions {
        table.add_row(vec![
            Cell::new(format!("r{}", revision.id)),
            Cell::new(&revision.author),
            Cell::new(&revision.date),
            Cell::new(summary(&revision.comment)),
        ]);
    }
    table
}

/// First non-blank line of a commit message
fn summary(comment: &str) -> &str {
    comment
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_skips_blank_lines() {
        assert_eq!(summary("\n\n  Fix the build.  \nMore detail"), "Fix the build.");
        assert_eq!(summary(""), "");
    }

    #[test]
    fn test_render_table_lists_revisions() {
        let revisions = vec![
            Revision::new(101, "pdr@google.com", "Second\nbody", "2011-11-03"),
            Revision::new(100, "knorton@google.com", "First", "2011-11-02"),
        ];

        let rendered = render_table(&revisions).to_string();
        assert!(rendered.contains("r101"));
        assert!(rendered.contains("pdr@google.com"));
        assert!(rendered.contains("Second"));
        assert!(!rendered.contains("body"));
        assert!(rendered.contains("r100"));
    }
}
