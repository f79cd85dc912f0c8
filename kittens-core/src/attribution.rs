//! Attribution of revisions to roster contributors
//!
//! A contributor is credited with a revision when any of these holds:
//!
//! 1. the revision author is the contributor's email,
//! 2. the comment carries a `Patch by NAME <email> on` marker for them,
//! 3. the comment carries a ChangeLog style `YYYY-MM-DD  NAME  <email>` line for them.
//!
//! Every marker in the comment is considered, not just the first one. The
//! matching is heuristic and will miss contributors who commit under other
//! handles.

use regex::Regex;

use crate::error::ConfigError;
use crate::types::Revision;

const PATCH_BY_PATTERN: &str = r"Patch by [^\n<]*<([^>\n]+)> on";
const CHANGELOG_PATTERN: &str = r"(?m)^\d{4}-\d{2}-\d{2}  [^\n]*?  <([^>\n]+)>";

/// Matches revisions against contributor emails
#[derive(Debug, Clone)]
pub struct Attributor {
    patch_by: Regex,
    changelog: Regex,
}

impl Attributor {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            patch_by: compile(PATCH_BY_PATTERN)?,
            changelog: compile(CHANGELOG_PATTERN)?,
        })
    }

    /// Emails from `roster` credited with `revision`, in roster order
    pub fn attribute<'a, I>(&self, revision: &Revision, roster: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let marked = self.marked_emails(&revision.comment);
        let mut credited: Vec<String> = Vec::new();
        for email in roster {
            if credited.iter().any(|c| c == email) {
                continue;
            }
            if revision.author == email || marked.iter().any(|m| *m == email) {
                credited.push(email.to_string());
            }
        }
        credited
    }

    /// Whether a single contributor is credited with `revision`
    pub fn is_credited(&self, revision: &Revision, email: &str) -> bool {
        revision.author == email
            || self
                .marked_emails(&revision.comment)
                .iter()
                .any(|m| *m == email)
    }

    /// All emails named by patch or changelog markers in a comment
    fn marked_emails<'c>(&self, comment: &'c str) -> Vec<&'c str> {
        self.patch_by
            .captures_iter(comment)
            .chain(self.changelog.captures_iter(comment))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
