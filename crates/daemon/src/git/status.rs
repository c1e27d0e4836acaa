// Working-tree status parsed from `git status --porcelain=v2 --branch`.
//
// Never cached: callers fetch a fresh status at every decision point because
// the notebook is edited concurrently by a human.

/// Snapshot of the repository state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    /// No staged, unstaged, untracked or unmerged entries.
    pub is_clean: bool,
    /// Commits on the local branch not present upstream (0 without upstream).
    pub ahead: u32,
    /// Commits upstream not present locally (0 without upstream).
    pub behind: u32,
    /// Current branch, `None` when detached.
    pub branch: Option<String>,
    /// Upstream tracking ref, e.g. `origin/master`.
    pub upstream: Option<String>,
    /// Number of changed, untracked or conflicted entries.
    pub changed_entries: usize,
}

impl RepositoryStatus {
    pub fn parse(porcelain: &str) -> Self {
        let mut status = Self::default();

        for line in porcelain.lines() {
            if let Some(header) = line.strip_prefix("# ") {
                status.parse_header(header);
                continue;
            }

            match line.chars().next() {
                // 1 = ordinary change, 2 = rename/copy, u = unmerged, ? = untracked
                Some('1' | '2' | 'u' | '?') => status.changed_entries += 1,
                // ! = ignored
                _ => {}
            }
        }

        status.is_clean = status.changed_entries == 0;
        status
    }

    fn parse_header(&mut self, header: &str) {
        let Some((name, value)) = header.split_once(' ') else {
            return;
        };

        match name {
            "branch.head" if value != "(detached)" => self.branch = Some(value.to_string()),
            "branch.upstream" => self.upstream = Some(value.to_string()),
            "branch.ab" => {
                for part in value.split_whitespace() {
                    if let Some(n) = part.strip_prefix('+') {
                        self.ahead = n.parse().unwrap_or(0);
                    } else if let Some(n) = part.strip_prefix('-') {
                        self.behind = n.parse().unwrap_or(0);
                    }
                }
            }
            _ => {}
        }
    }
}
