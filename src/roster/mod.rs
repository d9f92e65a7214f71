//! Repository lookup over the course roster.
//!
//! The roster is a tab-separated sheet with one row per student and a header
//! row naming the columns. `Legajo`, `Grupo` and `Github` are fixed; the
//! repository lives in `Repo` for individual work and `Repo2` for group work,
//! though any column may be asked for.

mod error;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::config::{Config, Reviewees};
use crate::remote::RepositoryIdentity;
use crate::sync::ContributorSet;

pub use error::{RosterError, RosterResult};

pub const LEGAJO_COLUMN: &str = "Legajo";
pub const GROUP_COLUMN: &str = "Grupo";
pub const GITHUB_COLUMN: &str = "Github";
/// repository column for individual entregas
pub const DEFAULT_REPO_COLUMN: &str = "Repo";
/// repository column for group entregas
pub const GROUP_REPO_COLUMN: &str = "Repo2";

/// The parsed roster plus the settings that steer lookups.
#[derive(Debug, Clone)]
pub struct Roster {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    group_entregas: BTreeSet<String>,
    default_user: Option<String>,
}

impl Roster {
    /// Parse a roster from its text.
    pub fn parse(text: &str) -> RosterResult<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header: Vec<String> = lines
            .next()
            .ok_or(RosterError::Empty)?
            .split('\t')
            .map(|cell| cell.trim().to_string())
            .collect();

        let rows = lines
            .map(|line| line.split('\t').map(|cell| cell.trim().to_string()).collect())
            .collect();

        Ok(Self {
            header,
            rows,
            group_entregas: BTreeSet::new(),
            default_user: None,
        })
    }

    /// Read and parse a roster file.
    pub fn load(path: impl AsRef<Path>) -> RosterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let roster = Self::parse(&text)?;
        debug!(path = %path.display(), rows = roster.rows.len(), "loaded roster");
        Ok(roster)
    }

    /// Load the configured roster with the configured lookup settings.
    pub fn from_config(config: &Config) -> RosterResult<Self> {
        let mut roster = Self::load(&config.roster)?.group_entregas(config.group_entregas.iter().cloned());
        roster.default_user = config.github.default_user.clone();
        Ok(roster)
    }

    /// Entregas whose repository is the group one.
    pub fn group_entregas<I, S>(mut self, entregas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_entregas = entregas.into_iter().map(Into::into).collect();
        self
    }

    /// Author to fall back on when no row has a GitHub username.
    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = Some(user.into());
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Repository of a student, or of a group written as `legajo_legajo`.
    ///
    /// The column is `force_column` if given, else the individual one. It is
    /// switched to the group column when `entrega` is a group entrega or the
    /// key names more than one student.
    pub fn from_legajo(&self, key: &str, entrega: Option<&str>, force_column: Option<&str>) -> RosterResult<StudentRepo> {
        if entrega.is_some() && force_column.is_some() {
            return Err(RosterError::IncompatibleOptions);
        }

        let mut column = force_column.unwrap_or(DEFAULT_REPO_COLUMN);
        let group_entrega = entrega.is_some_and(|id| self.group_entregas.contains(id));
        if group_entrega || key.contains('_') {
            column = GROUP_REPO_COLUMN;
        }

        let legajos: Vec<&str> = key.split('_').collect();
        self.from_legajos(&legajos, column)
    }

    /// Repository of a group, by group id.
    pub fn from_grupo(&self, group: &str) -> RosterResult<StudentRepo> {
        let group_idx = self.column(GROUP_COLUMN)?;
        let legajo_idx = self.column(LEGAJO_COLUMN)?;

        let legajos: Vec<&str> = self
            .rows
            .iter()
            .filter(|row| cell(row, group_idx) == group)
            .map(|row| cell(row, legajo_idx))
            .collect();

        if legajos.is_empty() {
            return Err(RosterError::GroupNotFound(group.to_string()));
        }
        self.from_legajos(&legajos, GROUP_REPO_COLUMN)
    }

    /// Repository shared by `legajos` in `column`.
    ///
    /// All rows found must agree on a single non-empty repository.
    pub fn from_legajos(&self, legajos: &[&str], column: &str) -> RosterResult<StudentRepo> {
        let legajo_idx = self.column(LEGAJO_COLUMN)?;
        let repo_idx = self.column(column)?;
        let github_idx = self.column(GITHUB_COLUMN)?;

        let rows: Vec<&Vec<String>> = self
            .rows
            .iter()
            .filter(|row| legajos.contains(&cell(row, legajo_idx)))
            .collect();
        if rows.is_empty() {
            return Err(RosterError::LegajoNotFound(
                legajos.iter().map(|s| s.to_string()).collect(),
            ));
        }

        let mut repositories = BTreeSet::new();
        let mut github_users = Vec::new();
        for row in &rows {
            let repo = cell(row, repo_idx);
            if !repo.is_empty() {
                repositories.insert(repo);
            }
            let user = cell(row, github_idx);
            if !user.is_empty() {
                github_users.push(user.to_string());
            }
        }

        let full_name = match repositories.len() {
            0 => {
                return Err(RosterError::NoRepository {
                    column: column.to_string(),
                    legajos: legajos.iter().map(|s| s.to_string()).collect(),
                })
            }
            1 => repositories.into_iter().next().unwrap_or_default(),
            _ => {
                return Err(RosterError::AmbiguousRepository(
                    repositories.into_iter().map(String::from).collect(),
                ))
            }
        };

        if github_users.is_empty() {
            github_users.extend(self.default_user.clone());
        }

        Ok(StudentRepo {
            identity: RepositoryIdentity::new(full_name)?,
            legajos: rows.iter().map(|row| cell(row, legajo_idx).to_string()).collect(),
            github_users,
        })
    }

    fn column(&self, name: &str) -> RosterResult<usize> {
        self.header
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| RosterError::MissingColumn(name.to_string()))
    }
}

/// short rows read as blank cells
fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// A student or group repository found in the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRepo {
    pub identity: RepositoryIdentity,
    pub legajos: BTreeSet<String>,
    /// GitHub usernames of the members, or the fallback author
    pub github_users: Vec<String>,
}

impl StudentRepo {
    /// web address of the repository
    pub fn url(&self, web_url: &str) -> String {
        format!("{}/{}", web_url.trim_end_matches('/'), self.identity)
    }

    /// whether any member is in the reviewee list for this kind of repository
    pub fn has_reviewer(&self, reviewees: &Reviewees) -> bool {
        let list = if self.legajos.len() > 1 {
            &reviewees.group
        } else {
            &reviewees.individual
        };
        !self.legajos.is_disjoint(list)
    }

    /// who replayed commits may be attributed to
    pub fn contributors(&self) -> crate::Result<ContributorSet> {
        ContributorSet::new(self.github_users.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    const ROSTER: &str = "\
Legajo\tNombre\tGrupo\tGithub\tRepo\tRepo2
54321\tAna\tG1\tana-gh\talgoritmos-rw/algo2_54321\talgoritmos-rw/algo2_g1
54322\tBruno\tG1\t\talgoritmos-rw/algo2_54322\talgoritmos-rw/algo2_g1
11111\tCarla\tG2\tcarla\t\talgoritmos-rw/algo2_g2
22222\tDario\tG2\tdario\talgoritmos-rw/algo2_22222\talgoritmos-rw/algo2_g2x
33333\tEva\t\t
";

    fn roster() -> Roster {
        Roster::parse(ROSTER)
            .unwrap()
            .group_entregas(["abb", "tp2"])
            .default_user("docente")
    }

    #[test]
    fn test_individual_lookup() {
        let repo = roster().from_legajo("54321", None, None).unwrap();
        assert_eq!(repo.identity.full_name(), "algoritmos-rw/algo2_54321");
        assert_eq!(repo.github_users, vec!["ana-gh"]);
        assert_eq!(repo.url("https://github.com/"), "https://github.com/algoritmos-rw/algo2_54321");
    }

    #[test]
    fn test_group_entrega_switches_column() {
        let repo = roster().from_legajo("54321", Some("tp2"), None).unwrap();
        assert_eq!(repo.identity.full_name(), "algoritmos-rw/algo2_g1");

        let repo = roster().from_legajo("54321", Some("tp1"), None).unwrap();
        assert_eq!(repo.identity.full_name(), "algoritmos-rw/algo2_54321");
    }

    #[test]
    fn test_joined_key_is_a_group() {
        let repo = roster().from_legajo("54321_54322", None, None).unwrap();
        assert_eq!(repo.identity.full_name(), "algoritmos-rw/algo2_g1");
        assert_eq!(repo.legajos.len(), 2);
        assert_eq!(repo.github_users, vec!["ana-gh"]);
    }

    #[test]
    fn test_forced_column() {
        let repo = roster().from_legajo("54322", None, Some("Repo2")).unwrap();
        assert_eq!(repo.identity.full_name(), "algoritmos-rw/algo2_g1");

        let err = roster().from_legajo("54322", Some("tp2"), Some("Repo")).unwrap_err();
        assert!(matches!(err, RosterError::IncompatibleOptions));

        let err = roster().from_legajo("54322", None, Some("Repo3")).unwrap_err();
        assert!(matches!(err, RosterError::MissingColumn(ref c) if c == "Repo3"));
    }

    #[test]
    fn test_lookup_failures() {
        let err = roster().from_legajo("99999", None, None).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "legajo(s) 99999 not found in roster");

        let err = roster().from_legajo("11111", None, None).unwrap_err();
        assert!(matches!(err, RosterError::NoRepository { ref column, .. } if column == "Repo"));

        let err = roster().from_grupo("G2").unwrap_err();
        assert!(matches!(err, RosterError::AmbiguousRepository(ref repos) if repos.len() == 2));

        let err = roster().from_grupo("G9").unwrap_err();
        assert!(matches!(err, RosterError::GroupNotFound(_)));
    }

    #[test]
    fn test_group_lookup() {
        let repo = roster().from_grupo("G1").unwrap();
        assert_eq!(repo.identity.full_name(), "algoritmos-rw/algo2_g1");
        let legajos: Vec<_> = repo.legajos.iter().map(String::as_str).collect();
        assert_eq!(legajos, vec!["54321", "54322"]);
    }

    #[test]
    fn test_default_user_fallback() {
        let repo = roster().from_legajo("54322", None, None).unwrap();
        assert_eq!(repo.github_users, vec!["docente"]);
        assert_eq!(repo.contributors().unwrap().len(), 1);

        let bare = Roster::parse(ROSTER).unwrap();
        let repo = bare.from_legajo("54322", None, None).unwrap();
        assert!(repo.github_users.is_empty());
        assert!(matches!(repo.contributors(), Err(Error::NoContributors)));
    }

    #[test]
    fn test_reviewer_lists() {
        let reviewees = Reviewees {
            individual: ["54321".to_string()].into_iter().collect(),
            group: ["54322".to_string()].into_iter().collect(),
        };

        assert!(roster().from_legajo("54321", None, None).unwrap().has_reviewer(&reviewees));
        assert!(!roster().from_legajo("54322", None, None).unwrap().has_reviewer(&reviewees));
        assert!(roster().from_grupo("G1").unwrap().has_reviewer(&reviewees));
    }

    #[test]
    fn test_load_from_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repos.tsv");
        std::fs::write(&path, ROSTER).unwrap();

        let config = Config::default().roster(&path).default_user("docente");
        let roster = Roster::from_config(&config).unwrap();
        assert_eq!(roster.len(), 5);
        assert_eq!(
            roster.from_legajo("54321", Some("abb"), None).unwrap().identity.full_name(),
            "algoritmos-rw/algo2_g1"
        );

        let missing = Config::default().roster(dir.path().join("nope.tsv"));
        assert!(matches!(Roster::from_config(&missing), Err(RosterError::Io { .. })));
    }

    #[test]
    fn test_invalid_repository_name() {
        let roster = Roster::parse("Legajo\tGithub\tRepo\n1\tx\tsin-owner\n").unwrap();
        let err = roster.from_legajo("1", None, None).unwrap_err();
        assert!(matches!(err, RosterError::InvalidRepository(_)));
    }
}
