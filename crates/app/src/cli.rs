use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use employee_mgmt_core::NameCollisionPolicy;

/// Employee records, salary reports and the management hierarchy.
///
/// The database is taken from `DATABASE_URL` (defaults to `sqlite://employees.db`).
/// Reports are printed to stdout as JSON; logs go to stderr.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Average salary per department name
    SalaryAverages {
        /// What to do when two departments share a name
        #[arg(long, value_enum, default_value_t = OnDuplicateName::LastWins)]
        on_duplicate_name: OnDuplicateName,
    },
    /// Management forest, each root nesting its subordinates
    Hierarchy,
    /// Load locations, titles, departments, employees and title histories from a JSON file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDuplicateName {
    /// Keep the department with the highest id
    LastWins,
    /// Fail the report
    Reject,
}

impl From<OnDuplicateName> for NameCollisionPolicy {
    fn from(value: OnDuplicateName) -> Self {
        match value {
            OnDuplicateName::LastWins => NameCollisionPolicy::LastWins,
            OnDuplicateName::Reject => NameCollisionPolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_averages_defaults_to_last_wins() {
        let cli = Cli::try_parse_from(["employee-mgmt", "salary-averages"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::SalaryAverages {
                on_duplicate_name: OnDuplicateName::LastWins
            }
        );
    }

    #[test]
    fn salary_averages_accepts_reject() {
        let cli = Cli::try_parse_from([
            "employee-mgmt",
            "salary-averages",
            "--on-duplicate-name",
            "reject",
        ])
        .expect("parse");
        let Command::SalaryAverages { on_duplicate_name } = cli.command else {
            panic!("unexpected command: {:?}", cli.command);
        };
        assert_eq!(
            NameCollisionPolicy::from(on_duplicate_name),
            NameCollisionPolicy::Reject
        );
    }

    #[test]
    fn import_requires_a_file() {
        assert!(Cli::try_parse_from(["employee-mgmt", "import"]).is_err());

        let cli = Cli::try_parse_from(["employee-mgmt", "import", "seed.json"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Import {
                file: PathBuf::from("seed.json")
            }
        );
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from([
            "employee-mgmt",
            "salary-averages",
            "--on-duplicate-name",
            "first-wins",
        ])
        .is_err());
    }
}
