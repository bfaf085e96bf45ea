use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use carelog_core::models::Relationship;
use carelog_core::ConflictPolicy;

#[derive(Parser)]
#[command(name = "carelog")]
#[command(about = "Track clinic visits, documents and checkup plans from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage clinic visits
    Visit {
        #[command(subcommand)]
        command: VisitCommands,
    },
    /// Manage scanned documents
    Document {
        #[command(subcommand)]
        command: DocumentCommands,
    },
    /// Manage chronic conditions and checkup plans
    Chronic {
        #[command(subcommand)]
        command: ChronicCommands,
    },
    /// Manage family members
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Synchronize with the CareLog backend
    Sync {
        /// Conflict policy for records edited on both sides
        #[arg(long, value_enum, default_value_t = PolicyArg::Lww)]
        policy: PolicyArg,
    },
    /// Authenticate against the CareLog backend
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum VisitCommands {
    /// Record a new visit
    Add {
        /// Visit date (YYYY-MM-DD)
        date: String,
        /// Hospital or clinic name
        hospital: String,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        doctor: Option<String>,
        /// Examinations/treatments, free text
        #[arg(long)]
        items: Option<String>,
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List visits, newest first
    List {
        /// Number of visits to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a visit
    Delete {
        /// Local record id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Register a scanned document
    Add {
        /// Document title
        title: String,
        /// Document kind (e.g. lab_report, prescription, imaging)
        #[arg(long = "type", value_name = "KIND")]
        doc_type: String,
        #[arg(long, default_value = "1")]
        pages: i64,
        /// Local id of the visit this document belongs to
        #[arg(long)]
        visit: Option<i64>,
        /// Path of the scanned file on this device
        #[arg(long, value_name = "PATH")]
        path: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// List documents, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a document
    Delete {
        /// Local record id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ChronicCommands {
    /// Record a chronic condition
    Add {
        /// Condition name
        name: String,
        /// Diagnosis date (YYYY-MM-DD)
        #[arg(long)]
        diagnosed: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List conditions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a condition
    Delete {
        /// Local record id
        id: i64,
    },
    /// Manage checkup plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Attach a checkup plan to a condition
    Add {
        /// Local id of the condition
        condition: i64,
        /// Months between checkups
        #[arg(long, value_name = "MONTHS")]
        every: i64,
        /// Items to re-check, free text
        #[arg(long)]
        items: Option<String>,
        /// First checkup date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Reminder lead time in days
        #[arg(long, value_name = "DAYS")]
        remind_before: Option<i64>,
    },
    /// List checkup plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a checkup plan
    Delete {
        /// Local record id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add a family member
    Add {
        /// Member name
        name: String,
        #[arg(long, value_enum)]
        relationship: RelationshipArg,
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth: Option<String>,
        /// Medical card number
        #[arg(long)]
        card: Option<String>,
        /// Make this the default member for new records
        #[arg(long)]
        default: bool,
    },
    /// List family members
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a family member
    Delete {
        /// Local record id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with email/password and store the session in the keychain
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show the signed-in session
    Status,
    /// Logout and clear the stored session
    Logout,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PolicyArg {
    /// Last write wins (default)
    Lww,
    /// The server copy always wins
    ServerWins,
    /// The local copy always wins
    ClientWins,
}

impl From<PolicyArg> for ConflictPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Lww => Self::LastWriteWins,
            PolicyArg::ServerWins => Self::ServerWins,
            PolicyArg::ClientWins => Self::ClientWins,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RelationshipArg {
    Myself,
    Spouse,
    Child,
    Parent,
    Other,
}

impl From<RelationshipArg> for Relationship {
    fn from(value: RelationshipArg) -> Self {
        match value {
            RelationshipArg::Myself => Self::Myself,
            RelationshipArg::Spouse => Self::Spouse,
            RelationshipArg::Child => Self::Child,
            RelationshipArg::Parent => Self::Parent,
            RelationshipArg::Other => Self::Other,
        }
    }
}
