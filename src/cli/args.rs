//! CLI argument definitions using clap

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Hierarchical bill-of-materials editor working on levelled CSV files
#[derive(Parser, Debug)]
#[command(name = "bomtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output on stderr (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Input file plus optional output location of a mutating command.
#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    /// BOM file (CSV with a level column)
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Write the result here instead of rewriting FILE
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

impl FileArgs {
    pub fn target(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.file)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print visible rows as a table
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Expand assemblies up to this level only
        #[arg(short = 'L', long)]
        level: Option<usize>,
        /// Show root rows only
        #[arg(short, long, conflicts_with = "level")]
        collapsed: bool,
        /// Only rows matching TERM, with their ancestors
        #[arg(short, long, value_name = "TERM")]
        filter: Option<String>,
        /// Treat TERM as a regular expression
        #[arg(long, requires = "filter")]
        regex: bool,
        /// Restrict the filter to these fields
        #[arg(long = "field", requires = "filter")]
        fields: Vec<String>,
        /// Print visible rows as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Print the hierarchy as a tree
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Expand assemblies up to this level only
        #[arg(short = 'L', long)]
        level: Option<usize>,
    },

    /// Append a new top-level assembly
    AddRoot {
        #[command(flatten)]
        io: FileArgs,
        /// Initial field value, repeatable
        #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },

    /// Append a new part as last child of ROW
    AddChild {
        #[command(flatten)]
        io: FileArgs,
        /// Row number as printed by `show`
        row: usize,
        /// Initial field value, repeatable
        #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },

    /// Insert a new part directly after ROW
    AddSibling {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
        /// Initial field value, repeatable
        #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },

    /// Delete ROW and everything below it
    Delete {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
    },

    /// Set one field of ROW
    Set {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
        key: String,
        value: String,
    },

    /// Move ROW under its preceding sibling
    Indent {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
    },

    /// Move ROW up one level, after its parent
    Outdent {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
    },

    /// Reorder ROW among its siblings
    MoveAfter {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
        /// Sibling row to follow; omit to move to the front
        after: Option<usize>,
    },

    /// Re-parent ROW
    MoveTo {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
        /// New parent row; omit to make ROW a root
        #[arg(short, long)]
        parent: Option<usize>,
        /// Position among the new siblings (default: last)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Copy ROW directly after itself
    Duplicate {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
        /// Copy the whole subtree
        #[arg(short, long)]
        recursive: bool,
    },

    /// Copy ROW and paste it directly after TARGET
    Paste {
        #[command(flatten)]
        io: FileArgs,
        row: usize,
        target: usize,
        /// Copy the whole subtree
        #[arg(short, long)]
        recursive: bool,
        /// Paste a subtree at TARGET's level even if it was copied from another level
        #[arg(long)]
        force_level: bool,
    },

    /// Check structural consistency
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// List the column schema
    Columns {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// The BOM file a command reads, if any.
    pub fn bom_file(&self) -> Option<&Path> {
        match self {
            Commands::Show { file, .. }
            | Commands::Tree { file, .. }
            | Commands::Validate { file }
            | Commands::Columns { file } => Some(file.as_path()),
            Commands::AddRoot { io, .. }
            | Commands::AddChild { io, .. }
            | Commands::AddSibling { io, .. }
            | Commands::Delete { io, .. }
            | Commands::Set { io, .. }
            | Commands::Indent { io, .. }
            | Commands::Outdent { io, .. }
            | Commands::MoveAfter { io, .. }
            | Commands::MoveTo { io, .. }
            | Commands::Duplicate { io, .. }
            | Commands::Paste { io, .. } => Some(io.file.as_path()),
            Commands::Config { .. } | Commands::Completion { .. } => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Directory whose .bomtree.toml is merged (default: cwd)
        #[arg(value_hint = ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },

    /// Show config paths
    Path,

    /// Print a commented config template
    Template,
}

/// Parse `KEY=VALUE`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
