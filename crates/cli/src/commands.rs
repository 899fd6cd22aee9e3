use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a customer file and create a new import batch
    Upload {
        /// Path to the .csv/.tsv/.xlsx/.xls file
        file: String,

        #[arg(long, default_value = "cli", help = "Uploader identity recorded on the batch")]
        uploader: String,
    },
    /// List batches for the tenant
    List {
        #[arg(long, help = "Filter by status (uploaded, mapped, validated, ...)")]
        status: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 20)]
        per_page: usize,
    },
    /// Show one batch and a page of its staged preview rows
    Show {
        batch: String,

        #[arg(long, help = "Only show rows blocked by errors")]
        errors_only: bool,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 20)]
        per_page: usize,
    },
    /// Suggest a column mapping from the extracted headers and sample values
    Suggest { batch: String },
    /// Apply a mapping config (JSON file) to the batch
    Map {
        batch: String,

        #[arg(long, help = "Path to a MappingConfig JSON file")]
        config: String,

        #[arg(long, help = "Also save the config as a named tenant template")]
        save_template: Option<String>,
    },
    /// Validate the staged rows
    Validate { batch: String },
    /// Commit the batch (or simulate with --dry-run)
    Commit {
        batch: String,

        #[arg(long, help = "Row numbers to exclude", value_delimiter = ',')]
        exclude: Vec<u32>,

        #[arg(
            long,
            help = "Path to a JSON file of row edits: {\"1\": {\"last_name\": \"Meier\"}}"
        )]
        edits: Option<String>,

        #[arg(long, help = "Compute outcomes without writing anything")]
        dry_run: bool,
    },
    /// Undo a committed batch using its reversal log
    Rollback {
        batch: String,

        #[arg(long, help = "Reason recorded with the rollback")]
        reason: String,
    },
    /// Cancel a batch that has not been committed
    Cancel { batch: String },
    /// Manage saved mapping templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Export all row-level issues as CSV
    ErrorReport {
        batch: String,

        #[arg(long, help = "Write the report to this file instead of stdout")]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    List,
    Show { id: String },
    Delete { id: String },
}
