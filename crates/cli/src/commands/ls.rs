//! ls command - List one folder level
//!
//! Shows the sub-folders and objects directly below a folder, or below the
//! container root when no folder is given.

use clap::Args;
use largo_core::{Error, ObjectStore as _, StorageFolder};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List a container or folder
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (profile/container[/folder])
    pub path: String,

    /// Summarize output (show totals only)
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    #[serde(flatten)]
    folder: StorageFolder,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_folders: usize,
    total_objects: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (path, store) = match super::open_remote(&args.path, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let folder_key = path.folder_key();
    let folder = match store.get_folder(&path.container, folder_key).await {
        Ok(folder) => folder,
        // A container without any object lists as an empty root
        Err(Error::NotFound(_)) if folder_key.is_empty() => StorageFolder::default(),
        Err(e) => {
            formatter.error(&format!("Failed to list '{}': {e}", args.path));
            return ExitCode::from_error(&e);
        }
    };

    let total_size: u64 = folder.objects.iter().map(|o| o.size_bytes).sum();
    let summary = args.summarize.then(|| Summary {
        total_folders: folder.folders.len(),
        total_objects: folder.objects.len(),
        total_size_bytes: total_size,
        total_size_human: humansize::format_size(total_size, humansize::BINARY),
    });

    if formatter.is_json() {
        formatter.json(&LsOutput { folder, summary });
        return ExitCode::Success;
    }

    if !args.summarize {
        let mut table = formatter.table(["Modified", "Size", "Name"]);
        for sub in &folder.folders {
            table.add_row(["".to_string(), "DIR".to_string(), format!("{}/", sub.name)]);
        }
        for object in &folder.objects {
            let date = object
                .last_modified
                .map(|ts| ts.strftime("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            table.add_row([date, object.size_human(), object.name.clone()]);
        }
        formatter.print_table(&table);
    }

    if let Some(summary) = summary {
        formatter.println(&format!(
            "Total: {} folders, {} objects, {}",
            summary.total_folders, summary.total_objects, summary.total_size_human
        ));
    }

    ExitCode::Success
}
