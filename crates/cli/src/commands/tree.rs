//! tree command - Show the folder tree of a container
//!
//! Lists every key below a prefix and projects the flat listing into folders.
//! Keys without a folder prefix and keys containing an empty path segment
//! have no place in the tree and are left out.

use clap::Args;
use largo_core::{folder, ObjectStore as _, StorageFolder, StorageObject};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display objects in tree format
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Remote path (profile/container[/prefix])
    pub path: String,

    /// Show folders only
    #[arg(short = 'd', long)]
    pub dirs_only: bool,
}

/// Execute the tree command
pub async fn execute(args: TreeArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (path, store) = match super::open_remote(&args.path, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let objects = match store.list_objects(&path.container, &path.key).await {
        Ok(objects) => objects,
        Err(e) => {
            formatter.error(&format!("Failed to list '{}': {e}", args.path));
            return ExitCode::from_error(&e);
        }
    };

    let roots = folder::project(objects);

    if formatter.is_json() {
        formatter.json(&roots);
        return ExitCode::Success;
    }

    formatter.println(&format!("{}/{}", path.profile, path.container));
    let mut lines = Vec::new();
    render_level(&roots, &[], "", args.dirs_only, &mut lines);
    for line in &lines {
        formatter.println(line);
    }

    let objects: usize = roots.iter().map(StorageFolder::object_count).sum();
    let size: u64 = roots.iter().map(StorageFolder::total_size).sum();
    formatter.println(&format!(
        "\n{} objects, {}",
        objects,
        humansize::format_size(size, humansize::BINARY)
    ));

    ExitCode::Success
}

/// Render folders, then objects, of one level with box-drawing prefixes
fn render_level(
    folders: &[StorageFolder],
    objects: &[StorageObject],
    indent: &str,
    dirs_only: bool,
    lines: &mut Vec<String>,
) {
    let shown_objects = if dirs_only { 0 } else { objects.len() };
    let total = folders.len() + shown_objects;

    for (idx, sub) in folders.iter().enumerate() {
        let last = idx + 1 == total;
        let (branch, next) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        lines.push(format!("{indent}{branch}{}/", sub.name));
        render_level(
            &sub.folders,
            &sub.objects,
            &format!("{indent}{next}"),
            dirs_only,
            lines,
        );
    }

    for (idx, object) in objects.iter().take(shown_objects).enumerate() {
        let last = folders.len() + idx + 1 == total;
        let branch = if last { "└── " } else { "├── " };
        lines.push(format!(
            "{indent}{branch}{} ({})",
            object.name,
            object.size_human()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(keys: &[&str], dirs_only: bool) -> Vec<String> {
        let objects = keys
            .iter()
            .map(|k| StorageObject::new("c", *k, 1024))
            .collect();
        let roots = folder::project(objects);
        let mut lines = Vec::new();
        render_level(&roots, &[], "", dirs_only, &mut lines);
        lines
    }

    #[test]
    fn test_render_nested_tree() {
        let lines = render(&["a/", "a/b/c/d/foo", "a/b/c/d/bar", "a/x"], false);
        assert_eq!(
            lines,
            vec![
                "└── a/",
                "    ├── b/",
                "    │   └── c/",
                "    │       └── d/",
                "    │           ├── foo (1 KiB)",
                "    │           └── bar (1 KiB)",
                "    └── x (1 KiB)",
            ]
        );
    }

    #[test]
    fn test_render_dirs_only() {
        let lines = render(&["a/b/foo", "a/bar", "z/q"], true);
        assert_eq!(lines, vec!["├── a/", "│   └── b/", "└── z/"]);
    }

    #[test]
    fn test_render_skips_unplaceable_keys() {
        assert!(render(&["top", "a//b"], false).is_empty());
    }
}
