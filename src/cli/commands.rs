//! Command dispatch

use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{EditCommand, EditOutcome, ExportScope};
use crate::cli::args::{Cli, Commands, ConfigCommands, FileArgs};
use crate::cli::render;
use crate::cli::{output, CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{
    project_filtered, BomDocument, FieldFilter, FieldValue, NodeFilter, NodeId, Payload,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `bomtree --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(command),
        other => {
            let dir = other
                .bom_file()
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty());
            let settings = Settings::load(dir)?;
            let container = ServiceContainer::new(settings);
            run(&container, other)
        }
    }
}

fn run(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Show {
            file,
            level,
            collapsed,
            filter,
            regex,
            fields,
            csv,
        } => cmd_show(
            container,
            file,
            ShowOptions {
                level: *level,
                collapsed: *collapsed,
                filter: filter.as_deref(),
                regex: *regex,
                fields,
                csv: *csv,
            },
        ),
        Commands::Tree { file, level } => cmd_tree(container, file, *level),
        Commands::Validate { file } => cmd_validate(container, file),
        Commands::Columns { file } => cmd_columns(container, file),
        Commands::AddRoot { io, fields } => edit(container, io, |_| {
            Ok(EditCommand::AddRoot {
                payload: payload_from(fields),
            })
        }),
        Commands::AddChild { io, row, fields } => edit(container, io, |doc| {
            Ok(EditCommand::AddChild {
                parent: resolve_row(doc, *row)?,
                payload: payload_from(fields),
            })
        }),
        Commands::AddSibling { io, row, fields } => edit(container, io, |doc| {
            Ok(EditCommand::AddSibling {
                target: resolve_row(doc, *row)?,
                payload: payload_from(fields),
            })
        }),
        Commands::Delete { io, row } => {
            edit(container, io, |doc| Ok(EditCommand::Delete(resolve_row(doc, *row)?)))
        }
        Commands::Set {
            io,
            row,
            key,
            value,
        } => edit(container, io, |doc| {
            Ok(EditCommand::SetField {
                id: resolve_row(doc, *row)?,
                key: key.clone(),
                value: FieldValue::parse(value),
            })
        }),
        Commands::Indent { io, row } => {
            edit(container, io, |doc| Ok(EditCommand::Indent(resolve_row(doc, *row)?)))
        }
        Commands::Outdent { io, row } => {
            edit(container, io, |doc| Ok(EditCommand::Outdent(resolve_row(doc, *row)?)))
        }
        Commands::MoveAfter { io, row, after } => edit(container, io, |doc| {
            Ok(EditCommand::MoveAfter {
                id: resolve_row(doc, *row)?,
                after: after.map(|a| resolve_row(doc, a)).transpose()?,
            })
        }),
        Commands::MoveTo {
            io,
            row,
            parent,
            index,
        } => edit(container, io, |doc| {
            Ok(EditCommand::MoveTo {
                id: resolve_row(doc, *row)?,
                parent: parent.map(|p| resolve_row(doc, p)).transpose()?,
                index: index.unwrap_or(usize::MAX),
            })
        }),
        Commands::Duplicate { io, row, recursive } => edit(container, io, |doc| {
            Ok(EditCommand::Duplicate {
                id: resolve_row(doc, *row)?,
                include_children: *recursive,
            })
        }),
        Commands::Paste {
            io,
            row,
            target,
            recursive,
            force_level,
        } => edit(container, io, |doc| {
            let clipboard = doc.copy(resolve_row(doc, *row)?, *recursive)?;
            Ok(EditCommand::Paste {
                target: resolve_row(doc, *target)?,
                clipboard,
                force_level: *force_level,
            })
        }),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn payload_from(fields: &[(String, String)]) -> Option<Payload> {
    if fields.is_empty() {
        return None;
    }
    Some(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::parse(v)))
            .collect(),
    )
}

fn resolve_row(doc: &BomDocument, row: usize) -> CliResult<NodeId> {
    render::node_at_row(doc.tree(), row).ok_or_else(|| {
        CliError::InvalidArgs(format!(
            "row {} out of range (1..={})",
            row,
            doc.tree().len()
        ))
    })
}

/// Load, apply one command, write back.
#[instrument(level = "debug", skip(container, build))]
fn edit<F>(container: &ServiceContainer, io: &FileArgs, build: F) -> CliResult<()>
where
    F: FnOnce(&BomDocument) -> CliResult<EditCommand>,
{
    let mut doc = container.exchange.import_csv(&io.file)?;
    let command = build(&doc)?;
    debug!("command: {:?}", command);

    let outcome = command.apply(&mut doc)?;
    let target = io.target();
    match &outcome {
        EditOutcome::Unchanged => output::info(&"nothing to change"),
        EditOutcome::Created(id) => {
            let row = render::row_numbers(doc.tree()).get(id).copied();
            let label = doc.get(*id).map(|n| n.to_string()).unwrap_or_default();
            output::action("created", &format!("row {} {}", row.unwrap_or(0), label));
        }
        EditOutcome::Removed(ids) => output::action("deleted", &format!("{} row(s)", ids.len())),
        EditOutcome::Updated => {}
    }
    if outcome != EditOutcome::Unchanged || io.output.is_some() {
        let rows = container.exchange.export_csv(&doc, ExportScope::Full, target)?;
        output::success(&format!("wrote {} rows to {}", rows, target.display()));
    }
    Ok(())
}

struct ShowOptions<'a> {
    level: Option<usize>,
    collapsed: bool,
    filter: Option<&'a str>,
    regex: bool,
    fields: &'a [String],
    csv: bool,
}

#[instrument(level = "debug", skip(container, opts))]
fn cmd_show(container: &ServiceContainer, file: &Path, opts: ShowOptions<'_>) -> CliResult<()> {
    let mut doc = container.exchange.import_csv(file)?;
    if opts.collapsed {
        doc.collapse_all();
    } else if let Some(level) = opts.level {
        doc.expand_to_level(level);
    }

    if let Some(term) = opts.filter {
        let mut filter = if opts.regex {
            FieldFilter::regex(term)
                .map_err(|e| CliError::InvalidArgs(format!("bad pattern '{}': {}", term, e)))?
        } else {
            FieldFilter::contains(term)
        };
        if !opts.fields.is_empty() {
            filter = filter.in_fields(opts.fields.iter().cloned());
        }
        return show_filtered(container, &doc, &filter);
    }

    if opts.csv {
        let content = container.exchange.to_csv_string(&doc, ExportScope::Visible)?;
        return emit(&mut io::stdout().lock(), &content);
    }

    let columns = render::display_columns(&doc, &container.settings.hidden_columns);
    let lines = render::table(doc.tree(), doc.visible(), doc.expansion(), &columns);
    print_table(&lines);
    Ok(())
}

/// Write raw output; a closed pipe surfaces as an I/O error.
fn emit(out: &mut impl Write, content: &str) -> CliResult<()> {
    out.write_all(content.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| InfraError::io("write to stdout", e))?;
    Ok(())
}

fn show_filtered<F: NodeFilter>(
    container: &ServiceContainer,
    doc: &BomDocument,
    filter: &F,
) -> CliResult<()> {
    let view = project_filtered(doc.tree(), filter);
    if view.is_empty() {
        output::warning(&"no matching rows");
        return Ok(());
    }
    let expansion = view.forced_expanded();
    let columns = render::display_columns(doc, &container.settings.hidden_columns);
    let lines = render::table(doc.tree(), view.iter(), &expansion, &columns);
    print_table(&lines);
    Ok(())
}

fn print_table(lines: &[String]) {
    if let Some((head, body)) = lines.split_first() {
        output::header(head);
        for line in body {
            output::info(line);
        }
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_tree(container: &ServiceContainer, file: &Path, level: Option<usize>) -> CliResult<()> {
    let mut doc = container.exchange.import_csv(file)?;
    match level {
        Some(l) => doc.expand_to_level(l),
        None => doc.expand_all(),
    }
    for tree in render::to_termtrees(doc.tree(), doc.expansion()) {
        output::info(&tree);
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_validate(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let doc = container.exchange.import_csv(file)?;
    let tree = doc.tree();
    let problems = tree.validate();

    let mut missing = 0;
    for node in tree.iter() {
        for column in doc.columns.iter().filter(|c| c.required) {
            if !node.payload.contains_key(&column.key) {
                missing += 1;
                output::warning(&format!("{}: missing required field {}", node, column.key));
            }
        }
    }

    if !problems.is_empty() {
        for p in &problems {
            output::failure(p);
        }
        return Err(CliError::Inconsistent(problems.len()));
    }
    output::success(&format!(
        "{} nodes, {} roots, depth {}, {} leaves",
        tree.len(),
        tree.root_ids().len(),
        tree.depth(),
        tree.leaf_nodes().len()
    ));
    if missing > 0 {
        output::detail(&format!("{} missing required field(s)", missing));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_columns(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let doc = container.exchange.import_csv(file)?;
    let hidden = &container.settings.hidden_columns;
    for column in doc.columns.iter() {
        let mut flags = Vec::new();
        if column.required {
            flags.push("required");
        }
        if !column.editable {
            flags.push("read-only");
        }
        if hidden.contains(&column.key) {
            flags.push("hidden");
        }
        output::info(&format!(
            "{:<20} {:<20} {}",
            column.key,
            column.label,
            flags.join(",")
        ));
    }
    Ok(())
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { dir } => {
            let settings = Settings::load(dir.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::action("global", &p.display()),
                None => output::warning(&"no config directory on this platform"),
            }
            output::action("local", &local_config_path(Path::new(".")).display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exitcode;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn given_closed_pipe_when_emitting_then_io_exit_code() {
        let err = emit(&mut ClosedPipe, "level,path\n").unwrap_err();

        assert!(matches!(err, CliError::Infra(InfraError::Io { .. })));
        assert_eq!(err.exit_code(), exitcode::IOERR);
    }

    #[test]
    fn given_writer_when_emitting_then_content_written() {
        let mut out = Vec::new();

        emit(&mut out, "level,path\n").unwrap();

        assert_eq!(out, b"level,path\n");
    }
}
