//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use generational_arena::Index;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{DomainError, Tree, Value};
use crate::infrastructure::DotRenderer;
use crate::text::{SortOrder, Text};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load()?.with_log_dir(cli.log_dir.as_deref());

    match &cli.command {
        Some(Commands::Demo { out }) => _demo(&settings, out),
        Some(Commands::Verify { file, repair }) => _verify(&settings, file, *repair),
        Some(Commands::Show { file }) => _show(&settings, file),
        Some(Commands::Render { file }) => _render(&settings, file),
        Some(Commands::Copy { file, out }) => _copy(&settings, file, out),
        Some(Commands::Sort {
            file,
            reverse,
            terminator,
            raw,
        }) => _sort(&settings, file, *reverse, *terminator, *raw),
        Some(Commands::Config) => _config(&settings),
        Some(Commands::Completion { shell }) => _completion(*shell),
        None => Ok(()),
    }
}

/// Mirrors the engine's end-to-end flow: build, dump, print, destroy, read
/// back, dump again, print again.
#[instrument(skip(settings))]
fn _demo(settings: &Settings, out: &Path) -> CliResult<()> {
    let sep = settings.separator_char();
    let mut tree = Tree::new(settings.max_tree_size);

    let n12 = tree.new_node(Value::Number(12.0), None, None)?;
    let n20 = tree.new_node(Value::Number(20.0), None, None)?;
    let n15 = tree.new_node(Value::Number(15.0), Some(n12), Some(n20))?;
    let n5 = tree.new_node(Value::Number(5.0), None, None)?;
    let root = tree.new_node(Value::Number(10.0), Some(n5), Some(n15))?;
    tree.bind_root(root)?;

    let mut renderer = DotRenderer::open(&settings.log_dir, &settings.dot_command)?;
    if let Err(e) = tree.dump(&mut renderer) {
        output::warning(&e);
    }

    let first = out.join("tree.txt");
    tree.print_to_file(&first, sep, Some(&mut renderer))?;
    output::success(&format!("wrote {}", first.display()));
    tree.destroy(Some(&mut renderer))?;

    let mut reread = Tree::read_from_file(&first, sep, settings.max_tree_size, Some(&mut renderer))?;
    if let Err(e) = reread.dump(&mut renderer) {
        output::warning(&e);
    }
    let second = out.join("tree2.txt");
    reread.print_to_file(&second, sep, Some(&mut renderer))?;
    output::success(&format!("wrote {}", second.display()));

    renderer.close()?;
    output::success(&format!(
        "round trip complete, {} nodes",
        reread.count_nodes()?
    ));
    Ok(())
}

#[instrument(skip(settings))]
fn _verify(settings: &Settings, file: &Path, repair: bool) -> CliResult<()> {
    let sep = settings.separator_char();
    let mut tree = Tree::read_from_file(file, sep, settings.max_tree_size, None)?;
    if repair {
        let fixed = tree.verify_and_repair()?;
        let count = tree.count_nodes()?;
        output::success(&format!(
            "tree verified: {} nodes, {} cached counts repaired",
            count, fixed
        ));
    } else {
        let count = tree.count_nodes()?;
        output::success(&format!("tree verified: {} nodes", count));
    }
    Ok(())
}

#[instrument(skip(settings))]
fn _show(settings: &Settings, file: &Path) -> CliResult<()> {
    let sep = settings.separator_char();
    let tree = Tree::read_from_file(file, sep, settings.max_tree_size, None)?;
    let root = tree.root().ok_or(DomainError::NoRoot)?;
    println!("{}", to_termtree(&tree, root)?);
    Ok(())
}

fn to_termtree(tree: &Tree, idx: Index) -> CliResult<termtree::Tree<String>> {
    let rec = tree.node(idx).map_err(CliError::Domain)?;
    let label = format!("{} [id {}, n {}]", rec.value, rec.id, rec.subtree_count);
    let mut leaves = Vec::new();
    if rec.left.is_some() || rec.right.is_some() {
        for slot in [rec.left, rec.right] {
            leaves.push(match slot {
                Some(child) => to_termtree(tree, child)?,
                None => termtree::Tree::new("nil".to_string()),
            });
        }
    }
    Ok(termtree::Tree::new(label).with_leaves(leaves))
}

#[instrument(skip(settings))]
fn _render(settings: &Settings, file: &Path) -> CliResult<()> {
    let sep = settings.separator_char();
    let mut tree = Tree::read_from_file(file, sep, settings.max_tree_size, None)?;
    let mut renderer = DotRenderer::open(&settings.log_dir, &settings.dot_command)?;
    tree.dump(&mut renderer)?;
    renderer.close()?;
    output::success(&format!("rendered into {}", settings.log_dir.display()));
    Ok(())
}

#[instrument(skip(settings))]
fn _copy(settings: &Settings, file: &Path, out: &Path) -> CliResult<()> {
    let sep = settings.separator_char();
    let mut tree = Tree::read_from_file(file, sep, settings.max_tree_size, None)?;
    let root = tree.root().ok_or(DomainError::NoRoot)?;

    let copy = tree.copy_subtree(root)?;
    debug!("copied {} nodes", tree.node(copy)?.subtree_count);

    // The copy must survive deletion of the original.
    tree.delete_subtree(root)?;
    tree.bind_root(copy)?;
    tree.verify()?;

    tree.print_to_file(out, sep, None)?;
    output::success(&format!("wrote copy to {}", out.display()));
    Ok(())
}

#[instrument(skip(settings))]
fn _sort(
    settings: &Settings,
    file: &Path,
    reverse: bool,
    terminator: char,
    raw: bool,
) -> CliResult<()> {
    let mut text = Text::from_file(file, terminator)?;
    let mut stdout = io::stdout().lock();
    if raw {
        text.write_raw(&mut stdout)?;
    } else {
        let order = if reverse {
            SortOrder::EndToStart
        } else {
            SortOrder::StartToEnd
        };
        text.sort_tokens(order, &settings.ignored_chars);
        text.write_tokens(&mut stdout)?;
    }
    Ok(())
}

fn _config(settings: &Settings) -> CliResult<()> {
    output::info(&settings.to_toml()?);
    Ok(())
}

fn _completion(shell: clap_complete::Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
