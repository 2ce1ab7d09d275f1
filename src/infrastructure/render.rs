//! Graphviz rendering of tree dumps.
//!
//! [`DotRenderer`] is the production [`TreeRenderer`]: it writes one dot file
//! per dump iteration, invokes the `dot` binary to render an image, and
//! appends the result to a running HTML log. The destination is opened
//! explicitly and released explicitly; nothing here is process-global.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::{TreeDump, TreeRenderer};
use crate::infrastructure::error::{InfraError, InfraResult};

const FONT_NAME: &str = "Fira Code Bold";
const FONT_SIZE: &str = "10";
const BACKGROUND_COLOR: &str = "#de97d4";
const NODE_COLOR: &str = "#fae1f6";
const NODE_FRAME_COLOR: &str = "#000000";

/// Renders dump records into `<log_dir>/dot`, `<log_dir>/img`, and
/// `<log_dir>/dump.html`.
#[derive(Debug)]
pub struct DotRenderer {
    dot_dir: PathBuf,
    img_dir: PathBuf,
    html_path: PathBuf,
    dot_command: String,
}

impl DotRenderer {
    /// Opens the rendering destination: creates the dot/img directories and
    /// starts (or continues) the HTML log.
    pub fn open(log_dir: &Path, dot_command: &str) -> InfraResult<Self> {
        let dot_dir = log_dir.join("dot");
        let img_dir = log_dir.join("img");
        fs::create_dir_all(&dot_dir)
            .map_err(|e| InfraError::io(format!("create {}", dot_dir.display()), e))?;
        fs::create_dir_all(&img_dir)
            .map_err(|e| InfraError::io(format!("create {}", img_dir.display()), e))?;

        let html_path = log_dir.join("dump.html");
        if !html_path.exists() {
            fs::write(&html_path, "<html>\n<body>\n")
                .map_err(|e| InfraError::io(format!("create {}", html_path.display()), e))?;
        }
        Ok(Self {
            dot_dir,
            img_dir,
            html_path,
            dot_command: dot_command.to_string(),
        })
    }

    /// Marks the end of the session in the HTML log.
    pub fn close(self) -> InfraResult<()> {
        self.append_html(&format!(
            "<hr/><!-- session closed {} -->\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }

    fn render_impl(&self, dump: &TreeDump) -> InfraResult<PathBuf> {
        let dot_path = self.dot_dir.join(format!("iteration-{}.dot", dump.iteration));
        let img_path = self.img_dir.join(format!("iteration-{}.svg", dump.iteration));

        fs::write(&dot_path, dot_source(dump))
            .map_err(|e| InfraError::io(format!("write {}", dot_path.display()), e))?;

        let output = Command::new(&self.dot_command)
            .arg("-Tsvg")
            .arg(&dot_path)
            .arg("-o")
            .arg(&img_path)
            .output()
            .map_err(|e| InfraError::io(format!("spawn {}", self.dot_command), e))?;
        if !output.status.success() {
            return Err(InfraError::Graphviz {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                exit_code: output.status.code(),
            });
        }

        self.append_html(&format!(
            "<p>{} — iteration {} — {}</p>\n<img src=\"img/iteration-{}.svg\"/>\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            dump.iteration,
            dump.status,
            dump.iteration,
        ))?;
        debug!(dot = %dot_path.display(), img = %img_path.display(), "dump rendered");
        Ok(img_path)
    }

    fn append_html(&self, entry: &str) -> InfraResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.html_path)
            .map_err(|e| InfraError::io(format!("open {}", self.html_path.display()), e))?;
        file.write_all(entry.as_bytes())
            .map_err(|e| InfraError::io(format!("append {}", self.html_path.display()), e))?;
        Ok(())
    }
}

impl TreeRenderer for DotRenderer {
    #[instrument(level = "debug", skip(self, dump))]
    fn render(&mut self, dump: &TreeDump) -> TreeResult<()> {
        self.render_impl(dump)
            .map(|_| ())
            .map_err(|e| DomainError::RenderFailed(e.to_string()))
    }
}

/// Dot source for one dump. Pure so the graph shape is testable without the
/// `dot` binary.
pub fn dot_source(dump: &TreeDump) -> String {
    let mut out = String::new();
    out.push_str("digraph\n{\n");
    out.push_str("rankdir = TB;\n");
    let _ = writeln!(
        out,
        "node[shape = record, color = \"{}\", fontname = \"{}\", fontsize = {}];",
        NODE_FRAME_COLOR, FONT_NAME, FONT_SIZE
    );
    let _ = writeln!(out, "bgcolor = \"{}\";", BACKGROUND_COLOR);
    let _ = writeln!(
        out,
        "label = \"status: {}\\niteration {}\";",
        escape(&dump.status),
        dump.iteration
    );

    for node in &dump.nodes {
        let _ = writeln!(
            out,
            "NODE_{}[style = \"filled\", fillcolor = \"{}\", \
             label = \"{{Value:\\n{}|id {} n {}|{{Left|Right}}}}\"];",
            node.id,
            NODE_COLOR,
            escape(&node.label),
            node.id,
            node.count
        );
    }
    for node in &dump.nodes {
        if let Some(left) = node.left {
            let _ = writeln!(out, "NODE_{}->NODE_{};", node.id, left);
        }
        if let Some(right) = node.right {
            let _ = writeln!(out, "NODE_{}->NODE_{};", node.id, right);
        }
    }
    out.push_str("}\n");
    out
}

fn escape(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('|', "\\|")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::DumpNode;

    fn sample_dump() -> TreeDump {
        TreeDump {
            status: "ok".to_string(),
            iteration: 3,
            nodes: vec![
                DumpNode {
                    id: 0,
                    label: "10".to_string(),
                    count: 3,
                    left: Some(1),
                    right: Some(2),
                },
                DumpNode {
                    id: 1,
                    label: "5".to_string(),
                    count: 1,
                    left: None,
                    right: None,
                },
                DumpNode {
                    id: 2,
                    label: "15".to_string(),
                    count: 1,
                    left: None,
                    right: None,
                },
            ],
        }
    }

    #[test]
    fn test_dot_source_names_every_node_and_edge() {
        let source = dot_source(&sample_dump());
        assert!(source.contains("NODE_0["));
        assert!(source.contains("NODE_1["));
        assert!(source.contains("NODE_2["));
        assert!(source.contains("NODE_0->NODE_1;"));
        assert!(source.contains("NODE_0->NODE_2;"));
        assert!(source.contains("status: ok"));
        assert!(source.contains("iteration 3"));
    }

    #[test]
    fn test_dot_source_escapes_labels() {
        let mut dump = sample_dump();
        dump.nodes[0].label = "{bad|label}".to_string();
        let source = dot_source(&dump);
        assert!(source.contains("\\{bad\\|label\\}"));
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = DotRenderer::open(dir.path(), "dot").unwrap();
        assert!(dir.path().join("dot").is_dir());
        assert!(dir.path().join("img").is_dir());
        assert!(dir.path().join("dump.html").is_file());
        drop(renderer);
    }
}
