use std::io::Write;

use clap::Args;
use regent::widgets::NodeState;
use regent::{Context, NodePath, TreeOptions, TreeSync};

use crate::error::Result;
use crate::layout::{render_failure, target_region};
use crate::session::ConnectArgs;

#[derive(Debug, Clone, Args)]
pub struct TreeArgs {
    pub renderer: String,

    /// Node token to open, as stored under `t`.
    #[arg(long, conflicts_with = "path")]
    pub open: Option<String>,

    /// Slash path to open, e.g. `/fs/os`.
    #[arg(long)]
    pub path: Option<String>,

    #[arg(long = "root-prefix", default_value = "")]
    pub root_prefix: String,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl TreeArgs {
    fn target(&self) -> Result<Option<NodePath>> {
        if let Some(token) = &self.open {
            return Ok(Some(NodePath::from_token(token)?));
        }
        Ok(self.path.as_ref().map(|path| {
            NodePath::from_segments(path.split('/').filter(|s| !s.is_empty()))
        }))
    }
}

fn marker(state: Option<NodeState>) -> char {
    match state {
        Some(NodeState::Expanded | NodeState::Loaded) => '-',
        Some(NodeState::Loading) => '~',
        _ => '+',
    }
}

fn print_children(tree: &TreeSync, path: &NodePath, out: &mut dyn Write) -> Result<()> {
    let selected = tree.selected();
    for child in tree.children(path) {
        let indent = "  ".repeat(child.depth() - 1);
        let label = tree.label(&child).unwrap_or_default();
        let mark = if selected.as_ref() == Some(&child) { " *" } else { "" };
        writeln!(out, "{indent}{} {label}{mark}", marker(tree.state_of(&child)))?;
        print_children(tree, &child, out)?;
    }
    Ok(())
}

/// Load the root level, open the requested node and print what is loaded.
pub fn tree_into(ctx: &Context, args: &TreeArgs, out: &mut dyn Write) -> Result<()> {
    let target = args.target()?;
    let container = target_region(ctx, None)?;
    let mut options = TreeOptions::new(&args.renderer, container);
    options.root_prefix = args.root_prefix.clone();
    let tree = TreeSync::mount(ctx, options)?;
    if let Some(target) = target.filter(|t| !t.is_root()) {
        tree.open_tree(ctx, &target.to_token());
    }
    ctx.run_until_idle();

    if tree.state_of(&NodePath::root()) != Some(NodeState::Expanded) {
        return Err(render_failure(ctx, &args.renderer));
    }
    print_children(&tree, &NodePath::root(), out)?;
    if let Some(selected) = tree.selected() {
        writeln!(out, "selected {} ({})", selected, selected.to_token())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regent::core::envelope;
    use regent::runtime::RenderRequest;
    use regent::{Clock, RuntimeConfig, ScriptedTransport};
    use serde_json::json;

    fn session() -> (Context, ScriptedTransport) {
        let t = ScriptedTransport::new();
        t.respond_with("Files", |req: &RenderRequest| {
            let names: &[&str] = match req.param("path") {
                Some("/") => &["fs", "registry"],
                Some("/fs") => &["os"],
                _ => &[],
            };
            let children: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
            Ok(envelope::encode(&json!({ "children": children })).unwrap())
        });
        let ctx = ConnectArgs::default()
            .build(RuntimeConfig::default(), t.clone(), Clock::Virtual)
            .unwrap();
        (ctx, t)
    }

    fn args() -> TreeArgs {
        TreeArgs {
            renderer: "Files".into(),
            open: None,
            path: None,
            root_prefix: String::new(),
            connect: ConnectArgs::default(),
        }
    }

    #[test]
    fn prints_root_level() {
        let (ctx, _t) = session();
        let mut out = Vec::new();
        tree_into(&ctx, &args(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "+ fs\n+ registry\n");
    }

    #[test]
    fn opens_a_slash_path() {
        let (ctx, _t) = session();
        let mut a = args();
        a.path = Some("/fs/os".into());
        let mut out = Vec::new();
        tree_into(&ctx, &a, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "- fs\n  - os *\n+ registry\nselected /fs/os (6673-6f73)\n"
        );
    }

    #[test]
    fn rejects_bad_token() {
        let (ctx, t) = session();
        let mut a = args();
        a.open = Some("not-hex".into());
        let err = tree_into(&ctx, &a, &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert_eq!(t.call_count(), 0);
    }
}
