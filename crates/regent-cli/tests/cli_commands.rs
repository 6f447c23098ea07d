//! Parsed command lines run against a scripted server.

use clap::Parser;
use regent::core::envelope;
use regent::runtime::RenderRequest;
use regent::{Clock, Context, RuntimeConfig, ScriptedTransport, TransportError};
use regent_cli::cli::{Cli, Commands};
use regent_cli::{layout, poll, table, tree};
use serde_json::json;

fn server() -> ScriptedTransport {
    let t = ScriptedTransport::new();
    t.reply("Banner", "<h1>console</h1>");
    t.reply_once("Status", "starting");
    t.reply("Status", "ready");
    t.fail("Broken", TransportError::Status { status: 500, body: "boom".into() });
    t.respond_with("Files", |req: &RenderRequest| {
        let names: &[&str] = match req.param("path") {
            Some("/") => &["etc"],
            _ => &[],
        };
        let children: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
        Ok(envelope::encode(&json!({ "children": children })).unwrap())
    });
    t
}

fn parse(argv: &[&str]) -> Commands {
    let mut full = vec!["regentctl"];
    full.extend_from_slice(argv);
    Cli::try_parse_from(full).unwrap().command
}

fn session(t: &ScriptedTransport, connect: &regent_cli::session::ConnectArgs) -> Context {
    connect
        .build(RuntimeConfig::default(), t.clone(), Clock::Virtual)
        .unwrap()
}

#[test]
fn layout_prints_rendered_region() {
    let t = server();
    let Commands::Layout(args) = parse(&["layout", "Banner", "--state", "client_id=C.7"]) else {
        panic!("expected layout");
    };
    let ctx = session(&t, &args.connect);
    let mut out = Vec::new();
    layout::render_into(&ctx, &args, &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("<h1>console</h1>"));
    assert_eq!(t.calls_for("Banner")[0].param("client_id"), Some("C.7"));
}

#[test]
fn failing_renderer_maps_to_render_error() {
    let t = server();
    let Commands::Layout(args) = parse(&["layout", "Broken"]) else {
        panic!("expected layout");
    };
    let ctx = session(&t, &args.connect);
    let err = layout::render_into(&ctx, &args, &mut Vec::new()).unwrap_err();
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn poll_prints_each_reply() {
    let t = server();
    let Commands::Poll(args) = parse(&["poll", "Status", "--count", "2", "--interval-ms", "500"])
    else {
        panic!("expected poll");
    };
    let ctx = session(&t, &args.connect);
    let mut out = Vec::new();
    assert_eq!(poll::poll_into(&ctx, &args, &mut out).unwrap(), 2);
    assert_eq!(String::from_utf8(out).unwrap(), "starting\nready\n");
}

#[test]
fn tree_replays_fragment_token() {
    let t = server();
    let Commands::Tree(args) = parse(&["tree", "Files", "--fragment", "t=657463"]) else {
        panic!("expected tree");
    };
    let ctx = session(&t, &args.connect);
    let mut out = Vec::new();
    tree::tree_into(&ctx, &args, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("- etc *\n"), "{text}");
    assert!(text.ends_with("selected /etc (657463)\n"));
}

#[test]
fn table_rejects_bad_sort_before_any_call() {
    let t = server();
    let Commands::Table(args) = parse(&["table", "Hosts", "--sort", "Name"]) else {
        panic!("expected table");
    };
    let ctx = session(&t, &args.connect);
    let err = table::table_into(&ctx, &args, &mut Vec::new()).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(t.call_count(), 0);
}
