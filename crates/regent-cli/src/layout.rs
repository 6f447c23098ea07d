use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use clap::Args;
use regent::core::page::ROOT;
use regent::{Context, Layout, Update};

use crate::error::{CliError, Result};
use crate::session::ConnectArgs;

#[derive(Debug, Clone, Args)]
pub struct LayoutArgs {
    pub renderer: String,

    /// Target region; created under the page root when missing. Defaults to
    /// the content region.
    #[arg(long)]
    pub region: Option<String>,

    /// Issue a deduplicated fragment update instead of a full layout.
    #[arg(long)]
    pub update: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// Resolve `region` (or the content region) and make sure it exists.
pub(crate) fn target_region(ctx: &Context, region: Option<&str>) -> Result<String> {
    let region = region.map_or_else(|| ctx.config().regions.content.clone(), str::to_owned);
    ctx.ensure_region(ROOT, &region)?;
    Ok(region)
}

/// The failure a call left in the error region.
pub(crate) fn render_failure(ctx: &Context, renderer: &str) -> CliError {
    let detail = ctx
        .content(&ctx.config().regions.error)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "no reply".to_owned());
    CliError::Render {
        renderer: renderer.to_owned(),
        detail,
    }
}

pub fn render_into(ctx: &Context, args: &LayoutArgs, out: &mut dyn Write) -> Result<()> {
    let region = target_region(ctx, args.region.as_deref())?;
    let done = Rc::new(Cell::new(false));
    let flag = Rc::clone(&done);
    let dispatch = if args.update {
        let target = region.clone();
        Update::new(&args.renderer, &region)
            .on_success(move |ctx, body| {
                let _ = ctx.replace_content(&target, body);
                flag.set(true);
            })
            .issue(ctx)
    } else {
        Layout::new(&args.renderer, &region)
            .on_success(move |_, _| flag.set(true))
            .issue(ctx)
    };
    if !dispatch.is_issued() {
        return Err(CliError::invalid(format!("call into {region} not issued: {dispatch:?}")));
    }
    ctx.run_until_idle();
    if !done.get() {
        return Err(render_failure(ctx, &args.renderer));
    }
    writeln!(out, "{}", ctx.content(&region).unwrap_or_default())?;
    Ok(())
}
