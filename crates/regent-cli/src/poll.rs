use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use clap::Args;
use regent::{Context, DataType, EnvelopeError, Payload, Poll};
use web_time::Duration;

use crate::error::Result;
use crate::layout::target_region;
use crate::session::ConnectArgs;

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    pub renderer: String,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long = "interval-ms", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Replies to print before stopping; 0 polls until interrupted.
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Decode replies as guarded JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// Poll and print each reply; returns how many were printed.
pub fn poll_into(ctx: &Context, args: &PollArgs, out: &mut dyn Write) -> Result<usize> {
    let region = target_region(ctx, args.region.as_deref())?;
    if !ctx.has_content(&region) {
        ctx.set_text(&region, "polling");
    }

    let lines: Rc<RefCell<Vec<String>>> = Rc::default();
    let failure: Rc<RefCell<Option<EnvelopeError>>> = Rc::default();
    let sink = Rc::clone(&lines);
    let failed = Rc::clone(&failure);
    let count = args.count;
    let mut received = 0usize;
    let data_type = if args.json { DataType::Json } else { DataType::Html };

    let handle = Poll::new(
        &args.renderer,
        &region,
        Duration::from_millis(args.interval_ms),
        move |_: &Context, payload: std::result::Result<Payload, EnvelopeError>| match payload {
            Ok(payload) => {
                received += 1;
                let line = match payload {
                    Payload::Text(text) => text,
                    Payload::Json(value) => value.to_string(),
                };
                sink.borrow_mut().push(line);
                count == 0 || received < count
            }
            Err(error) => {
                *failed.borrow_mut() = Some(error);
                false
            }
        },
    )
    .data_type(data_type)
    .start(ctx);

    let mut printed = 0;
    loop {
        let running = handle.is_running();
        for line in lines.borrow_mut().drain(..) {
            writeln!(out, "{line}")?;
            printed += 1;
        }
        out.flush()?;
        if !running {
            break;
        }
        ctx.advance(TICK);
    }
    if let Some(error) = failure.borrow_mut().take() {
        return Err(error.into());
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regent::{Clock, RuntimeConfig, ScriptedTransport};

    fn args(count: usize, json: bool) -> PollArgs {
        PollArgs {
            renderer: "Progress".into(),
            region: None,
            interval_ms: 1000,
            count,
            json,
            connect: ConnectArgs::default(),
        }
    }

    fn session(t: &ScriptedTransport) -> Context {
        ConnectArgs::default()
            .build(RuntimeConfig::default(), t.clone(), Clock::Virtual)
            .unwrap()
    }

    #[test]
    fn prints_requested_number_of_replies() {
        let t = ScriptedTransport::new();
        t.reply_once("Progress", "10%");
        t.reply_once("Progress", "50%");
        t.reply("Progress", "100%");
        let ctx = session(&t);
        let mut out = Vec::new();
        assert_eq!(poll_into(&ctx, &args(3, false), &mut out).unwrap(), 3);
        assert_eq!(String::from_utf8(out).unwrap(), "10%\n50%\n100%\n");
        assert_eq!(t.call_count(), 3);
    }

    #[test]
    fn json_replies_are_decoded() {
        let t = ScriptedTransport::new();
        t.reply("Progress", ")]}\n{\"done\": 2}");
        let ctx = session(&t);
        let mut out = Vec::new();
        poll_into(&ctx, &args(1, true), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"done\":2}\n");
    }

    #[test]
    fn unguarded_json_fails() {
        let t = ScriptedTransport::new();
        t.reply("Progress", "{\"done\": 2}");
        let ctx = session(&t);
        let err = poll_into(&ctx, &args(5, true), &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
