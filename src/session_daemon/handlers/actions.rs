//! `action.*` commands. Each performs one provider action on `id` and reports
//! `{<verb>: true}`.

use super::resolve_id;
use crate::automation::Action;
use crate::session_daemon::args::required;
use crate::session_daemon::errors::HandlerResult;
use crate::session_daemon::protocol::Args;
use crate::session_daemon::session::SessionContext;
use serde_json::{Map, Value};

async fn perform(
    ctx: &mut SessionContext,
    args: &Args,
    action: Action,
    verb: &'static str,
) -> HandlerResult {
    let (id, handle) = resolve_id(ctx, args).await?;
    tracing::debug!(%id, ?action, "performing action");
    ctx.provider().perform(&handle, &action).await?;
    let mut data = Map::new();
    data.insert(verb.to_string(), Value::Bool(true));
    Ok(Value::Object(data))
}

macro_rules! simple_actions {
    ($($name:ident => $action:expr, $verb:literal;)*) => {
        $(
            pub async fn $name(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
                perform(ctx, args, $action, $verb).await
            }
        )*
    };
}

simple_actions! {
    click => Action::Click, "clicked";
    right_click => Action::RightClick, "rightClicked";
    double_click => Action::DoubleClick, "doubleClicked";
    clear => Action::Clear, "cleared";
    check => Action::Check, "checked";
    uncheck => Action::Uncheck, "unchecked";
    toggle => Action::Toggle, "toggled";
    expand => Action::Expand, "expanded";
    collapse => Action::Collapse, "collapsed";
    invoke => Action::Invoke, "invoked";
}

pub async fn type_text(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let text: String = required(args, "text")?;
    perform(ctx, args, Action::Type(text), "typed").await
}

pub async fn press(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let key: String = required(args, "key")?;
    perform(ctx, args, Action::Press(key), "pressed").await
}

pub async fn select(ctx: &mut SessionContext, args: &Args) -> HandlerResult {
    let item: String = required(args, "item")?;
    perform(ctx, args, Action::Select(item), "selected").await
}
