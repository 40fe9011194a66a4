use serde_json::Value;
use studio_core::{fields, FlowKind, Msg};

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch(Msg),
    SwitchFlow(FlowKind),
    History,
    DismissNotice(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  set <field> <value>   edit a field (use \\n for line breaks)
  next | back           move between steps
  run                   start the step's operation
  finish                export the result (CTA: apply placements)
  start-over            clear everything (asks first)
  clear                 drop generated results (asks first)
  yes | no              answer a confirmation
  flow <name>           switch to playbook, call-review or cta
  history               show recent call fetches
  dismiss <notice>      hide a one-time notice
  help | quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let msg = match verb.to_ascii_lowercase().as_str() {
        "" => Msg::NoOp,
        "set" => return parse_set(rest),
        "next" | "n" => Msg::NextClicked,
        "back" | "b" => Msg::BackClicked,
        "run" | "r" => Msg::RunClicked,
        "finish" => Msg::FinishClicked,
        "start-over" | "reset" => Msg::StartOverClicked,
        "clear" => Msg::ClearResultsClicked,
        "yes" | "y" => Msg::ConfirmAccepted,
        "no" => Msg::ConfirmDismissed,
        "flow" => return rest.parse().map(Command::SwitchFlow),
        "history" => return Ok(Command::History),
        "dismiss" if !rest.is_empty() => return Ok(Command::DismissNotice(rest.to_string())),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" | "q" => return Ok(Command::Quit),
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Command::Dispatch(msg))
}

fn parse_set(rest: &str) -> Result<Command, String> {
    let (name, raw) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    if name.is_empty() {
        return Err("usage: set <field> <value>".to_string());
    }
    let value = match name {
        fields::DAYS_BACK | fields::LIMIT => match raw.trim().parse::<u64>() {
            Ok(number) => Value::from(number),
            Err(_) => Value::String(raw.trim().to_string()),
        },
        fields::JOB_TITLE
        | fields::RAW_DATA
        | fields::SOURCE_KIND
        | fields::SOURCE_INPUT => Value::String(raw.replace("\\n", "\n")),
        other => return Err(format!("unknown field '{other}'")),
    };
    Ok(Command::Dispatch(Msg::FieldEdited {
        name: name.to_string(),
        value,
    }))
}
