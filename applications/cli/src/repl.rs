//! Line-oriented command parsing for the interactive driver

use cadence_core::RepeatMode;
use cadence_playback::{
    Command, InterruptionPhase, RemoteAction, RemoteActionKind, RouteChange, SeekDirection,
    SystemEvent,
};
use std::time::Duration;

pub const HELP: &str = "\
Commands:
  play | pause | toggle | stop      transport
  next | prev | skip                playlist navigation (skip drops the current track)
  load [shuffled] | shuffle         reload the whole library
  ff | rew | release                hold fast-forward / rewind, then let go
  goto <seconds>                    jump within the current track
  repeat [none|one|all]             set (or cycle) repeat mode
  remote <action>                   send a remote-control action
                                    (play, pause, toggle, stop, prev, next, ff, rew, release, repeat)
  enable <kind> | disable <kind>    toggle a remote action
                                    (play, pause, toggle, stop, prev, next, ff, rew, position, repeat)
  unplug | plug                     headphones removed / connected
  call | hangup                     audio session interrupted / resumed
  bg | fg                           app backgrounded / foregrounded
  status                            show the current snapshot
  help                              this text
  quit                              exit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Status,
    Help,
    Quit,
}

/// Parse one line of input
///
/// Blank lines parse to `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }

    let command = match (verb.to_lowercase().as_str(), arg) {
        ("quit" | "exit" | "q", None) => return Ok(Some(Input::Quit)),
        ("help" | "?", None) => return Ok(Some(Input::Help)),
        ("status" | "s", None) => return Ok(Some(Input::Status)),

        ("play", None) => Command::Play,
        ("pause", None) => Command::Pause,
        ("toggle", None) => Command::TogglePlayPause,
        ("stop", None) => Command::Stop,
        ("next", None) => Command::Next,
        ("prev" | "previous", None) => Command::Previous,
        ("skip", None) => Command::Skip,
        ("shuffle", None) => Command::Shuffle,
        ("load", None) => Command::LoadPlaylist { shuffled: false },
        ("load", Some("shuffled")) => Command::LoadPlaylist { shuffled: true },
        ("ff", None) => Command::BeginSeek(SeekDirection::Forward),
        ("rew", None) => Command::BeginSeek(SeekDirection::Backward),
        ("release", None) => Command::EndSeek,
        ("goto", Some(secs)) => Command::ChangePosition(parse_seconds(secs)?),
        ("repeat", None) => Command::CycleRepeatMode,
        ("repeat", Some(mode)) => Command::SetRepeatMode(
            RepeatMode::from_str(mode).ok_or_else(|| format!("unknown repeat mode '{mode}'"))?,
        ),
        ("remote", Some(action)) => Command::Remote(parse_remote(action)?),
        ("enable", Some(kind)) => Command::SetRemoteEnabled(parse_kind(kind)?, true),
        ("disable", Some(kind)) => Command::SetRemoteEnabled(parse_kind(kind)?, false),
        ("unplug", None) => {
            Command::System(SystemEvent::RouteChanged(RouteChange::DeviceDisappeared))
        }
        ("plug", None) => Command::System(SystemEvent::RouteChanged(RouteChange::DeviceAppeared)),
        ("call", None) => Command::System(SystemEvent::Interruption(InterruptionPhase::Began)),
        ("hangup", None) => Command::System(SystemEvent::Interruption(InterruptionPhase::Ended)),
        ("bg", None) => Command::System(SystemEvent::Backgrounded),
        ("fg", None) => Command::System(SystemEvent::Foregrounded),

        (verb, _) => return Err(format!("unknown command '{verb}' (try 'help')")),
    };

    Ok(Some(Input::Command(command)))
}

fn parse_seconds(text: &str) -> Result<Duration, String> {
    text.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| format!("'{text}' is not a number of seconds"))
}

fn parse_remote(action: &str) -> Result<RemoteAction, String> {
    Ok(match action {
        "play" => RemoteAction::Play,
        "pause" => RemoteAction::Pause,
        "toggle" => RemoteAction::TogglePlayPause,
        "stop" => RemoteAction::Stop,
        "prev" | "previous" => RemoteAction::PreviousTrack,
        "next" => RemoteAction::NextTrack,
        "ff" => RemoteAction::BeginSeeking(SeekDirection::Forward),
        "rew" => RemoteAction::BeginSeeking(SeekDirection::Backward),
        "release" => RemoteAction::EndSeeking,
        "repeat" => RemoteAction::ChangeRepeatMode(None),
        other => return Err(format!("unknown remote action '{other}'")),
    })
}

fn parse_kind(kind: &str) -> Result<RemoteActionKind, String> {
    Ok(match kind {
        "play" => RemoteActionKind::Play,
        "pause" => RemoteActionKind::Pause,
        "toggle" => RemoteActionKind::TogglePlayPause,
        "stop" => RemoteActionKind::Stop,
        "prev" | "previous" => RemoteActionKind::PreviousTrack,
        "next" => RemoteActionKind::NextTrack,
        "ff" | "rew" | "seek" => RemoteActionKind::Seek,
        "position" => RemoteActionKind::ChangePlaybackPosition,
        "repeat" => RemoteActionKind::ChangeRepeatMode,
        other => return Err(format!("unknown remote action '{other}'")),
    })
}

/// `m:ss` rendering for the time display
pub fn format_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
