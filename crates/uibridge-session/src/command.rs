use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uibridge_line::{decode_scalar, Scalar, ScalarKind};

use crate::error::{Result, SessionError};

use ScalarKind::{Bool, Float, Int, Str};

/// First field of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Control,
    Program,
    MidiProgram,
    Configure,
    Note,
    Show,
    Focus,
    Hide,
    Quit,
    UiTitle,
    Atom,
    Urid,
    UiOptions,
    Parameter,
    PControl,
    Exiting,
    /// The empty line a UI writes once it is up.
    Ready,
}

impl Keyword {
    pub const ALL: [Keyword; 17] = [
        Self::Control,
        Self::Program,
        Self::MidiProgram,
        Self::Configure,
        Self::Note,
        Self::Show,
        Self::Focus,
        Self::Hide,
        Self::Quit,
        Self::UiTitle,
        Self::Atom,
        Self::Urid,
        Self::UiOptions,
        Self::Parameter,
        Self::PControl,
        Self::Exiting,
        Self::Ready,
    ];

    /// Keyword text as written on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Program => "program",
            Self::MidiProgram => "midiprogram",
            Self::Configure => "configure",
            Self::Note => "note",
            Self::Show => "show",
            Self::Focus => "focus",
            Self::Hide => "hide",
            Self::Quit => "quit",
            Self::UiTitle => "uiTitle",
            Self::Atom => "atom",
            Self::Urid => "urid",
            Self::UiOptions => "uiOptions",
            Self::Parameter => "parameter",
            Self::PControl => "pcontrol",
            Self::Exiting => "exiting",
            Self::Ready => "",
        }
    }

    /// Human-readable name; the wire text except for `ready`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            other => other.as_str(),
        }
    }

    /// Look up a keyword line. Matching is exact and case-sensitive.
    pub fn from_wire(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|keyword| keyword.as_str() == line)
    }

    /// Argument kinds that follow this keyword, in order.
    pub fn arg_kinds(self) -> &'static [ScalarKind] {
        match self {
            Self::Control => &[Int, Float],
            Self::Program => &[Int, Int, Int],
            Self::MidiProgram => &[Int, Float],
            Self::Configure => &[Str, Str],
            Self::Note => &[Bool, Int, Int, Int],
            Self::UiTitle => &[Str],
            Self::Atom => &[Int, Int, Int, Str],
            Self::Urid => &[Int, Int, Str],
            Self::UiOptions => &[Float, Int, Int, Float, Bool, Bool, Str, Int],
            Self::Parameter | Self::PControl => &[Str, Float],
            Self::Show
            | Self::Focus
            | Self::Hide
            | Self::Quit
            | Self::Exiting
            | Self::Ready => &[],
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Keyword {
    type Err = SessionError;

    /// Parse a keyword name as typed by a person; `ready` names the empty line.
    fn from_str(s: &str) -> Result<Self> {
        if s == "ready" {
            return Ok(Self::Ready);
        }
        Self::from_wire(s)
            .filter(|keyword| *keyword != Self::Ready)
            .ok_or_else(|| SessionError::UnknownKeyword(s.to_string()))
    }
}

impl Serialize for Keyword {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Window options pushed to a UI when it opens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiOptions {
    pub sample_rate: f64,
    pub bg_color: i32,
    pub fg_color: i32,
    pub ui_scale: f64,
    pub use_theme: bool,
    pub use_theme_colors: bool,
    pub window_title: String,
    pub transient_window_id: i32,
}

/// One decoded message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "keyword")]
pub enum Command {
    #[serde(rename = "control")]
    Control { index: i32, value: f64 },
    #[serde(rename = "program")]
    Program { channel: i32, bank: i32, program: i32 },
    /// Legacy form; the program number travels as a float.
    #[serde(rename = "midiprogram")]
    MidiProgram { bank: i32, program: f64 },
    #[serde(rename = "configure")]
    Configure { key: String, value: String },
    #[serde(rename = "note")]
    Note {
        on: bool,
        channel: i32,
        note: i32,
        velocity: i32,
    },
    #[serde(rename = "show")]
    Show,
    #[serde(rename = "focus")]
    Focus,
    #[serde(rename = "hide")]
    Hide,
    #[serde(rename = "quit")]
    Quit,
    #[serde(rename = "uiTitle")]
    UiTitle { title: String },
    #[serde(rename = "atom")]
    Atom {
        index: i32,
        size: i32,
        base64_size: i32,
        data: String,
    },
    #[serde(rename = "urid")]
    Urid { urid: i32, size: i32, uri: String },
    #[serde(rename = "uiOptions")]
    UiOptions(UiOptions),
    #[serde(rename = "parameter")]
    Parameter { uri: String, value: f64 },
    #[serde(rename = "pcontrol")]
    PControl { uri: String, value: f64 },
    #[serde(rename = "exiting")]
    Exiting,
    #[serde(rename = "ready")]
    Ready,
}

impl Command {
    pub fn keyword(&self) -> Keyword {
        match self {
            Self::Control { .. } => Keyword::Control,
            Self::Program { .. } => Keyword::Program,
            Self::MidiProgram { .. } => Keyword::MidiProgram,
            Self::Configure { .. } => Keyword::Configure,
            Self::Note { .. } => Keyword::Note,
            Self::Show => Keyword::Show,
            Self::Focus => Keyword::Focus,
            Self::Hide => Keyword::Hide,
            Self::Quit => Keyword::Quit,
            Self::UiTitle { .. } => Keyword::UiTitle,
            Self::Atom { .. } => Keyword::Atom,
            Self::Urid { .. } => Keyword::Urid,
            Self::UiOptions(_) => Keyword::UiOptions,
            Self::Parameter { .. } => Keyword::Parameter,
            Self::PControl { .. } => Keyword::PControl,
            Self::Exiting => Keyword::Exiting,
            Self::Ready => Keyword::Ready,
        }
    }

    /// Build a command from its keyword and decoded argument fields.
    pub fn from_fields(keyword: Keyword, fields: Vec<Scalar>) -> Result<Self> {
        let expected = keyword.arg_kinds().len();
        if fields.len() != expected {
            return Err(SessionError::ArgumentCount {
                keyword: keyword.name(),
                expected,
                got: fields.len(),
            });
        }

        let mut args = Args {
            keyword,
            fields: fields.into_iter(),
            index: 0,
        };
        let command = match keyword {
            Keyword::Control => Self::Control {
                index: args.int()?,
                value: args.float()?,
            },
            Keyword::Program => Self::Program {
                channel: args.int()?,
                bank: args.int()?,
                program: args.int()?,
            },
            Keyword::MidiProgram => Self::MidiProgram {
                bank: args.int()?,
                program: args.float()?,
            },
            Keyword::Configure => Self::Configure {
                key: args.string()?,
                value: args.string()?,
            },
            Keyword::Note => Self::Note {
                on: args.bool()?,
                channel: args.int()?,
                note: args.int()?,
                velocity: args.int()?,
            },
            Keyword::Show => Self::Show,
            Keyword::Focus => Self::Focus,
            Keyword::Hide => Self::Hide,
            Keyword::Quit => Self::Quit,
            Keyword::UiTitle => Self::UiTitle {
                title: args.string()?,
            },
            Keyword::Atom => Self::Atom {
                index: args.int()?,
                size: args.int()?,
                base64_size: args.int()?,
                data: args.string()?,
            },
            Keyword::Urid => Self::Urid {
                urid: args.int()?,
                size: args.int()?,
                uri: args.string()?,
            },
            Keyword::UiOptions => Self::UiOptions(UiOptions {
                sample_rate: args.float()?,
                bg_color: args.int()?,
                fg_color: args.int()?,
                ui_scale: args.float()?,
                use_theme: args.bool()?,
                use_theme_colors: args.bool()?,
                window_title: args.string()?,
                transient_window_id: args.int()?,
            }),
            Keyword::Parameter => Self::Parameter {
                uri: args.string()?,
                value: args.float()?,
            },
            Keyword::PControl => Self::PControl {
                uri: args.string()?,
                value: args.float()?,
            },
            Keyword::Exiting => Self::Exiting,
            Keyword::Ready => Self::Ready,
        };
        Ok(command)
    }

    /// Fields as sent on the wire, keyword first.
    pub fn to_fields(&self) -> Vec<Scalar> {
        let mut fields = vec![Scalar::from(self.keyword().as_str())];
        match self {
            Self::Control { index, value } => {
                fields.extend([Scalar::from(*index), Scalar::from(*value)]);
            }
            Self::Program {
                channel,
                bank,
                program,
            } => fields.extend([Scalar::from(*channel), (*bank).into(), (*program).into()]),
            Self::MidiProgram { bank, program } => {
                fields.extend([Scalar::from(*bank), Scalar::from(*program)]);
            }
            Self::Configure { key, value } => {
                fields.extend([Scalar::from(key.as_str()), Scalar::from(value.as_str())]);
            }
            Self::Note {
                on,
                channel,
                note,
                velocity,
            } => fields.extend([
                Scalar::from(*on),
                (*channel).into(),
                (*note).into(),
                (*velocity).into(),
            ]),
            Self::UiTitle { title } => fields.push(title.as_str().into()),
            Self::Atom {
                index,
                size,
                base64_size,
                data,
            } => fields.extend([
                Scalar::from(*index),
                (*size).into(),
                (*base64_size).into(),
                data.as_str().into(),
            ]),
            Self::Urid { urid, size, uri } => {
                fields.extend([Scalar::from(*urid), (*size).into(), uri.as_str().into()]);
            }
            Self::UiOptions(options) => fields.extend([
                Scalar::from(options.sample_rate),
                options.bg_color.into(),
                options.fg_color.into(),
                options.ui_scale.into(),
                options.use_theme.into(),
                options.use_theme_colors.into(),
                options.window_title.as_str().into(),
                options.transient_window_id.into(),
            ]),
            Self::Parameter { uri, value } | Self::PControl { uri, value } => {
                fields.extend([Scalar::from(uri.as_str()), Scalar::from(*value)]);
            }
            Self::Show
            | Self::Focus
            | Self::Hide
            | Self::Quit
            | Self::Exiting
            | Self::Ready => {}
        }
        fields
    }

    /// Parse a command typed on one line, e.g. `control 5 0.25`.
    ///
    /// Arguments are separated by whitespace; a trailing string argument
    /// takes the rest of the line, so `uiTitle My Synth` works unquoted.
    pub fn parse_text(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, mut rest) = match text.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim_start()),
            None => (text, ""),
        };
        let keyword: Keyword = name.parse()?;
        let kinds = keyword.arg_kinds();

        let mut fields = Vec::with_capacity(kinds.len());
        for (index, kind) in kinds.iter().enumerate() {
            let last = index + 1 == kinds.len();
            let token = if last && *kind == Str {
                std::mem::take(&mut rest)
            } else {
                let (token, tail) = match rest.split_once(char::is_whitespace) {
                    Some((token, tail)) => (token, tail.trim_start()),
                    None => (rest, ""),
                };
                rest = tail;
                token
            };
            if token.is_empty() && *kind != Str {
                return Err(SessionError::ArgumentCount {
                    keyword: keyword.name(),
                    expected: kinds.len(),
                    got: index,
                });
            }
            fields.push(decode_scalar(token, *kind)?);
        }

        if !rest.is_empty() {
            let extra = rest.split_whitespace().count();
            return Err(SessionError::ArgumentCount {
                keyword: keyword.name(),
                expected: kinds.len(),
                got: kinds.len() + extra,
            });
        }
        Self::from_fields(keyword, fields)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().name())?;
        for field in self.to_fields().iter().skip(1) {
            match field {
                Scalar::Str(text) => write!(f, " {text:?}")?,
                Scalar::Bool(value) => write!(f, " {value}")?,
                Scalar::Int(value) => write!(f, " {value}")?,
                Scalar::Float(value) => write!(f, " {value}")?,
                Scalar::Null => f.write_str(" (null)")?,
            }
        }
        Ok(())
    }
}

struct Args {
    keyword: Keyword,
    fields: std::vec::IntoIter<Scalar>,
    index: usize,
}

impl Args {
    fn next(&mut self, kind: ScalarKind) -> Result<Scalar> {
        let index = self.index;
        self.index += 1;
        self.fields.next().ok_or(SessionError::ArgumentCount {
            keyword: self.keyword.name(),
            expected: self.keyword.arg_kinds().len(),
            got: index,
        })
        .and_then(|value| match (kind, value) {
            (Str, Scalar::Null) => Ok(Scalar::Str(String::new())),
            (Float, Scalar::Int(number)) => Ok(Scalar::Float(f64::from(number))),
            (kind, value) if value.kind() == Some(kind) => Ok(value),
            _ => Err(SessionError::ArgumentType {
                keyword: self.keyword.name(),
                index,
                expected: kind,
            }),
        })
    }

    fn int(&mut self) -> Result<i32> {
        Ok(self.next(Int)?.as_int().unwrap_or_default())
    }

    fn float(&mut self) -> Result<f64> {
        Ok(self.next(Float)?.as_float().unwrap_or_default())
    }

    fn bool(&mut self) -> Result<bool> {
        Ok(self.next(Bool)?.as_bool().unwrap_or_default())
    }

    fn string(&mut self) -> Result<String> {
        Ok(self.next(Str)?.into_string().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_roundtrips_through_wire_text() {
        for keyword in Keyword::ALL {
            assert_eq!(Keyword::from_wire(keyword.as_str()), Some(keyword));
        }
        assert_eq!(Keyword::from_wire("Control"), None);
        assert_eq!(Keyword::from_wire("bogus"), None);
    }

    #[test]
    fn ready_is_the_empty_line() {
        assert_eq!(Keyword::from_wire(""), Some(Keyword::Ready));
        assert_eq!("ready".parse::<Keyword>().unwrap(), Keyword::Ready);
        assert!("".parse::<Keyword>().is_err());
        assert_eq!(Command::Ready.to_fields(), vec![Scalar::from("")]);
    }

    #[test]
    fn argument_lists_match_vocabulary() {
        assert_eq!(Keyword::Control.arg_kinds(), &[Int, Float]);
        assert_eq!(Keyword::Note.arg_kinds(), &[Bool, Int, Int, Int]);
        assert_eq!(Keyword::UiOptions.arg_kinds().len(), 8);
        assert!(Keyword::Quit.arg_kinds().is_empty());
    }

    #[test]
    fn fields_rebuild_the_same_command() {
        let commands = [
            Command::Control {
                index: 5,
                value: 0.25,
            },
            Command::Program {
                channel: 0,
                bank: 1,
                program: 7,
            },
            Command::MidiProgram {
                bank: 2,
                program: 3.0,
            },
            Command::Configure {
                key: "state".into(),
                value: "a\nb".into(),
            },
            Command::Note {
                on: true,
                channel: 1,
                note: 60,
                velocity: 100,
            },
            Command::UiOptions(UiOptions {
                sample_rate: 48_000.0,
                bg_color: 0x1a1a1a,
                fg_color: 0xffffff,
                ui_scale: 1.5,
                use_theme: true,
                use_theme_colors: false,
                window_title: "Synth".into(),
                transient_window_id: 0,
            }),
            Command::PControl {
                uri: "urn:gain".into(),
                value: -6.0,
            },
            Command::Quit,
        ];
        for command in commands {
            let mut fields = command.to_fields();
            let keyword = Keyword::from_wire(fields.remove(0).as_str().unwrap()).unwrap();
            assert_eq!(Command::from_fields(keyword, fields).unwrap(), command);
        }
    }

    #[test]
    fn null_string_argument_reads_as_empty() {
        let command =
            Command::from_fields(Keyword::Configure, vec![Scalar::Null, Scalar::from("v")])
                .unwrap();
        assert_eq!(
            command,
            Command::Configure {
                key: String::new(),
                value: "v".into()
            }
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = Command::from_fields(Keyword::Control, vec![Scalar::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ArgumentCount {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = Command::from_fields(Keyword::Control, vec![Scalar::Bool(true), Scalar::Float(1.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::ArgumentType {
                index: 0,
                expected: ScalarKind::Int,
                ..
            }
        ));
    }

    #[test]
    fn parses_typed_commands() {
        assert_eq!(
            Command::parse_text("control 5 0.25").unwrap(),
            Command::Control {
                index: 5,
                value: 0.25
            }
        );
        assert_eq!(
            Command::parse_text("  uiTitle   My Synth  ").unwrap(),
            Command::UiTitle {
                title: "My Synth".into()
            }
        );
        assert_eq!(
            Command::parse_text("note true 0 60 127").unwrap(),
            Command::Note {
                on: true,
                channel: 0,
                note: 60,
                velocity: 127
            }
        );
        assert_eq!(Command::parse_text("show").unwrap(), Command::Show);
        assert_eq!(
            Command::parse_text("configure key").unwrap(),
            Command::Configure {
                key: "key".into(),
                value: String::new()
            }
        );
    }

    #[test]
    fn typed_command_errors() {
        assert!(matches!(
            Command::parse_text("volume 3"),
            Err(SessionError::UnknownKeyword(_))
        ));
        assert!(matches!(
            Command::parse_text("control 5"),
            Err(SessionError::ArgumentCount { got: 1, .. })
        ));
        assert!(matches!(
            Command::parse_text("show now"),
            Err(SessionError::ArgumentCount { got: 1, .. })
        ));
        assert!(matches!(
            Command::parse_text("control five 1.0"),
            Err(SessionError::Line(_))
        ));
    }

    #[test]
    fn serializes_with_keyword_tag() {
        let json = serde_json::to_value(Command::Control {
            index: 5,
            value: 0.25,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"keyword": "control", "index": 5, "value": 0.25})
        );

        let json = serde_json::to_value(Command::Ready).unwrap();
        assert_eq!(json, serde_json::json!({"keyword": "ready"}));
    }

    #[test]
    fn display_is_readable() {
        let command = Command::Configure {
            key: "k".into(),
            value: "v w".into(),
        };
        assert_eq!(command.to_string(), r#"configure "k" "v w""#);
    }
}
