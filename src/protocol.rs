//! cellterm Protocol
//!
//! JSON messages between an application and the engine, one per line.
//! Every command maps onto one `Session` call.
//!
//! Commands (application -> engine):
//!   {"cmd": "set", "options": "window.size=80x25; font: default"}
//!   {"cmd": "put", "x": 5, "y": 3, "code": "@"}
//!   {"cmd": "color", "color": "light red"}
//!   {"cmd": "print", "x": 0, "y": 0, "text": "[color=orange]Hi", "width": 20}
//!   {"cmd": "read"}
//!
//! Responses (engine -> application):
//!   {"type": "ok"}
//!   {"type": "int", "value": 64}
//!   {"type": "size", "width": 2, "height": 1}
//!   {"type": "error", "message": "config error: ..."}

use serde::{Deserialize, Serialize};

use crate::core::{Color, Composition, Corners};
use crate::error::Result;
use crate::input::LineOutcome;
use crate::session::Session;

/// A color given as a packed 0xAARRGGBB integer or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Packed(u32),
    Name(String),
}

impl ColorValue {
    pub fn resolve(&self, session: &Session) -> Result<Color> {
        match self {
            ColorValue::Packed(v) => Ok(Color(*v)),
            ColorValue::Name(name) => session.color_from_name(name),
        }
    }
}

/// A code given as an integer or as a one-character string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeValue {
    Code(u32),
    Char(String),
}

impl CodeValue {
    pub fn code(&self) -> u32 {
        match self {
            CodeValue::Code(c) => *c,
            CodeValue::Char(s) => s.chars().next().map(|c| c as u32).unwrap_or(0),
        }
    }
}

/// Command from application to engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    // ============== Lifecycle ==============
    /// Open the session (already open in the server; kept for symmetry)
    Open,

    /// Shut the session down
    Close,

    // ============== Configuration ==============
    /// Apply an option string
    Set { options: String },

    /// Apply an option string given as bytes in `terminal.encoding`
    Set8 { bytes: Vec<u8> },

    /// Read back an option
    Get {
        key: String,
        #[serde(default)]
        default: String,
    },

    // ============== Drawing ==============
    /// Present what has been drawn
    Refresh,

    /// Empty every layer
    Clear,

    /// Empty an area of the current layer
    ClearArea { x: i32, y: i32, width: i32, height: i32 },

    /// Restrict the current layer; zero width or height resets
    Crop { x: i32, y: i32, width: i32, height: i32 },

    /// Select the current layer
    Layer { index: i32 },

    /// Set the foreground color
    Color { color: ColorValue },

    /// Set the background color
    Bkcolor { color: ColorValue },

    /// Set the composition mode ("on" / "off")
    Composition { mode: Composition },

    /// Put a single code
    Put { x: i32, y: i32, code: CodeValue },

    /// Put a code stretched over dx x dy cells and/or with corner offsets
    PutExt {
        x: i32,
        y: i32,
        #[serde(default)]
        dx: i32,
        #[serde(default)]
        dy: i32,
        code: CodeValue,
        /// Pixel offsets: top-left, top-right, bottom-right, bottom-left
        #[serde(default)]
        corners: Option<Corners>,
    },

    /// Print text with markup
    Print {
        x: i32,
        y: i32,
        text: String,
        #[serde(default)]
        width: i32,
        #[serde(default)]
        height: i32,
        #[serde(default)]
        align: i32,
    },

    /// Print text given as bytes in `terminal.encoding`
    Print8 {
        x: i32,
        y: i32,
        bytes: Vec<u8>,
        #[serde(default)]
        width: i32,
        #[serde(default)]
        height: i32,
        #[serde(default)]
        align: i32,
    },

    /// Size `print` would produce
    Measure {
        text: String,
        #[serde(default)]
        width: i32,
        #[serde(default)]
        height: i32,
    },

    // ============== Readback ==============
    Pick {
        x: i32,
        y: i32,
        #[serde(default)]
        z: i32,
    },

    PickColor {
        x: i32,
        y: i32,
        #[serde(default)]
        z: i32,
    },

    PickBkcolor {
        x: i32,
        y: i32,
        #[serde(default)]
        z: i32,
    },

    // ============== Input ==============
    HasInput,

    /// Blocking read of the next event code
    Read,

    Peek,

    State { slot: i32 },

    /// Blocking line input
    ReadStr {
        x: i32,
        y: i32,
        #[serde(default)]
        text: String,
        max: i32,
    },

    Delay { ms: i32 },

    // ============== Colors ==============
    ColorFromName { name: String },

    ColorFromArgb { a: u8, r: u8, g: u8, b: u8 },
}

/// Response from engine to application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Acknowledgment
    Ok,

    Bool { value: bool },

    Int { value: i32 },

    /// Packed 0xAARRGGBB color
    Color { value: u32 },

    /// Width and height in cells
    Size { width: i32, height: i32 },

    String { value: String },

    /// `read_str` result: character count, -1 cancelled, -2 too long
    ReadStr { status: i32, text: String },

    /// Error message
    Error { message: String },
}

impl From<Color> for Response {
    fn from(c: Color) -> Self {
        Response::Color { value: c.0 }
    }
}

/// Run a command against the session
pub fn execute(session: &mut Session, command: Command) -> Response {
    dispatch(session, command).unwrap_or_else(|e| Response::Error { message: e.to_string() })
}

fn dispatch(session: &mut Session, command: Command) -> Result<Response> {
    let response = match command {
        Command::Open => Response::Bool { value: session.open()? },
        Command::Close => {
            session.close();
            Response::Ok
        }

        Command::Set { options } => {
            session.set(&options)?;
            Response::Bool { value: true }
        }
        Command::Set8 { bytes } => {
            session.set_bytes(&bytes)?;
            Response::Bool { value: true }
        }
        Command::Get { key, default } => Response::String {
            value: session.get(&key, &default)?,
        },

        Command::Refresh => {
            session.refresh()?;
            Response::Ok
        }
        Command::Clear => {
            session.clear()?;
            Response::Ok
        }
        Command::ClearArea { x, y, width, height } => {
            session.clear_area(x, y, width, height)?;
            Response::Ok
        }
        Command::Crop { x, y, width, height } => {
            session.crop(x, y, width, height)?;
            Response::Ok
        }
        Command::Layer { index } => {
            session.layer(index)?;
            Response::Ok
        }
        Command::Color { color } => {
            let color = color.resolve(session)?;
            session.color(color)?;
            Response::Ok
        }
        Command::Bkcolor { color } => {
            let color = color.resolve(session)?;
            session.bkcolor(color)?;
            Response::Ok
        }
        Command::Composition { mode } => {
            session.composition(mode)?;
            Response::Ok
        }
        Command::Put { x, y, code } => {
            session.put(x, y, code.code())?;
            Response::Ok
        }
        Command::PutExt { x, y, dx, dy, code, corners } => {
            session.put_ext(x, y, dx, dy, code.code(), corners)?;
            Response::Ok
        }
        Command::Print { x, y, text, width, height, align } => {
            let size = session.print(x, y, &text, width, height, align)?;
            Response::Size {
                width: size.width,
                height: size.height,
            }
        }
        Command::Print8 { x, y, bytes, width, height, align } => {
            let size = session.print_bytes(x, y, &bytes, width, height, align)?;
            Response::Size {
                width: size.width,
                height: size.height,
            }
        }
        Command::Measure { text, width, height } => {
            let size = session.measure(&text, width, height)?;
            Response::Size {
                width: size.width,
                height: size.height,
            }
        }

        Command::Pick { x, y, z } => Response::Int {
            value: session.pick(x, y, z)? as i32,
        },
        Command::PickColor { x, y, z } => session.pick_color(x, y, z)?.into(),
        Command::PickBkcolor { x, y, z } => session.pick_bkcolor(x, y, z)?.into(),

        Command::HasInput => Response::Bool {
            value: session.has_input()?,
        },
        Command::Read => Response::Int { value: session.read() },
        Command::Peek => Response::Int { value: session.peek()? },
        Command::State { slot } => Response::Int {
            value: session.state(slot)?,
        },
        Command::ReadStr { x, y, text, max } => {
            let outcome = session.read_str(x, y, &text, max)?;
            let status = outcome.code();
            let text = match outcome {
                LineOutcome::Ok(s) => s,
                _ => text,
            };
            Response::ReadStr { status, text }
        }
        Command::Delay { ms } => {
            session.delay(ms)?;
            Response::Ok
        }

        Command::ColorFromName { name } => session.color_from_name(&name)?.into(),
        Command::ColorFromArgb { a, r, g, b } => session.color_from_argb(a, r, g, b)?.into(),
    };
    Ok(response)
}

/// Parse a command from JSON
pub fn parse_command(json: &str) -> std::result::Result<Command, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a response to JSON
pub fn serialize_response(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| r#"{"type":"error","message":"Serialization failed"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open() -> Session {
        let mut session = Session::headless();
        session.open().unwrap();
        session
    }

    fn run(session: &mut Session, json: &str) -> Response {
        execute(session, parse_command(json).unwrap())
    }

    #[test]
    fn test_parse_put() {
        let cmd = parse_command(r#"{"cmd":"put","x":5,"y":3,"code":"@"}"#).unwrap();
        match cmd {
            Command::Put { x, y, code } => {
                assert_eq!((x, y), (5, 3));
                assert_eq!(code.code(), '@' as u32);
            }
            _ => panic!("Wrong command type"),
        }
        let cmd = parse_command(r#"{"cmd":"put","x":0,"y":0,"code":9608}"#).unwrap();
        assert!(matches!(cmd, Command::Put { code: CodeValue::Code(0x2588), .. }));
    }

    #[test]
    fn test_parse_colors() {
        let cmd = parse_command(r#"{"cmd":"color","color":"orange"}"#).unwrap();
        assert!(matches!(cmd, Command::Color { color: ColorValue::Name(ref n) } if n == "orange"));
        let cmd = parse_command(r#"{"cmd":"bkcolor","color":4278190335}"#).unwrap();
        assert!(matches!(cmd, Command::Bkcolor { color: ColorValue::Packed(0xFF00_00FF) }));
    }

    #[test]
    fn test_parse_defaults() {
        let cmd = parse_command(r#"{"cmd":"print","x":1,"y":2,"text":"hi"}"#).unwrap();
        assert!(matches!(cmd, Command::Print { width: 0, height: 0, align: 0, .. }));
        let cmd = parse_command(r#"{"cmd":"composition","mode":"on"}"#).unwrap();
        assert!(matches!(cmd, Command::Composition { mode: Composition::On }));
        assert!(parse_command(r#"{"cmd":"explode"}"#).is_err());
    }

    #[test]
    fn test_serialize_responses() {
        assert_eq!(serialize_response(&Response::Ok), r#"{"type":"ok"}"#);
        assert_eq!(serialize_response(&Response::Int { value: 64 }), r#"{"type":"int","value":64}"#);
        assert_eq!(
            serialize_response(&Response::ReadStr {
                status: -1,
                text: "ab".to_string()
            }),
            r#"{"type":"read_str","status":-1,"text":"ab"}"#
        );
    }

    #[test]
    fn test_execute_draw_and_pick() {
        let mut session = open();
        assert_eq!(run(&mut session, r#"{"cmd":"set","options":"window.size=20x10"}"#), Response::Bool { value: true });
        assert_eq!(run(&mut session, r#"{"cmd":"color","color":"red"}"#), Response::Ok);
        assert_eq!(run(&mut session, r#"{"cmd":"put","x":5,"y":5,"code":"@"}"#), Response::Ok);
        assert_eq!(run(&mut session, r#"{"cmd":"refresh"}"#), Response::Ok);
        assert_eq!(run(&mut session, r#"{"cmd":"pick","x":5,"y":5}"#), Response::Int { value: '@' as i32 });
        assert_eq!(
            run(&mut session, r#"{"cmd":"pick_color","x":5,"y":5}"#),
            Response::Color { value: 0xFFFF_0000 }
        );
        assert_eq!(
            run(&mut session, r#"{"cmd":"get","key":"window.size"}"#),
            Response::String {
                value: "20x10".to_string()
            }
        );
    }

    #[test]
    fn test_execute_print_and_measure_agree() {
        let mut session = open();
        let measured = run(&mut session, r#"{"cmd":"measure","text":"hello there world","width":6}"#);
        let printed = run(&mut session, r#"{"cmd":"print","x":0,"y":0,"text":"hello there world","width":6}"#);
        assert_eq!(measured, printed);
        assert_eq!(measured, Response::Size { width: 5, height: 3 });
    }

    #[test]
    fn test_execute_errors() {
        let mut session = open();
        let response = run(&mut session, r#"{"cmd":"set","options":"window.size=abc"}"#);
        assert!(matches!(response, Response::Error { ref message } if message.starts_with("config error")));
        assert_eq!(run(&mut session, r#"{"cmd":"close"}"#), Response::Ok);
        assert_eq!(
            run(&mut session, r#"{"cmd":"clear"}"#),
            Response::Error {
                message: "engine is closed".to_string()
            }
        );
        assert_eq!(run(&mut session, r#"{"cmd":"read"}"#), Response::Int { value: 0xE0 });
    }

    #[test]
    fn test_execute_color_helpers() {
        let mut session = open();
        assert_eq!(
            run(&mut session, r#"{"cmd":"color_from_argb","a":255,"r":0,"g":128,"b":0}"#),
            Response::Color { value: 0xFF00_8000 }
        );
        assert_eq!(
            run(&mut session, r#"{"cmd":"color_from_name","name":"nonsense"}"#),
            Response::Color { value: 0xFFFF_FFFF }
        );
    }
}
